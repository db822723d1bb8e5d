// ABOUTME: The provisioning marker left in the login user's home after every build.
// ABOUTME: A timestamp, the building machine, and one summary line per deployment domain.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;

/// Remote location of the marker, relative to the login user's home.
pub const MARKER_PATH: &str = "~/.djangostack";

const BUILT_AT: &str = "Built at";
const BUILDER: &str = "Builder";
const SCM: &str = "Source control deployed";
const DATABASE: &str = "Database deployed";
const DATABASE_RESTORED: &str = "Database restored";
const DJANGO: &str = "Django deployed";
const WEB_SERVER: &str = "Web server deployed";

/// What a completed build recorded about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningMarker {
    pub built_at: DateTime<Utc>,
    pub builder: String,
    pub scm: bool,
    pub database: bool,
    pub database_restored: bool,
    pub django: bool,
    pub web_server: bool,
}

impl ProvisioningMarker {
    /// Marker for a build of `config` happening now on this machine.
    pub fn for_config(config: &Config) -> Self {
        Self {
            built_at: Utc::now(),
            builder: gethostname::gethostname().to_string_lossy().into_owned(),
            scm: config.deploy_scm() || !config.checkouts().is_empty(),
            database: config.deploy_database(),
            database_restored: config.deploy_database() && config.restore_database(),
            django: config.deploy_django(),
            web_server: config.deploy_web_server(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "{BUILT_AT}: {}\n{BUILDER}: {}\n{SCM}: {}\n{DATABASE}: {}\n\
             {DATABASE_RESTORED}: {}\n{DJANGO}: {}\n{WEB_SERVER}: {}\n",
            self.built_at.to_rfc3339(),
            self.builder,
            self.scm,
            self.database,
            self.database_restored,
            self.django,
            self.web_server,
        )
    }

    /// Parse a rendered marker. Returns None if any line is missing or malformed.
    pub fn parse(text: &str) -> Option<Self> {
        let field = |key: &str| {
            text.lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(k, _)| k.trim() == key)
                .map(|(_, v)| v.trim())
        };
        let flag = |key: &str| field(key).and_then(|v| v.parse::<bool>().ok());

        Some(Self {
            built_at: DateTime::parse_from_rfc3339(field(BUILT_AT)?)
                .ok()?
                .with_timezone(&Utc),
            builder: field(BUILDER)?.to_string(),
            scm: flag(SCM)?,
            database: flag(DATABASE)?,
            database_restored: flag(DATABASE_RESTORED)?,
            django: flag(DJANGO)?,
            web_server: flag(WEB_SERVER)?,
        })
    }
}
