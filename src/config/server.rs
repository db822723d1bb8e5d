// ABOUTME: Server configuration for SSH connections to provisioning targets.
// ABOUTME: Parses "host", "user@host:port" and the "vagrant" sandbox shorthand.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::ssh::{self, SessionConfig};

const VAGRANT_HOST: &str = "127.0.0.1";
const VAGRANT_PORT: u16 = 2222;
const VAGRANT_USER: &str = "vagrant";
const VAGRANT_RELOAD: &str = "vagrant reload";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
    /// Local Vagrant box: identity file comes from `vagrant ssh-config`
    /// and the box is reloaded with `vagrant reload`.
    #[serde(default)]
    pub vagrant: bool,
    /// Local command that reboots a sandbox target.
    #[serde(default)]
    pub reload_command: Option<String>,
    /// How long to wait after a reload before continuing.
    #[serde(default = "default_reload_settle", with = "humantime_serde")]
    pub reload_settle: Duration,
}

fn default_port() -> u16 {
    22
}

fn default_trust_first_connection() -> bool {
    true
}

fn default_reload_settle() -> Duration {
    Duration::from_secs(15)
}

impl ServerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            user: None,
            key_path: None,
            trust_first_connection: default_trust_first_connection(),
            vagrant: false,
            reload_command: None,
            reload_settle: default_reload_settle(),
        }
    }

    /// The local Vagrant box on its forwarded SSH port.
    pub fn vagrant() -> Self {
        Self {
            port: VAGRANT_PORT,
            user: Some(VAGRANT_USER.to_string()),
            vagrant: true,
            ..Self::new(VAGRANT_HOST)
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("server address cannot be empty".to_string());
        }

        if s == "vagrant" {
            return Ok(Self::vagrant());
        }

        // [user@]host[:port]
        let (user, rest) = match s.split_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, s),
        };

        if user == Some("") {
            return Err("user cannot be empty".to_string());
        }

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {}", port))?;
                (host, port)
            }
            None => (rest, default_port()),
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(Self {
            port,
            user: user.map(str::to_string),
            ..Self::new(host)
        })
    }

    /// Command that reboots this target, if it is a sandbox.
    pub fn reload_command(&self) -> Option<&str> {
        self.reload_command
            .as_deref()
            .or(self.vagrant.then_some(VAGRANT_RELOAD))
    }

    pub fn login_user(&self) -> String {
        self.user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()))
    }

    /// SSH settings for this server. For Vagrant boxes without an explicit
    /// key, the identity file is looked up with `vagrant ssh-config`.
    pub async fn session_config(&self) -> ssh::Result<SessionConfig> {
        let config = SessionConfig::new(&self.host, self.login_user())
            .port(self.port)
            .trust_on_first_use(self.trust_first_connection);

        let key_path = match (&self.key_path, self.vagrant) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => Some(vagrant_identity_file().await?),
            (None, false) => None,
        };

        Ok(match key_path {
            Some(path) => config.key_path(path),
            None => config,
        })
    }
}

async fn vagrant_identity_file() -> ssh::Result<PathBuf> {
    let output = tokio::process::Command::new("vagrant")
        .arg("ssh-config")
        .output()
        .await
        .map_err(|e| ssh::Error::IdentityLookup(format!("failed to run vagrant: {}", e)))?;

    if !output.status.success() {
        return Err(ssh::Error::IdentityLookup(format!(
            "vagrant ssh-config exited with {}",
            output.status
        )));
    }

    parse_identity_file(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        ssh::Error::IdentityLookup("no IdentityFile in vagrant ssh-config output".to_string())
    })
}

/// Extract the first `IdentityFile` from `ssh-config` style output.
pub fn parse_identity_file(ssh_config: &str) -> Option<PathBuf> {
    ssh_config
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("IdentityFile"))
        .map(|value| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
