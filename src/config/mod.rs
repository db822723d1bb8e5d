// ABOUTME: Configuration types and parsing for djangostack.yml.
// ABOUTME: The manifest file, the raw Options, and the validated Config built from them.

mod checkout;
mod error;
mod init;
mod options;
mod platform;
mod server;
mod settings;

pub use checkout::{CheckoutEntry, DirAttrib, PermissionDirectives};
pub use error::ConfigError;
pub use init::init_config;
pub use options::{BITBUCKET_KNOWN_HOST, DumpFormat, Options};
pub use platform::{ScmType, WebServer};
pub use server::{ServerConfig, parse_identity_file};
pub use settings::{
    BASELINE_PACKAGES, Config, DATABASE_DRIVER, DEFAULT_PYTHON_DEPENDENCIES, DatabaseSettings,
    TRANSLATION_CLIENT, TransifexSettings, UwsgiSettings,
};

use crate::error::{Error, Result};
use crate::hooks::{HookPhase, ShellHook};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "djangostack.yml";
pub const CONFIG_FILENAME_ALT: &str = "djangostack.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".djangostack/config.yml";

/// The on-disk project manifest: target servers plus everything `Config` needs.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub project: String,

    #[serde(deserialize_with = "deserialize_servers")]
    pub servers: NonEmpty<ServerConfig>,

    #[serde(default)]
    pub packages: Vec<String>,

    #[serde(default)]
    pub python_dependencies: Vec<String>,

    #[serde(default)]
    pub checkouts: Vec<CheckoutEntry>,

    #[serde(default)]
    pub hooks: ManifestHooks,

    #[serde(flatten)]
    pub options: Options,
}

/// Remote shell commands to run at each hook phase.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestHooks {
    #[serde(default)]
    pub pre_build: Vec<ShellHookEntry>,
    #[serde(default)]
    pub post_checkout: Vec<ShellHookEntry>,
    #[serde(default)]
    pub post_build: Vec<ShellHookEntry>,
}

impl ManifestHooks {
    fn phases(self) -> [(HookPhase, Vec<ShellHookEntry>); 3] {
        [
            (HookPhase::PreBuild, self.pre_build),
            (HookPhase::PostCheckout, self.post_checkout),
            (HookPhase::PostBuild, self.post_build),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ShellHookEntry {
    Simple(String),
    Detailed {
        command: String,
        #[serde(default)]
        sudo: bool,
        #[serde(default)]
        cwd: Option<String>,
    },
}

impl ShellHookEntry {
    fn into_hook(self) -> ShellHook {
        match self {
            ShellHookEntry::Simple(command) => ShellHook::new(command),
            ShellHookEntry::Detailed { command, sudo, cwd } => {
                let hook = ShellHook::new(command).sudo(sudo);
                match cwd {
                    Some(dir) => hook.cwd(dir),
                    None => hook,
                }
            }
        }
    }
}

impl Manifest {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Select the servers to build, either all of them or the one whose
    /// host matches `host`.
    pub fn select_servers(&self, host: Option<&str>) -> Result<Vec<ServerConfig>> {
        match host {
            None => Ok(self.servers.iter().cloned().collect()),
            Some(host) => self
                .servers
                .iter()
                .find(|s| s.host == host)
                .cloned()
                .map(|s| vec![s])
                .ok_or_else(|| Error::UnknownServer(host.to_string())),
        }
    }

    /// Validate the options and register packages, dependencies, checkouts
    /// and shell hooks, in manifest order. Local file names resolve against
    /// `base_dir`.
    pub fn into_config(self, base_dir: &Path) -> std::result::Result<Config, ConfigError> {
        let mut config = Config::new(&self.project, self.options)?.with_base_dir(base_dir);

        for package in self.packages {
            config.add_package(package);
        }
        for dependency in self.python_dependencies {
            config.add_python_dependency(dependency);
        }
        for checkout in self.checkouts {
            config.add_checkout_entry(checkout)?;
        }
        for (phase, entries) in self.hooks.phases() {
            for entry in entries {
                config.add_hook(phase, entry.into_hook());
            }
        }

        Ok(config)
    }
}

// Custom deserializers

fn deserialize_servers<'de, D>(
    deserializer: D,
) -> std::result::Result<NonEmpty<ServerConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<ServerEntry> = Vec::deserialize(deserializer)?;
    let servers = values
        .into_iter()
        .map(|entry| entry.into_server_config())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)?;

    NonEmpty::from_vec(servers)
        .ok_or_else(|| serde::de::Error::custom("at least one server is required"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Simple(String),
    Detailed(ServerConfig),
}

impl ServerEntry {
    fn into_server_config(self) -> std::result::Result<ServerConfig, String> {
        match self {
            ServerEntry::Simple(s) => ServerConfig::parse(&s),
            ServerEntry::Detailed(c) => Ok(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
project: samplesite
servers:
  - deploy@web1.example.com
deploy_database: true
database_name: sampledb
database_user: dbuser
database_password: dbpassword
"#;

    #[test]
    fn options_are_flattened_into_the_manifest() {
        let manifest = Manifest::from_yaml(MINIMAL).unwrap();
        assert_eq!(manifest.project, "samplesite");
        assert!(manifest.options.deploy_database);
        assert!(manifest.options.run_migrations);
        assert_eq!(manifest.options.database_name.as_deref(), Some("sampledb"));
    }

    #[test]
    fn servers_must_not_be_empty() {
        let yaml = "project: samplesite\nservers: []\n";
        assert!(Manifest::from_yaml(yaml).is_err());
    }

    #[test]
    fn select_unknown_server_fails() {
        let manifest = Manifest::from_yaml(MINIMAL).unwrap();
        assert_eq!(manifest.select_servers(None).unwrap().len(), 1);
        assert!(matches!(
            manifest.select_servers(Some("db9.example.com")),
            Err(Error::UnknownServer(_))
        ));
    }

    #[test]
    fn shell_hooks_accept_both_forms() {
        let yaml = r#"
project: samplesite
servers: [vagrant]
hooks:
  post_build:
    - sudo service memcached restart
    - { command: "python manage.py rebuild_index --noinput", sudo: true, cwd: /var/www/site }
"#;
        let manifest = Manifest::from_yaml(yaml).unwrap();
        assert_eq!(manifest.hooks.post_build.len(), 2);
        let config = manifest.into_config(Path::new(".")).unwrap();
        assert_eq!(config.hooks().len(HookPhase::PostBuild), 2);
        assert_eq!(config.hooks().len(HookPhase::PreBuild), 0);
    }
}
