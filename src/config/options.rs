// ABOUTME: The raw, recognized deployment options with their defaults.
// ABOUTME: Deserialized from YAML or an arbitrary option map; unknown keys are ignored.

use serde::Deserialize;
use std::collections::HashMap;

use super::ConfigError;

/// Known-hosts line for bitbucket.org, where the original deployments pulled from.
pub const BITBUCKET_KNOWN_HOST: &str = "bitbucket.org ssh-rsa AAAAB3NzaC1yc2EAAAABIwAAAQEAubiN81eDcafrgMeLzaFPsw2kNvEcqTKl/VqLat/MaB33pZy0y3rJZtnqwR2qOOvbwKZYKiEO1O6VqNEBxKvJJelCq0dTXWT5pbO2gDXC6h6QDXCaHo6pOHGPUy+YBaGQRGuSusMEASYiWunYN0vCAI8QaXnWMXNMdFP3jHAJH0eDsoiGnLPBlBp4TNm6rYI74nMzgz3B9IikW4WVK+dc8KZJZWYjAuORU3jc1c/NPskD2ASinf8v3xnfXeukU0sJ5N6m5E8VLjObPEO+mN2t/FZTMZLiFqPWc/ALSqnMnnhwrNi2rbfg/rd/IpL8Le3pSBne8+seeFVBoGqzHM9yXw==";

/// Every option the build recognizes.
///
/// Enumerations (`scm_type`, `web_server`) stay strings here so that
/// `Config::new` can report an unsupported value precisely.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    pub deploy_scm: bool,
    pub deploy_database: bool,
    pub deploy_django: bool,
    pub deploy_web_server: bool,
    pub restore_database: bool,
    pub run_migrations: bool,

    pub scm_type: String,
    pub web_server: Option<String>,
    pub site_config_name: Option<String>,
    pub uwsgi_ini_path: Option<String>,
    pub uwsgi_params_path: Option<String>,
    pub uwsgi_ini_name: Option<String>,
    pub uwsgi_params_name: Option<String>,

    pub database_name: Option<String>,
    pub database_user: Option<String>,
    pub database_password: Option<String>,
    pub use_postgis: bool,
    pub database_dump_name: String,
    pub database_dump_type: DumpFormat,
    pub postgis_restore_script: String,
    pub pg_hba_name: Option<String>,
    pub postgresql_conf_name: Option<String>,

    pub django_project_path: Option<String>,
    pub django_version: Option<String>,
    pub requirements_path: Option<String>,
    pub static_root: Option<String>,
    pub local_settings_name: Option<String>,
    pub local_settings_path: Option<String>,
    pub use_transifex: bool,
    pub transifexrc_name: Option<String>,
    pub django_locale_path: Option<String>,
    pub create_admin_user: bool,
    pub django_admin_user: String,
    pub django_admin_email: String,
    pub django_admin_password: String,

    pub deploy_key_name: String,
    pub known_hosts_entry: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            deploy_scm: false,
            deploy_database: false,
            deploy_django: false,
            deploy_web_server: false,
            restore_database: false,
            run_migrations: true,
            scm_type: "mercurial".to_string(),
            web_server: None,
            site_config_name: None,
            uwsgi_ini_path: None,
            uwsgi_params_path: None,
            uwsgi_ini_name: None,
            uwsgi_params_name: None,
            database_name: None,
            database_user: None,
            database_password: None,
            use_postgis: false,
            database_dump_name: "dbdump.txt".to_string(),
            database_dump_type: DumpFormat::Sql,
            postgis_restore_script:
                "/usr/share/postgresql/9.1/contrib/postgis-2.0/postgis_restore.pl".to_string(),
            pg_hba_name: None,
            postgresql_conf_name: None,
            django_project_path: None,
            django_version: None,
            requirements_path: None,
            static_root: None,
            local_settings_name: None,
            local_settings_path: None,
            use_transifex: false,
            transifexrc_name: None,
            django_locale_path: None,
            create_admin_user: false,
            django_admin_user: "admin".to_string(),
            django_admin_email: "admin@example.com".to_string(),
            django_admin_password: "notagoodpassword".to_string(),
            deploy_key_name: "deploykey".to_string(),
            known_hosts_entry: BITBUCKET_KNOWN_HOST.to_string(),
        }
    }
}

impl Options {
    /// Build options from an arbitrary name → value map.
    /// Unrecognized names are ignored; recognized names with the wrong type fail.
    pub fn from_map(map: HashMap<String, serde_yaml::Value>) -> Result<Self, ConfigError> {
        let mapping = map
            .into_iter()
            .map(|(k, v)| (serde_yaml::Value::String(k), v))
            .collect::<serde_yaml::Mapping>();
        serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))
            .map_err(|e| ConfigError::InvalidOptions(e.to_string()))
    }
}

/// Format of the database dump to restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DumpFormat {
    /// Plain SQL script, fed to psql.
    #[default]
    #[serde(rename = "sql", alias = "SQL")]
    Sql,
    /// pg_dump custom/tar archive, loaded with pg_restore.
    #[serde(rename = "archive", alias = "custom", alias = "tar")]
    Archive,
}
