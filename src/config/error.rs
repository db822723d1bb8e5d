// ABOUTME: Validation errors raised while building a Config.
// ABOUTME: One variant per violated invariant so callers can name the offending option.

use thiserror::Error;

use crate::types::ProjectNameError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid project name: {0}")]
    InvalidProjectName(#[from] ProjectNameError),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("web_server must be set when deploy_web_server is enabled")]
    MissingWebServer,

    #[error("unsupported web_server '{0}' (expected apache or nginx)")]
    InvalidWebServer(String),

    #[error("{0} must be set when deploying nginx")]
    MissingUwsgiSetting(&'static str),

    #[error("unsupported scm_type '{0}' (expected mercurial or git)")]
    InvalidScmType(String),

    #[error("{0} must be set when deploy_database is enabled")]
    MissingDatabaseSetting(&'static str),

    #[error("{0} must be set when use_transifex is enabled")]
    MissingTransifexSetting(&'static str),

    #[error("django_project_path must be set when deploy_django is enabled")]
    MissingDjangoProjectPath,

    #[error("checkout destination '{0}' must be an absolute directory below /")]
    InvalidCheckoutDestination(String),
}

impl ConfigError {
    /// Name of the option at fault, when the error concerns a single option.
    pub fn option(&self) -> Option<&'static str> {
        match self {
            ConfigError::MissingWebServer | ConfigError::InvalidWebServer(_) => Some("web_server"),
            ConfigError::InvalidScmType(_) => Some("scm_type"),
            ConfigError::MissingUwsgiSetting(option)
            | ConfigError::MissingDatabaseSetting(option)
            | ConfigError::MissingTransifexSetting(option) => Some(option),
            ConfigError::MissingDjangoProjectPath => Some("django_project_path"),
            ConfigError::InvalidProjectName(_)
            | ConfigError::InvalidOptions(_)
            | ConfigError::InvalidCheckoutDestination(_) => None,
        }
    }
}
