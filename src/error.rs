// ABOUTME: Application-wide error type for the djangostack CLI.
// ABOUTME: Wraps module errors and maps operator aborts to their own exit status.

use std::path::PathBuf;
use thiserror::Error;

use crate::build::BuildError;
use crate::config::ConfigError;
use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("no server matches {0}")]
    UnknownServer(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("build failed on {host}: {source}")]
    Build {
        host: String,
        #[source]
        source: BuildError,
    },

    #[error("SSH error: {0}")]
    Ssh(#[from] crate::ssh::Error),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn build(host: impl Into<String>, source: BuildError) -> Self {
        Error::Build {
            host: host.into(),
            source,
        }
    }

    /// Process exit status: 2 when the operator declined, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Build { source, .. } if source.is_user_abort() => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
