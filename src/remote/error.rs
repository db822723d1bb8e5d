// ABOUTME: Errors raised at the remote-environment boundary.
// ABOUTME: Failed commands, unreadable local files, transport and sandbox reload failures.

use std::path::PathBuf;
use thiserror::Error;

use super::RemoteCommand;
use crate::ssh::CommandOutput;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("`{command}` exited with status {exit_code}: {}", .stderr.trim())]
    CommandFailed {
        command: String,
        exit_code: u32,
        stderr: String,
    },

    #[error("cannot read local file {}: {source}", .path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SSH error: {0}")]
    Ssh(#[from] crate::ssh::Error),

    #[error("sandbox reload failed: {0}")]
    Reload(String),

    #[error("{0} is not a sandbox and cannot be reloaded")]
    ReloadUnsupported(String),

    #[error("refusing to replace checkout destination '{0}'")]
    UnsafeDestination(String),
}

impl RemoteError {
    pub fn command_failed(command: &RemoteCommand, output: &CommandOutput) -> Self {
        RemoteError::CommandFailed {
            command: command.render(),
            exit_code: output.exit_code,
            stderr: output.stderr.clone(),
        }
    }

    /// Exit code of the failed remote command, if that is what failed.
    pub fn exit_code(&self) -> Option<u32> {
        match self {
            RemoteError::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}
