// ABOUTME: Build error types with SNAFU pattern.
// ABOUTME: Operator aborts, failed stages, failed hooks and prompt failures.

use snafu::Snafu;

use super::Stage;
use super::prompt::PromptError;
use crate::hooks::{HookError, HookPhase};
use crate::remote::RemoteError;

/// Why a build stopped.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum BuildError {
    #[snafu(display("build of {host} aborted by operator"))]
    UserAbort { host: String },

    #[snafu(display("stage {stage} failed: {source}"))]
    Stage { stage: Stage, source: RemoteError },

    #[snafu(display("{phase} hook `{hook}` failed: {source}"))]
    Hook {
        phase: HookPhase,
        hook: String,
        source: HookError,
    },

    #[snafu(display("{source}"))]
    Prompt { source: PromptError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildErrorKind {
    /// The operator declined to rebuild a provisioned host.
    UserAbort,
    /// A remote command exited non-zero.
    RemoteCommand,
    /// A local file to upload could not be read.
    LocalFile,
    /// A destructive command was refused before it ran.
    Refused,
    /// The SSH transport or a sandbox reload failed.
    Connection,
    /// A registered hook failed.
    Hook,
    /// The confirmation prompt could not be shown.
    Prompt,
}

impl BuildError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> BuildErrorKind {
        match self {
            BuildError::UserAbort { .. } => BuildErrorKind::UserAbort,
            BuildError::Stage { source, .. } => match source {
                RemoteError::CommandFailed { .. } => BuildErrorKind::RemoteCommand,
                RemoteError::LocalFile { .. } => BuildErrorKind::LocalFile,
                RemoteError::UnsafeDestination(_) => BuildErrorKind::Refused,
                RemoteError::Ssh(_)
                | RemoteError::Reload(_)
                | RemoteError::ReloadUnsupported(_) => BuildErrorKind::Connection,
            },
            BuildError::Hook { .. } => BuildErrorKind::Hook,
            BuildError::Prompt { .. } => BuildErrorKind::Prompt,
        }
    }

    /// The stage that failed, if a stage failed.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BuildError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn is_user_abort(&self) -> bool {
        matches!(self, BuildError::UserAbort { .. })
    }
}

impl From<PromptError> for BuildError {
    fn from(source: PromptError) -> Self {
        BuildError::Prompt { source }
    }
}
