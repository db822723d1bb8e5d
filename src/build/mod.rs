// ABOUTME: The build engine: stage table, orchestrator, provisioning marker and prompt.
// ABOUTME: One build runs the enabled stages against one RemoteEnvironment, in fixed order.

mod error;
mod marker;
mod orchestrator;
mod prompt;
mod stage;
pub mod stages;

pub use error::{BuildError, BuildErrorKind};
pub use marker::{MARKER_PATH, ProvisioningMarker};
pub use orchestrator::{BuildReport, DEFAULT_SETTLE_DELAY, Orchestrator, run_setup};
pub use prompt::{AssumeYes, Confirm, PromptError, TerminalConfirm};
pub use stage::Stage;
