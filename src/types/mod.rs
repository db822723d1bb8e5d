// ABOUTME: Validated domain types shared across config and build stages.
// ABOUTME: Currently the project name newtype.

mod project_name;

pub use project_name::{ProjectName, ProjectNameError};
