// ABOUTME: SSH transport used to reach provisioning targets.
// ABOUTME: Agent and key-file authentication, known_hosts checks, exec with optional stdin.

mod client;
mod error;

pub use client::{CommandOutput, Session, SessionConfig};
pub use error::{Error, Result};
