// ABOUTME: Command module aggregator for the djangostack CLI.
// ABOUTME: Re-exports init, check, build, and status command handlers.

mod build;
mod check;
mod init;
mod status;

pub use build::build;
pub use check::check;
pub use init::init;
pub use status::status;

use djangostack::config::Manifest;
use djangostack::error::Result;
use std::path::Path;

/// Find and parse the manifest in `dir`.
fn load_manifest(dir: &Path) -> Result<Manifest> {
    let manifest = Manifest::discover(dir)?;
    tracing::debug!(project = %manifest.project, servers = manifest.servers.len(), "loaded manifest");
    Ok(manifest)
}
