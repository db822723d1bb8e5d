// ABOUTME: Init command implementation.
// ABOUTME: Scaffolds a commented djangostack.yml in the working directory.

use djangostack::config::init_config;
use djangostack::error::Result;
use djangostack::output::Output;
use std::path::Path;

pub fn init(dir: &Path, project: Option<&str>, force: bool, output: &Output) -> Result<()> {
    let path = init_config(dir, project, force)?;
    output.success(&format!("Created {}", path.display()));
    Ok(())
}
