// ABOUTME: Check command implementation.
// ABOUTME: Validates the manifest and prints the stage plan without touching any server.

use super::load_manifest;
use djangostack::build::Stage;
use djangostack::error::Result;
use djangostack::output::Output;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Plan<'a> {
    project: &'a str,
    servers: Vec<String>,
    stages: Vec<Stage>,
}

pub fn check(dir: &Path, output: &Output) -> Result<()> {
    let manifest = load_manifest(dir)?;
    let servers: Vec<String> = manifest.servers.iter().map(|s| s.host.clone()).collect();
    let config = manifest.into_config(dir)?;
    let stages = Stage::plan(&config);

    output.progress(&format!(
        "{} builds {} stage(s) on {} server(s):",
        config.project(),
        stages.len(),
        servers.len()
    ));
    for (index, stage) in stages.iter().enumerate() {
        output.progress(&format!("  {:>2}. {:<32} {}", index + 1, stage.name(), stage.description()));
    }

    output.record(
        "plan",
        &Plan {
            project: config.project().as_str(),
            servers,
            stages,
        },
    );
    output.success("Configuration is valid");
    Ok(())
}
