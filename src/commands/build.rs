// ABOUTME: Build command implementation.
// ABOUTME: Connects to each selected server in turn and runs the stage plan on it.

use super::load_manifest;
use djangostack::build::{AssumeYes, BuildReport, Confirm, Orchestrator, TerminalConfirm};
use djangostack::config::{Config, ServerConfig};
use djangostack::diagnostics::{Diagnostics, Warning};
use djangostack::error::{Error, Result};
use djangostack::hooks::discover_local_hooks;
use djangostack::output::Output;
use djangostack::remote::SshEnvironment;
use std::path::Path;

pub async fn build(dir: &Path, yes: bool, server: Option<&str>, mut output: Output) -> Result<()> {
    let manifest = load_manifest(dir)?;
    let servers = manifest.select_servers(server)?;
    let mut config = manifest.into_config(dir)?;

    let web_server = config.web_server().map(|w| w.to_string());
    for hook in discover_local_hooks(dir, config.project(), web_server) {
        tracing::debug!(path = %hook.path().display(), phase = %hook.phase(), "found local hook");
        let phase = hook.phase();
        config.add_hook(phase, hook);
    }

    let confirm: Box<dyn Confirm> = if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalConfirm)
    };

    output.start_timer();
    output.progress(&format!(
        "Building {} on {} server(s)",
        config.project(),
        servers.len()
    ));

    let mut diag = Diagnostics::default();
    for server in &servers {
        let report = build_server(&config, server, confirm.as_ref(), &output, &mut diag).await;
        match report {
            Ok(report) => {
                for warning in &report.warnings {
                    output.warning(&format!("[{}] {}", report.host, warning.message));
                }
                output.record("build", &report);
                output.progress(&format!(
                    "  ✓ {} built ({} stages)",
                    report.host,
                    report.stages.len()
                ));
            }
            Err(e) => {
                emit_warnings(&output, &diag);
                return Err(e);
            }
        }
    }

    emit_warnings(&output, &diag);
    output.success("Build complete!");
    Ok(())
}

fn emit_warnings(output: &Output, diag: &Diagnostics) {
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
}

async fn build_server(
    config: &Config,
    server: &ServerConfig,
    confirm: &dyn Confirm,
    output: &Output,
    diag: &mut Diagnostics,
) -> Result<BuildReport> {
    output.progress(&format!("  → Connecting to {}...", server.host));
    let env = SshEnvironment::connect(server).await?;

    let host = server.host.clone();
    let result = Orchestrator::new(config, &env, confirm)
        .settle_delay(server.reload_settle)
        .on_stage(move |stage| output.stage(&host, stage.name(), stage.description()))
        .run()
        .await;

    // Disconnect failures never mask the build result.
    if let Err(e) = env.disconnect().await {
        diag.warn(Warning::ssh_disconnect(format!(
            "SSH disconnect failed for {}: {}",
            server.host, e
        )));
    }

    result.map_err(|e| Error::build(server.host.as_str(), e))
}
