// ABOUTME: Status command implementation.
// ABOUTME: Reads the provisioning marker from each configured server.

use super::load_manifest;
use djangostack::build::{MARKER_PATH, ProvisioningMarker};
use djangostack::config::ServerConfig;
use djangostack::diagnostics::{Diagnostics, Warning};
use djangostack::error::Result;
use djangostack::output::Output;
use djangostack::remote::{RemoteCommand, RemoteEnvironment, SshEnvironment};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ServerStatus {
    host: String,
    marker: Option<ProvisioningMarker>,
}

pub async fn status(dir: &Path, server: Option<&str>, output: Output) -> Result<()> {
    let manifest = load_manifest(dir)?;
    let servers = manifest.select_servers(server)?;
    let mut diag = Diagnostics::default();

    for server in &servers {
        let status = query_server(server, &mut diag).await?;
        match &status.marker {
            Some(marker) => output.success(&format!(
                "{}: built at {} from {} (scm: {}, database: {}, restored: {}, django: {}, web server: {})",
                status.host,
                marker.built_at.to_rfc3339(),
                marker.builder,
                marker.scm,
                marker.database,
                marker.database_restored,
                marker.django,
                marker.web_server
            )),
            None => output.success(&format!("{}: not provisioned", status.host)),
        }
        output.record("status", &status);
    }

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
    Ok(())
}

async fn query_server(server: &ServerConfig, diag: &mut Diagnostics) -> Result<ServerStatus> {
    let env = SshEnvironment::connect(server).await?;

    let marker = if env.path_exists(MARKER_PATH).await? {
        let content = env
            .exec(&RemoteCommand::new("cat").arg(MARKER_PATH))
            .await?;
        ProvisioningMarker::parse(&content.stdout)
    } else {
        None
    };

    if let Err(e) = env.disconnect().await {
        diag.warn(Warning::ssh_disconnect(format!(
            "SSH disconnect failed for {}: {}",
            server.host, e
        )));
    }

    Ok(ServerStatus {
        host: server.host.clone(),
        marker,
    })
}
