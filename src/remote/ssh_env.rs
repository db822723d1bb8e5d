// ABOUTME: RemoteEnvironment backed by an SSH session to one configured server.
// ABOUTME: Uploads stream through stdin; sandbox reloads reconnect with a fresh session.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CommandOutput, RemoteCommand, RemoteEnvironment, RemoteError};
use crate::config::ServerConfig;
use crate::ssh::{self, Session};

/// A connected target host.
#[derive(Debug)]
pub struct SshEnvironment {
    server: ServerConfig,
    session: RwLock<Session>,
}

impl SshEnvironment {
    pub async fn connect(server: &ServerConfig) -> ssh::Result<Self> {
        let session = Session::connect(server.session_config().await?).await?;
        Ok(Self {
            server: server.clone(),
            session: RwLock::new(session),
        })
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub async fn disconnect(self) -> ssh::Result<()> {
        self.session.into_inner().disconnect().await
    }

    async fn reconnect(&self) -> Result<(), RemoteError> {
        let fresh = Session::connect(self.server.session_config().await?).await?;
        let stale = std::mem::replace(&mut *self.session.write().await, fresh);
        if let Err(e) = stale.disconnect().await {
            tracing::debug!("Ignoring disconnect error on stale session: {}", e);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteEnvironment for SshEnvironment {
    fn host(&self) -> &str {
        &self.server.host
    }

    async fn exec(&self, command: &RemoteCommand) -> Result<CommandOutput, RemoteError> {
        let line = command.render();
        tracing::debug!(host = %self.server.host, "exec: {}", line);
        let output = self.session.read().await.exec(&line).await?;
        if !output.success() {
            tracing::debug!(exit_code = output.exit_code, "command exited non-zero");
        }
        Ok(output)
    }

    async fn write_file(
        &self,
        contents: &[u8],
        remote_path: &str,
        privileged: bool,
    ) -> Result<(), RemoteError> {
        let command = if privileged {
            RemoteCommand::new("tee")
                .arg(remote_path)
                .stdout_to("/dev/null")
                .sudo()
        } else {
            RemoteCommand::new("cat").stdout_to(remote_path)
        };

        let line = command.render();
        tracing::debug!(host = %self.server.host, "write: {}", line);
        let output = self
            .session
            .read()
            .await
            .exec_with_input(&line, contents)
            .await?;

        if output.success() {
            Ok(())
        } else {
            Err(RemoteError::command_failed(&command, &output))
        }
    }

    fn is_sandbox(&self) -> bool {
        self.server.reload_command().is_some()
    }

    async fn reload(&self) -> Result<(), RemoteError> {
        let Some(reload) = self.server.reload_command() else {
            return Err(RemoteError::ReloadUnsupported(self.server.host.clone()));
        };

        tracing::info!("Reloading sandbox {} with `{}`", self.server.host, reload);
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(reload)
            .status()
            .await
            .map_err(|e| RemoteError::Reload(format!("failed to run `{}`: {}", reload, e)))?;

        if !status.success() {
            return Err(RemoteError::Reload(format!(
                "`{}` exited with {}",
                reload, status
            )));
        }

        self.reconnect().await
    }
}
