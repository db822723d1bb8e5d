// ABOUTME: The capability boundary between the build engine and a target host.
// ABOUTME: RemoteEnvironment trait, command builder, ensure helpers and the SSH implementation.

mod command;
mod error;
pub mod packages;
pub mod postgres;
mod ssh_env;

pub use command::{Privilege, RemoteCommand, quote};
pub use error::RemoteError;
pub use postgres::{DatabaseSpec, RoleSpec};
pub use ssh_env::SshEnvironment;

pub use crate::ssh::CommandOutput;

use async_trait::async_trait;
use std::path::Path;

/// Everything the build engine may do to one addressed host.
///
/// Implementors provide `exec` and `write_file`; the remaining methods have
/// default implementations on top of those two (dpkg/apt for packages,
/// psql/createdb for PostgreSQL) and can be overridden.
#[async_trait]
pub trait RemoteEnvironment: Send + Sync {
    /// Address of the host, for logs and messages.
    fn host(&self) -> &str;

    /// Run a command and return its output whatever the exit status.
    async fn exec(&self, command: &RemoteCommand) -> Result<CommandOutput, RemoteError>;

    /// Create or replace a remote file. `privileged` writes as root.
    async fn write_file(
        &self,
        contents: &[u8],
        remote_path: &str,
        privileged: bool,
    ) -> Result<(), RemoteError>;

    /// Run a command; a non-zero exit becomes `RemoteError::CommandFailed`.
    async fn run(&self, command: &RemoteCommand) -> Result<CommandOutput, RemoteError> {
        let output = self.exec(command).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(RemoteError::command_failed(command, &output))
        }
    }

    /// Copy a local file to the host.
    async fn upload(
        &self,
        local_path: &Path,
        remote_path: &str,
        privileged: bool,
    ) -> Result<(), RemoteError> {
        let contents =
            tokio::fs::read(local_path)
                .await
                .map_err(|source| RemoteError::LocalFile {
                    path: local_path.to_path_buf(),
                    source,
                })?;
        tracing::debug!(
            local = %local_path.display(),
            remote = remote_path,
            bytes = contents.len(),
            "uploading file"
        );
        self.write_file(&contents, remote_path, privileged).await
    }

    async fn path_exists(&self, remote_path: &str) -> Result<bool, RemoteError> {
        let output = self
            .exec(&RemoteCommand::new("test").args(["-e", remote_path]))
            .await?;
        Ok(output.success())
    }

    /// Whether this host is a disposable development sandbox that can be
    /// rebooted with `reload`.
    fn is_sandbox(&self) -> bool {
        false
    }

    /// Reboot a sandbox so newly installed services come up cleanly.
    async fn reload(&self) -> Result<(), RemoteError> {
        Err(RemoteError::ReloadUnsupported(self.host().to_string()))
    }

    async fn refresh_packages(&self) -> Result<(), RemoteError> {
        packages::refresh(self).await
    }

    async fn package_installed(&self, name: &str) -> Result<bool, RemoteError> {
        packages::is_installed(self, name).await
    }

    /// Install a package if missing; returns whether it was already installed.
    async fn ensure_package(&self, name: &str) -> Result<bool, RemoteError> {
        packages::ensure(self, name).await
    }

    async fn ensure_role(&self, role: &RoleSpec) -> Result<(), RemoteError> {
        postgres::ensure_role(self, role).await
    }

    async fn ensure_database(&self, database: &DatabaseSpec) -> Result<(), RemoteError> {
        postgres::ensure_database(self, database).await
    }
}
