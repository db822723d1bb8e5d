// ABOUTME: Debian package helpers built on RemoteEnvironment::exec.
// ABOUTME: dpkg-query for install state, apt-get for update, install and purge.

use super::{RemoteCommand, RemoteEnvironment, RemoteError};
use crate::ssh::CommandOutput;

fn apt_get<I, S>(args: I) -> RemoteCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    RemoteCommand::new("apt-get")
        .env("DEBIAN_FRONTEND", "noninteractive")
        .args(args)
        .sudo()
}

pub async fn is_installed<E>(env: &E, name: &str) -> Result<bool, RemoteError>
where
    E: RemoteEnvironment + ?Sized,
{
    let query = RemoteCommand::new("dpkg-query").args(["-W", "-f=${Status}", name]);
    let output = env.exec(&query).await?;
    Ok(output.success() && output.stdout.contains("install ok installed"))
}

/// Install `name` unless dpkg already reports it installed.
/// Returns whether the package was already present.
pub async fn ensure<E>(env: &E, name: &str) -> Result<bool, RemoteError>
where
    E: RemoteEnvironment + ?Sized,
{
    if is_installed(env, name).await? {
        tracing::debug!(package = name, "package already installed");
        return Ok(true);
    }

    tracing::info!(package = name, "installing package");
    env.run(&apt_get(["install", "-y", "-q", name])).await?;
    Ok(false)
}

pub async fn refresh<E>(env: &E) -> Result<(), RemoteError>
where
    E: RemoteEnvironment + ?Sized,
{
    env.run(&apt_get(["update", "-q"])).await?;
    Ok(())
}

/// Purge packages. The raw output is returned so callers decide whether a
/// failure matters.
pub async fn purge<E>(env: &E, names: &[&str]) -> Result<CommandOutput, RemoteError>
where
    E: RemoteEnvironment + ?Sized,
{
    env.exec(&apt_get(["purge", "-y", "-q"]).args(names.iter().copied()))
        .await
}
