// ABOUTME: Package stages: source control client, PostgreSQL, extras and the Python toolchain.
// ABOUTME: Each package goes through ensure_package so installed ones are left alone.

use super::StageContext;
use crate::remote::{RemoteCommand, RemoteError};

pub const DATABASE_PACKAGES: &[&str] = &["postgresql", "postgresql-client", "libpq-dev"];
pub const POSTGIS_PACKAGE: &str = "postgis";
pub const RUNTIME_PACKAGES: &[&str] = &["build-essential", "python", "python-dev", "python-pip"];

pub fn pip_install(requirement: &str) -> RemoteCommand {
    RemoteCommand::new("pip")
        .args(["install", requirement])
        .sudo()
}

pub async fn setup_scm(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    cx.env.ensure_package(cx.config.scm().package()).await?;
    Ok(())
}

pub async fn setup_database_engine(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    for package in DATABASE_PACKAGES {
        cx.env.ensure_package(package).await?;
    }
    if cx.config.options().use_postgis {
        cx.env.ensure_package(POSTGIS_PACKAGE).await?;
    }
    Ok(())
}

pub async fn setup_additional_packages(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    for package in cx.config.packages() {
        cx.env.ensure_package(package).await?;
    }
    Ok(())
}

/// Toolchain packages, then every Python dependency in list order.
pub async fn setup_language_runtime(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    for package in RUNTIME_PACKAGES {
        cx.env.ensure_package(package).await?;
    }
    for dependency in cx.config.python_dependencies() {
        tracing::info!(dependency = %dependency, "installing python dependency");
        cx.env.run(&pip_install(dependency)).await?;
    }
    Ok(())
}
