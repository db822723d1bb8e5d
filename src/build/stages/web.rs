// ABOUTME: Web server stages: install (swapping out the other server), site configuration, restart.
// ABOUTME: Apache runs the app through mod_wsgi; nginx proxies to a uWSGI process.

use super::{StageContext, service};
use crate::config::WebServer;
use crate::diagnostics::Warning;
use crate::remote::{RemoteCommand, RemoteError, packages};

pub const POSTGRES_SERVICE: &str = "postgresql";

/// Install the configured web server, removing the other one first.
///
/// The teardown is destructive and tolerant: a failed stop or purge is
/// recorded as a warning and the install proceeds.
pub async fn setup_web_server_engine(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    let Some(server) = cx.config.web_server() else {
        return Ok(());
    };

    let other = server.other();
    if cx.env.package_installed(other.primary_package()).await? {
        tracing::info!("Replacing {} with {}", other, server);

        let stop = cx.env.exec(&service(other.service(), "stop")).await?;
        if !stop.success() {
            cx.diagnostics.warn(Warning::server_teardown(format!(
                "stopping {} exited with status {}",
                other.service(),
                stop.exit_code
            )));
        }

        let purge = packages::purge(cx.env, other.packages()).await?;
        if !purge.success() {
            cx.diagnostics.warn(Warning::server_teardown(format!(
                "purging {} exited with status {}",
                other.packages().join(" "),
                purge.exit_code
            )));
        }
    }

    let mut already_installed = true;
    for package in server.packages() {
        already_installed &= cx.env.ensure_package(package).await?;
    }

    if server == WebServer::Apache {
        cx.env
            .run(&RemoteCommand::new("a2enmod").arg("rewrite").sudo())
            .await?;
    }

    if !already_installed && cx.env.is_sandbox() {
        tracing::info!(
            "Fresh {} install on a sandbox, reloading and waiting {:?}",
            server,
            cx.settle_delay
        );
        cx.env.reload().await?;
        tokio::time::sleep(cx.settle_delay).await;
    }

    Ok(())
}

/// Replace the enabled site with the project's configuration.
pub async fn configure_web_server(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    let (Some(server), Some(site_config)) = (cx.config.web_server(), cx.config.site_config_name())
    else {
        return Ok(());
    };

    let project = cx.config.project().as_str();
    let available = format!("{}/{}", server.sites_available(), project);
    let enabled = format!("{}/{}", server.sites_enabled(), project);
    let default = format!("{}/{}", server.sites_enabled(), server.default_site());

    cx.env
        .run(
            &RemoteCommand::new("rm")
                .args(["-f", default.as_str(), enabled.as_str()])
                .sudo(),
        )
        .await?;
    cx.env
        .upload(&cx.config.local_path(site_config), &available, true)
        .await?;
    cx.env
        .run(
            &RemoteCommand::new("ln")
                .args(["-sf", available.as_str(), enabled.as_str()])
                .sudo(),
        )
        .await?;

    if let Some(uwsgi) = cx.config.uwsgi() {
        if let Some(ini) = &uwsgi.ini_name {
            cx.env
                .upload(&cx.config.local_path(ini), &uwsgi.ini_path, true)
                .await?;
        }
        if let Some(params) = &uwsgi.params_name {
            cx.env
                .upload(&cx.config.local_path(params), &uwsgi.params_path, true)
                .await?;
        }
    }

    Ok(())
}

/// Restart whatever this build deployed.
pub async fn restart_services(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    if cx.config.deploy_web_server()
        && let Some(server) = cx.config.web_server()
    {
        cx.env.run(&service(server.service(), "restart")).await?;

        if let Some(uwsgi) = cx.config.uwsgi() {
            relaunch_uwsgi(cx, &uwsgi.ini_path).await?;
        }
    }

    if cx.config.deploy_database() {
        cx.env.run(&service(POSTGRES_SERVICE, "restart")).await?;
    }

    Ok(())
}

/// Pid file the uWSGI master is launched with and stopped through.
pub fn uwsgi_pidfile(project: &str) -> String {
    format!("/var/run/uwsgi-{}.pid", project)
}

async fn relaunch_uwsgi(cx: &mut StageContext<'_>, ini_path: &str) -> Result<(), RemoteError> {
    let project = cx.config.project().to_string();
    let pidfile = uwsgi_pidfile(&project);

    if cx.env.path_exists(&pidfile).await? {
        // A stale pid file makes --stop exit non-zero.
        let stop = cx
            .env
            .exec(
                &RemoteCommand::new("uwsgi")
                    .args(["--stop", pidfile.as_str()])
                    .sudo(),
            )
            .await?;
        if !stop.success() {
            tracing::debug!(exit_code = stop.exit_code, "uwsgi --stop found no master");
        }
    }

    let log = format!("/var/log/uwsgi/{}.log", project);
    cx.env
        .run(
            &RemoteCommand::new("uwsgi")
                .args([
                    "--ini",
                    ini_path,
                    "--pidfile",
                    pidfile.as_str(),
                    "--daemonize",
                    log.as_str(),
                ])
                .sudo(),
        )
        .await?;
    Ok(())
}
