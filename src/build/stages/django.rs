// ABOUTME: Django stages run through manage.py in the checked-out project.
// ABOUTME: Requirements, migrations, admin user, static files, local settings and translations.

use super::StageContext;
use super::system::pip_install;
use crate::config::{Config, DATABASE_DRIVER};
use crate::diagnostics::Warning;
use crate::remote::{RemoteCommand, RemoteError};

/// Debian package providing the PostgreSQL driver without building it.
pub const DRIVER_PACKAGE: &str = "python-psycopg2";

fn manage_in(config: &Config, cwd: &str, args: &[&str]) -> RemoteCommand {
    let project = config.django_project_path().unwrap_or(".");
    RemoteCommand::new("python")
        .arg(format!("{}/manage.py", project.trim_end_matches('/')))
        .args(args.iter().copied())
        .cwd(cwd)
        .sudo()
}

fn manage(config: &Config, args: &[&str]) -> RemoteCommand {
    manage_in(config, config.django_project_path().unwrap_or("."), args)
}

/// Python string literal.
fn py_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn parent_dir(path: &str) -> &str {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some(("", _)) => "/",
        Some((parent, _)) => parent,
        None => ".",
    }
}

/// Install the project's requirements file. When this build does not
/// deploy the database but the requirements still name the driver, the
/// prebuilt driver package is installed first.
pub async fn install_application_dependencies(
    cx: &mut StageContext<'_>,
) -> Result<(), RemoteError> {
    let Some(requirements) = cx.config.options().requirements_path.as_deref() else {
        return Ok(());
    };

    if !cx.config.deploy_database() {
        let mentions_driver = cx
            .env
            .exec(&RemoteCommand::new("grep").args([
                "-qi",
                DATABASE_DRIVER,
                requirements,
            ]))
            .await?
            .success();
        if mentions_driver {
            cx.env.ensure_package(DRIVER_PACKAGE).await?;
        }
    }

    cx.env.run(&pip_install("-r").arg(requirements)).await?;
    Ok(())
}

pub async fn apply_migrations(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    cx.env
        .run(&manage(cx.config, &["syncdb", "--noinput"]))
        .await?;
    cx.env
        .run(&manage(cx.config, &["migrate", "--noinput"]))
        .await?;
    Ok(())
}

/// Python snippet for `manage.py shell` that creates the superuser unless the name is taken.
pub fn admin_user_script(user: &str, email: &str, password: &str) -> String {
    let user = py_literal(user);
    format!(
        "from django.contrib.auth.models import User; \
         User.objects.filter(username={user}).exists() or \
         User.objects.create_superuser({user}, {}, {})",
        py_literal(email),
        py_literal(password)
    )
}

pub async fn create_admin_user(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    let options = cx.config.options();
    let script = admin_user_script(
        &options.django_admin_user,
        &options.django_admin_email,
        &options.django_admin_password,
    );
    let command = manage(cx.config, &["shell"])
        .pipe_from(RemoteCommand::new("printf").args(["%s\\n", script.as_str()]));
    cx.env.run(&command).await?;
    Ok(())
}

pub async fn collect_static_assets(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    if let Some(static_root) = cx.config.options().static_root.as_deref() {
        cx.env
            .run(&RemoteCommand::new("mkdir").args(["-p", static_root]).sudo())
            .await?;
    }
    cx.env
        .run(&manage(cx.config, &["collectstatic", "--noinput"]))
        .await?;
    Ok(())
}

pub async fn place_local_settings(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    let options = cx.config.options();
    if let (Some(name), Some(path)) = (
        options.local_settings_name.as_deref(),
        options.local_settings_path.as_deref(),
    ) {
        cx.env
            .upload(&cx.config.local_path(name), path, true)
            .await?;
    }
    Ok(())
}

/// Pull translations when the locale has a `.tx` directory, then extract
/// and compile messages from the locale's parent directory.
pub async fn compile_translations(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    if let Some(tx) = cx.config.transifex() {
        cx.env
            .upload(&cx.config.local_path(&tx.rc_name), "/root/.transifexrc", true)
            .await?;

        let tx_dir = format!("{}/.tx", tx.locale_path.trim_end_matches('/'));
        if cx.env.path_exists(&tx_dir).await? {
            cx.env
                .run(
                    &RemoteCommand::new("tx")
                        .args(["pull", "-a"])
                        .cwd(tx.locale_path.as_str())
                        .as_user("root"),
                )
                .await?;
        } else {
            cx.diagnostics.warn(Warning::translations_skipped(format!(
                "no {} found, skipping translation pull",
                tx_dir
            )));
        }
    }

    let cwd = match cx.config.options().django_locale_path.as_deref() {
        Some(locale) => parent_dir(locale),
        None => cx.config.django_project_path().unwrap_or("."),
    };

    for args in [
        &["makemessages", "-a", "-d", "django"][..],
        &["makemessages", "-a", "-d", "djangojs"][..],
        &["compilemessages"][..],
    ] {
        cx.env.run(&manage_in(cx.config, cwd, args)).await?;
    }
    Ok(())
}
