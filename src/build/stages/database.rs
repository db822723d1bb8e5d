// ABOUTME: PostgreSQL stages: role and database creation, config file overrides, dump restore.
// ABOUTME: Dumps live in the postgres home and are loaded as the postgres user.

use super::{StageContext, file_name};
use crate::config::DumpFormat;
use crate::diagnostics::Warning;
use crate::remote::postgres::{POSTGRES_USER, psql};
use crate::remote::{DatabaseSpec, RemoteCommand, RemoteError, RoleSpec};

pub const POSTGRES_HOME: &str = "/var/lib/postgresql";
pub const POSTGRES_CONFIG_ROOT: &str = "/etc/postgresql";

pub const POSTGIS_EXTENSIONS: [&str; 4] = [
    "postgis",
    "postgis_topology",
    "fuzzystrmatch",
    "postgis_tiger_geocoder",
];

pub async fn create_database(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    let Some(db) = cx.config.database() else {
        return Ok(());
    };

    cx.env
        .ensure_role(&RoleSpec::new(&db.user, &db.password).createdb(true))
        .await?;
    cx.env
        .ensure_database(&DatabaseSpec::new(&db.name, &db.user))
        .await?;

    if cx.config.options().use_postgis {
        for extension in POSTGIS_EXTENSIONS {
            let sql = format!("CREATE EXTENSION IF NOT EXISTS {}", extension);
            cx.env.run(&psql(Some(&db.name), &sql)).await?;
        }
    }

    Ok(())
}

/// Overwrite `pg_hba.conf` and `postgresql.conf` with local copies.
/// A file that cannot be located on the target is skipped with a warning.
pub async fn restore_database_config(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    let options = cx.config.options();
    let overrides = [
        (options.pg_hba_name.as_deref(), "pg_hba.conf"),
        (options.postgresql_conf_name.as_deref(), "postgresql.conf"),
    ];

    for (local, target) in overrides {
        let Some(local) = local else { continue };

        let lookup = RemoteCommand::new("find")
            .args([POSTGRES_CONFIG_ROOT, "-name", target])
            .sudo();
        let found = cx.env.exec(&lookup).await?;
        let remote = found
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .filter(|_| found.success());

        let Some(remote) = remote else {
            cx.diagnostics.warn(Warning::config_file_not_found(format!(
                "{} not found under {}, keeping the installed one",
                target, POSTGRES_CONFIG_ROOT
            )));
            continue;
        };

        cx.env
            .upload(&cx.config.local_path(local), remote, true)
            .await?;
        let owner = format!("{0}:{0}", POSTGRES_USER);
        cx.env
            .run(
                &RemoteCommand::new("chown")
                    .args([owner.as_str(), remote])
                    .sudo(),
            )
            .await?;
    }

    Ok(())
}

/// Upload the dump unless it is already there, then load it.
pub async fn restore_database_dump(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    let Some(db) = cx.config.database() else {
        return Ok(());
    };
    let options = cx.config.options();
    let dump = file_name(&options.database_dump_name);
    let remote = format!("{}/{}", POSTGRES_HOME, dump);

    if !cx.env.path_exists(&remote).await? {
        cx.env
            .upload(
                &cx.config.local_path(&options.database_dump_name),
                &remote,
                true,
            )
            .await?;
    }
    cx.env
        .run(
            &RemoteCommand::new("chown")
                .args([POSTGRES_USER, remote.as_str()])
                .sudo(),
        )
        .await?;

    let steps = restore_steps(
        options.database_dump_type,
        options.use_postgis,
        &options.postgis_restore_script,
        &db.name,
        dump,
    );
    for step in steps {
        cx.env
            .run(&step.cwd(POSTGRES_HOME).as_user(POSTGRES_USER))
            .await?;
    }

    Ok(())
}

/// Commands that load `dump` into `database`, run from the postgres home.
///
/// Only custom archives go through the PostGIS restore script, which reads
/// pg_dump archives and writes SQL. Plain SQL dumps always load with psql.
pub fn restore_steps(
    format: DumpFormat,
    use_postgis: bool,
    postgis_script: &str,
    database: &str,
    dump: &str,
) -> Vec<RemoteCommand> {
    match (format, use_postgis) {
        (DumpFormat::Sql, _) => vec![RemoteCommand::new("psql").arg(database).stdin_from(dump)],
        (DumpFormat::Archive, false) => {
            vec![RemoteCommand::new("pg_restore").args(["-d", database, dump])]
        }
        (DumpFormat::Archive, true) => {
            let filtered = format!("{}.postgis.sql", dump);
            vec![
                RemoteCommand::new("perl")
                    .args([postgis_script, dump])
                    .stdout_to(filtered.as_str()),
                RemoteCommand::new("psql")
                    .args(["-d", database])
                    .stdin_from(filtered.as_str()),
            ]
        }
    }
}
