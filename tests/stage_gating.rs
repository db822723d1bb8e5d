// ABOUTME: Property tests for stage gating: the executed stages always equal the plan.
// ABOUTME: Every combination of deploy flags, checkouts and web server is built against a fake host.

mod support;

use djangostack::build::{AssumeYes, Orchestrator, Stage};
use djangostack::config::{Config, Options, PermissionDirectives};
use proptest::prelude::*;
use std::fs;
use std::time::Duration;
use support::fake_env::FakeEnvironment;
use tempfile::TempDir;

#[derive(Debug, Clone)]
struct Flags {
    scm: bool,
    database: bool,
    restore: bool,
    postgres_config: bool,
    django: bool,
    migrations: bool,
    admin_user: bool,
    web_server: Option<&'static str>,
    checkouts: bool,
}

fn flags() -> impl Strategy<Value = Flags> {
    (
        any::<[bool; 8]>(),
        prop_oneof![Just(None), Just(Some("apache")), Just(Some("nginx"))],
    )
        .prop_map(|(b, web_server)| Flags {
            scm: b[0],
            database: b[1],
            restore: b[2],
            postgres_config: b[3],
            django: b[4],
            migrations: b[5],
            admin_user: b[6],
            web_server,
            checkouts: b[7],
        })
}

fn config_for(flags: &Flags, dir: &TempDir) -> Config {
    let options = Options {
        deploy_scm: flags.scm,
        deploy_database: flags.database,
        database_name: Some("sampledb".to_string()),
        database_user: Some("sampleuser".to_string()),
        database_password: Some("s3cret".to_string()),
        restore_database: flags.restore,
        pg_hba_name: flags.postgres_config.then(|| "pg_hba.conf".to_string()),
        deploy_django: flags.django,
        django_project_path: Some("/var/www/site/samplesite".to_string()),
        run_migrations: flags.migrations,
        create_admin_user: flags.admin_user,
        deploy_web_server: flags.web_server.is_some(),
        web_server: flags.web_server.map(str::to_string),
        uwsgi_ini_path: Some("/etc/uwsgi/samplesite.ini".to_string()),
        uwsgi_params_path: Some("/etc/nginx/uwsgi_params".to_string()),
        ..Options::default()
    };
    let mut config = Config::new("samplesite", options)
        .unwrap()
        .with_base_dir(dir.path());
    if flags.checkouts {
        config.add_checkout(
            "ssh://hg@bitbucket.org/me/site",
            "/var/www/site",
            PermissionDirectives::default(),
        )
        .unwrap();
    }
    config
}

fn local_files() -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in [
        "deploykey",
        "deploykey.pub",
        "apache_site",
        "nginx_site",
        "dbdump.txt",
        "pg_hba.conf",
    ] {
        fs::write(dir.path().join(name), name).unwrap();
    }
    dir
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn executed_stages_equal_plan(flags in flags()) {
        let dir = local_files();
        let config = config_for(&flags, &dir);
        let env = FakeEnvironment::new();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let executed = runtime.block_on(async {
            let mut orchestrator = Orchestrator::new(&config, &env, &AssumeYes)
                .settle_delay(Duration::ZERO);
            orchestrator.run().await.map(|report| report.stages)
        });

        prop_assert_eq!(executed.unwrap(), Stage::plan(&config));
    }

    #[test]
    fn gates_follow_flags(flags in flags()) {
        let dir = local_files();
        let config = config_for(&flags, &dir);
        let plan = Stage::plan(&config);
        let has = |stage| plan.contains(&stage);

        prop_assert_eq!(has(Stage::SetupScm), flags.scm || flags.checkouts);
        prop_assert_eq!(has(Stage::SetupAccessCredentials), flags.scm || flags.checkouts);
        prop_assert_eq!(has(Stage::CheckoutAll), flags.checkouts);
        prop_assert_eq!(has(Stage::SetupDatabaseEngine), flags.database);
        prop_assert_eq!(has(Stage::CreateDatabase), flags.database);
        prop_assert_eq!(
            has(Stage::RestoreDatabaseConfig),
            flags.database && flags.postgres_config
        );
        prop_assert_eq!(has(Stage::RestoreDatabaseDump), flags.database && flags.restore);
        prop_assert_eq!(has(Stage::SetupWebServerEngine), flags.web_server.is_some());
        prop_assert_eq!(has(Stage::ConfigureWebServer), flags.web_server.is_some());
        prop_assert_eq!(has(Stage::InstallApplicationDependencies), flags.django);
        prop_assert_eq!(has(Stage::ApplyMigrations), flags.django && flags.migrations);
        prop_assert_eq!(has(Stage::CreateAdminUser), flags.django && flags.admin_user);
        prop_assert_eq!(
            has(Stage::RestartServices),
            flags.database || flags.web_server.is_some()
        );

        for stage in [
            Stage::PreBuildGuard,
            Stage::PreBuildHooks,
            Stage::SetupAdditionalPackages,
            Stage::SetupLanguageRuntime,
            Stage::PostBuildHooks,
            Stage::FixRepositoryPermissions,
            Stage::PostBuildGuard,
        ] {
            prop_assert!(has(stage), "{} always runs", stage);
        }

        let positions: Vec<usize> = plan
            .iter()
            .map(|s| Stage::ALL.iter().position(|a| a == s).unwrap())
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]), "plan keeps table order");
    }
}
