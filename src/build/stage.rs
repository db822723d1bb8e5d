// ABOUTME: The fixed, ordered stage table and the gate that decides whether each stage runs.
// ABOUTME: Stage::plan(config) is the exact sequence a build executes.

use serde::Serialize;
use std::fmt;

use crate::config::Config;

/// One named unit of provisioning work, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PreBuildGuard,
    PreBuildHooks,
    SetupScm,
    SetupDatabaseEngine,
    SetupAdditionalPackages,
    SetupLanguageRuntime,
    SetupWebServerEngine,
    CreateDatabase,
    SetupAccessCredentials,
    CheckoutAll,
    InstallApplicationDependencies,
    ConfigureWebServer,
    RestoreDatabaseConfig,
    RestoreDatabaseDump,
    ApplyMigrations,
    CreateAdminUser,
    CollectStaticAssets,
    PlaceLocalSettings,
    CompileTranslations,
    PostBuildHooks,
    FixRepositoryPermissions,
    RestartServices,
    PostBuildGuard,
}

impl Stage {
    pub const ALL: [Stage; 23] = [
        Stage::PreBuildGuard,
        Stage::PreBuildHooks,
        Stage::SetupScm,
        Stage::SetupDatabaseEngine,
        Stage::SetupAdditionalPackages,
        Stage::SetupLanguageRuntime,
        Stage::SetupWebServerEngine,
        Stage::CreateDatabase,
        Stage::SetupAccessCredentials,
        Stage::CheckoutAll,
        Stage::InstallApplicationDependencies,
        Stage::ConfigureWebServer,
        Stage::RestoreDatabaseConfig,
        Stage::RestoreDatabaseDump,
        Stage::ApplyMigrations,
        Stage::CreateAdminUser,
        Stage::CollectStaticAssets,
        Stage::PlaceLocalSettings,
        Stage::CompileTranslations,
        Stage::PostBuildHooks,
        Stage::FixRepositoryPermissions,
        Stage::RestartServices,
        Stage::PostBuildGuard,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::PreBuildGuard => "pre_build_guard",
            Stage::PreBuildHooks => "pre_build_hooks",
            Stage::SetupScm => "setup_scm",
            Stage::SetupDatabaseEngine => "setup_database_engine",
            Stage::SetupAdditionalPackages => "setup_additional_packages",
            Stage::SetupLanguageRuntime => "setup_language_runtime",
            Stage::SetupWebServerEngine => "setup_web_server_engine",
            Stage::CreateDatabase => "create_database",
            Stage::SetupAccessCredentials => "setup_access_credentials",
            Stage::CheckoutAll => "checkout_all",
            Stage::InstallApplicationDependencies => "install_application_dependencies",
            Stage::ConfigureWebServer => "configure_web_server",
            Stage::RestoreDatabaseConfig => "restore_database_config",
            Stage::RestoreDatabaseDump => "restore_database_dump",
            Stage::ApplyMigrations => "apply_migrations",
            Stage::CreateAdminUser => "create_admin_user",
            Stage::CollectStaticAssets => "collect_static_assets",
            Stage::PlaceLocalSettings => "place_local_settings",
            Stage::CompileTranslations => "compile_translations",
            Stage::PostBuildHooks => "post_build_hooks",
            Stage::FixRepositoryPermissions => "fix_repository_permissions",
            Stage::RestartServices => "restart_services",
            Stage::PostBuildGuard => "post_build_guard",
        }
    }

    /// Human-readable progress line.
    pub fn description(&self) -> &'static str {
        match self {
            Stage::PreBuildGuard => "Checking for a previous build",
            Stage::PreBuildHooks => "Running pre-build hooks",
            Stage::SetupScm => "Installing source control client",
            Stage::SetupDatabaseEngine => "Installing PostgreSQL",
            Stage::SetupAdditionalPackages => "Installing additional packages",
            Stage::SetupLanguageRuntime => "Installing Python and dependencies",
            Stage::SetupWebServerEngine => "Installing web server",
            Stage::CreateDatabase => "Creating database role and database",
            Stage::SetupAccessCredentials => "Installing deploy key",
            Stage::CheckoutAll => "Checking out repositories",
            Stage::InstallApplicationDependencies => "Installing application requirements",
            Stage::ConfigureWebServer => "Configuring web server site",
            Stage::RestoreDatabaseConfig => "Restoring PostgreSQL configuration",
            Stage::RestoreDatabaseDump => "Restoring database dump",
            Stage::ApplyMigrations => "Applying migrations",
            Stage::CreateAdminUser => "Creating admin user",
            Stage::CollectStaticAssets => "Collecting static files",
            Stage::PlaceLocalSettings => "Placing local settings",
            Stage::CompileTranslations => "Compiling translations",
            Stage::PostBuildHooks => "Running post-build hooks",
            Stage::FixRepositoryPermissions => "Fixing repository permissions",
            Stage::RestartServices => "Restarting services",
            Stage::PostBuildGuard => "Writing provisioning marker",
        }
    }

    /// Whether this stage runs for `config`.
    pub fn is_enabled(&self, config: &Config) -> bool {
        let needs_scm = config.deploy_scm() || !config.checkouts().is_empty();
        let options = config.options();

        match self {
            Stage::PreBuildGuard
            | Stage::PreBuildHooks
            | Stage::SetupAdditionalPackages
            | Stage::SetupLanguageRuntime
            | Stage::PostBuildHooks
            | Stage::FixRepositoryPermissions
            | Stage::PostBuildGuard => true,

            Stage::SetupScm | Stage::SetupAccessCredentials => needs_scm,
            Stage::CheckoutAll => !config.checkouts().is_empty(),

            Stage::SetupDatabaseEngine | Stage::CreateDatabase => config.deploy_database(),
            Stage::RestoreDatabaseConfig => {
                config.deploy_database()
                    && (options.pg_hba_name.is_some() || options.postgresql_conf_name.is_some())
            }
            Stage::RestoreDatabaseDump => config.deploy_database() && config.restore_database(),

            Stage::SetupWebServerEngine | Stage::ConfigureWebServer => config.deploy_web_server(),

            Stage::InstallApplicationDependencies
            | Stage::CollectStaticAssets
            | Stage::PlaceLocalSettings
            | Stage::CompileTranslations => config.deploy_django(),
            Stage::ApplyMigrations => config.deploy_django() && options.run_migrations,
            Stage::CreateAdminUser => config.deploy_django() && options.create_admin_user,

            Stage::RestartServices => config.deploy_web_server() || config.deploy_database(),
        }
    }

    /// The ordered stages a build of `config` executes.
    pub fn plan(config: &Config) -> Vec<Stage> {
        Stage::ALL
            .iter()
            .copied()
            .filter(|stage| stage.is_enabled(config))
            .collect()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
