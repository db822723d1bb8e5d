// ABOUTME: Runs the planned stages against one host, in order, stopping at the first failure.
// ABOUTME: Owns the provisioning guard, hook phases and the final build report.

use serde::Serialize;
use snafu::{ResultExt, ensure};
use std::time::Duration;

use super::error::{BuildError, StageSnafu, UserAbortSnafu};
use super::marker::{MARKER_PATH, ProvisioningMarker};
use super::prompt::Confirm;
use super::stage::Stage;
use super::stages::{self, StageContext};
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::hooks::HookPhase;
use crate::remote::{RemoteCommand, RemoteEnvironment};

/// Default wait after a sandbox reload.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(15);

/// Outcome of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub host: String,
    pub stages: Vec<Stage>,
    pub warnings: Vec<Warning>,
    pub marker: ProvisioningMarker,
}

type StageObserver<'a> = Box<dyn Fn(Stage) + Send + Sync + 'a>;

/// Drives one build of `config` on one host.
pub struct Orchestrator<'a> {
    config: &'a Config,
    env: &'a dyn RemoteEnvironment,
    confirm: &'a dyn Confirm,
    settle_delay: Duration,
    on_stage: Option<StageObserver<'a>>,
    completed: Vec<Stage>,
    diagnostics: Diagnostics,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        env: &'a dyn RemoteEnvironment,
        confirm: &'a dyn Confirm,
    ) -> Self {
        Self {
            config,
            env,
            confirm,
            settle_delay: DEFAULT_SETTLE_DELAY,
            on_stage: None,
            completed: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// How long to wait after reloading a sandbox.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Called as each stage starts.
    pub fn on_stage(mut self, observer: impl Fn(Stage) + Send + Sync + 'a) -> Self {
        self.on_stage = Some(Box::new(observer));
        self
    }

    /// Stages that finished, in order. After a failure this ends just
    /// before the stage that failed.
    pub fn completed_stages(&self) -> &[Stage] {
        &self.completed
    }

    pub fn warnings(&self) -> &[Warning] {
        self.diagnostics.warnings()
    }

    /// Run every enabled stage in order.
    pub async fn run(&mut self) -> Result<BuildReport, BuildError> {
        let plan = Stage::plan(self.config);
        tracing::info!(
            host = self.env.host(),
            project = %self.config.project(),
            stages = plan.len(),
            "starting build"
        );

        let mut marker = None;
        for stage in plan {
            if let Some(observer) = &self.on_stage {
                observer(stage);
            }
            tracing::info!(host = self.env.host(), stage = %stage, "{}", stage.description());

            match stage {
                Stage::PreBuildGuard => self.pre_build_guard().await?,
                Stage::PreBuildHooks => self.run_hooks(HookPhase::PreBuild).await?,
                Stage::CheckoutAll => {
                    self.run_stage(stage).await?;
                    self.run_hooks(HookPhase::PostCheckout).await?;
                }
                Stage::PostBuildHooks => self.run_hooks(HookPhase::PostBuild).await?,
                Stage::PostBuildGuard => marker = Some(self.post_build_guard().await?),
                _ => self.run_stage(stage).await?,
            }

            self.completed.push(stage);
        }

        let marker = marker.unwrap_or_else(|| ProvisioningMarker::for_config(self.config));
        tracing::info!(host = self.env.host(), "build finished");

        Ok(BuildReport {
            host: self.env.host().to_string(),
            stages: self.completed.clone(),
            warnings: self.diagnostics.warnings().to_vec(),
            marker,
        })
    }

    async fn run_stage(&mut self, stage: Stage) -> Result<(), BuildError> {
        let mut cx = StageContext {
            config: self.config,
            env: self.env,
            settle_delay: self.settle_delay,
            diagnostics: &mut self.diagnostics,
        };

        let result = match stage {
            Stage::SetupScm => stages::system::setup_scm(&mut cx).await,
            Stage::SetupDatabaseEngine => stages::system::setup_database_engine(&mut cx).await,
            Stage::SetupAdditionalPackages => {
                stages::system::setup_additional_packages(&mut cx).await
            }
            Stage::SetupLanguageRuntime => stages::system::setup_language_runtime(&mut cx).await,
            Stage::SetupWebServerEngine => stages::web::setup_web_server_engine(&mut cx).await,
            Stage::CreateDatabase => stages::database::create_database(&mut cx).await,
            Stage::SetupAccessCredentials => {
                stages::checkout::setup_access_credentials(&mut cx).await
            }
            Stage::CheckoutAll => stages::checkout::checkout_all(&mut cx).await,
            Stage::InstallApplicationDependencies => {
                stages::django::install_application_dependencies(&mut cx).await
            }
            Stage::ConfigureWebServer => stages::web::configure_web_server(&mut cx).await,
            Stage::RestoreDatabaseConfig => {
                stages::database::restore_database_config(&mut cx).await
            }
            Stage::RestoreDatabaseDump => stages::database::restore_database_dump(&mut cx).await,
            Stage::ApplyMigrations => stages::django::apply_migrations(&mut cx).await,
            Stage::CreateAdminUser => stages::django::create_admin_user(&mut cx).await,
            Stage::CollectStaticAssets => stages::django::collect_static_assets(&mut cx).await,
            Stage::PlaceLocalSettings => stages::django::place_local_settings(&mut cx).await,
            Stage::CompileTranslations => stages::django::compile_translations(&mut cx).await,
            Stage::FixRepositoryPermissions => {
                stages::checkout::fix_repository_permissions(&mut cx).await
            }
            Stage::RestartServices => stages::web::restart_services(&mut cx).await,
            Stage::PreBuildGuard
            | Stage::PreBuildHooks
            | Stage::PostBuildHooks
            | Stage::PostBuildGuard => Ok(()),
        };

        result.context(StageSnafu { stage })
    }

    async fn run_hooks(&mut self, phase: HookPhase) -> Result<(), BuildError> {
        let ran = self
            .config
            .hooks()
            .run(phase, self.env)
            .await
            .map_err(|failure| BuildError::Hook {
                phase,
                hook: failure.hook,
                source: failure.source,
            })?;
        tracing::debug!(phase = %phase, hooks = ran, "hooks finished");
        Ok(())
    }

    /// Ask before rebuilding a host that carries a marker; clear it on yes.
    /// Then refresh the package index.
    async fn pre_build_guard(&mut self) -> Result<(), BuildError> {
        let host = self.env.host().to_string();
        let stage = Stage::PreBuildGuard;

        let provisioned = self
            .env
            .path_exists(MARKER_PATH)
            .await
            .context(StageSnafu { stage })?;

        if provisioned {
            let previous = self
                .env
                .exec(&RemoteCommand::new("cat").arg(MARKER_PATH))
                .await
                .context(StageSnafu { stage })?;

            let message = match ProvisioningMarker::parse(&previous.stdout) {
                Some(marker) => format!(
                    "{} was already built at {} from {}. Build it again?",
                    host, marker.built_at, marker.builder
                ),
                None => format!("{} has already been built. Build it again?", host),
            };

            let proceed = self.confirm.confirm(&message).await?;
            ensure!(proceed, UserAbortSnafu { host: host.clone() });

            self.env
                .run(&RemoteCommand::new("rm").args(["-f", MARKER_PATH]))
                .await
                .context(StageSnafu { stage })?;
        }

        self.env
            .refresh_packages()
            .await
            .context(StageSnafu { stage })
    }

    async fn post_build_guard(&mut self) -> Result<ProvisioningMarker, BuildError> {
        let marker = ProvisioningMarker::for_config(self.config);
        self.env
            .write_file(marker.render().as_bytes(), MARKER_PATH, false)
            .await
            .context(StageSnafu {
                stage: Stage::PostBuildGuard,
            })?;
        Ok(marker)
    }
}

/// Build `config` on `env` with default settings.
pub async fn run_setup(
    config: &Config,
    env: &dyn RemoteEnvironment,
    confirm: &dyn Confirm,
) -> Result<BuildReport, BuildError> {
    Orchestrator::new(config, env, confirm).run().await
}
