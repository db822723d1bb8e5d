// ABOUTME: Validated build configuration and its append-only registries.
// ABOUTME: Config::new enforces option invariants before anything touches a host.

use std::fmt;
use std::path::{Path, PathBuf};

use super::checkout::{CheckoutEntry, PermissionDirectives};
use super::options::Options;
use super::platform::{ScmType, WebServer};
use super::ConfigError;
use crate::hooks::{Hook, HookError, HookPhase, HookRegistry};
use crate::types::ProjectName;

/// Packages every build installs.
pub const BASELINE_PACKAGES: &[&str] = &["vim", "gettext"];

/// Python packages every build starts from, before pruning and additions.
pub const DEFAULT_PYTHON_DEPENDENCIES: &[&str] = &["psycopg2", "south"];

/// The PostgreSQL driver, dropped when no database is deployed.
pub const DATABASE_DRIVER: &str = "psycopg2";

/// Command-line client for the translation service.
pub const TRANSLATION_CLIENT: &str = "transifex-client";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub name: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UwsgiSettings {
    /// Remote ini file the application server is launched with.
    pub ini_path: String,
    /// Remote uwsgi_params file included by the nginx site.
    pub params_path: String,
    /// Local copies to upload; when unset the remote files must already exist.
    pub ini_name: Option<String>,
    pub params_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransifexSettings {
    pub rc_name: String,
    pub locale_path: String,
}

/// A validated deployment definition for one project.
pub struct Config {
    project: ProjectName,
    options: Options,
    scm: ScmType,
    web_server: Option<WebServer>,
    database: Option<DatabaseSettings>,
    uwsgi: Option<UwsgiSettings>,
    transifex: Option<TransifexSettings>,
    base_dir: PathBuf,
    packages: Vec<String>,
    python_dependencies: Vec<String>,
    checkouts: Vec<CheckoutEntry>,
    hooks: HookRegistry,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("project", &self.project)
            .field("scm", &self.scm)
            .field("web_server", &self.web_server)
            .field("packages", &self.packages)
            .field("python_dependencies", &self.python_dependencies)
            .field("checkouts", &self.checkouts)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    /// Validate `options` for `project_name`. Performs no I/O.
    pub fn new(project_name: &str, options: Options) -> Result<Self, ConfigError> {
        let project = ProjectName::new(project_name)?;
        let scm = ScmType::parse(&options.scm_type)?;

        let web_server = options
            .web_server
            .as_deref()
            .map(WebServer::parse)
            .transpose()?;
        if options.deploy_web_server && web_server.is_none() {
            return Err(ConfigError::MissingWebServer);
        }

        let uwsgi = match web_server {
            Some(WebServer::Nginx) if options.deploy_web_server => Some(UwsgiSettings {
                ini_path: required(&options.uwsgi_ini_path)
                    .ok_or(ConfigError::MissingUwsgiSetting("uwsgi_ini_path"))?
                    .to_string(),
                params_path: required(&options.uwsgi_params_path)
                    .ok_or(ConfigError::MissingUwsgiSetting("uwsgi_params_path"))?
                    .to_string(),
                ini_name: required(&options.uwsgi_ini_name).map(str::to_string),
                params_name: required(&options.uwsgi_params_name).map(str::to_string),
            }),
            _ => None,
        };

        let database = if options.deploy_database {
            Some(DatabaseSettings {
                name: required(&options.database_name)
                    .ok_or(ConfigError::MissingDatabaseSetting("database_name"))?
                    .to_string(),
                user: required(&options.database_user)
                    .ok_or(ConfigError::MissingDatabaseSetting("database_user"))?
                    .to_string(),
                password: required(&options.database_password)
                    .ok_or(ConfigError::MissingDatabaseSetting("database_password"))?
                    .to_string(),
            })
        } else {
            None
        };

        let transifex = if options.deploy_django && options.use_transifex {
            Some(TransifexSettings {
                rc_name: required(&options.transifexrc_name)
                    .ok_or(ConfigError::MissingTransifexSetting("transifexrc_name"))?
                    .to_string(),
                locale_path: required(&options.django_locale_path)
                    .ok_or(ConfigError::MissingTransifexSetting("django_locale_path"))?
                    .to_string(),
            })
        } else {
            None
        };

        if options.deploy_django && required(&options.django_project_path).is_none() {
            return Err(ConfigError::MissingDjangoProjectPath);
        }

        let python_dependencies = seed_python_dependencies(&options);

        Ok(Self {
            project,
            scm,
            web_server,
            database,
            uwsgi,
            transifex,
            base_dir: PathBuf::from("."),
            packages: BASELINE_PACKAGES.iter().map(|p| p.to_string()).collect(),
            python_dependencies,
            checkouts: Vec::new(),
            hooks: HookRegistry::default(),
            options,
        })
    }

    /// Directory that local file names in the options are relative to.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn add_package(&mut self, name: impl Into<String>) -> &mut Self {
        self.packages.push(name.into());
        self
    }

    pub fn add_python_dependency(&mut self, name: impl Into<String>) -> &mut Self {
        self.python_dependencies.push(name.into());
        self
    }

    pub fn add_checkout(
        &mut self,
        source: impl Into<String>,
        destination: impl Into<String>,
        permissions: PermissionDirectives,
    ) -> Result<&mut Self, ConfigError> {
        let entry = CheckoutEntry::new(source, destination).with_permissions(permissions);
        self.add_checkout_entry(entry)
    }

    /// Register a checkout. The destination is wiped on every build, so it
    /// must be an absolute path other than `/`.
    pub fn add_checkout_entry(&mut self, entry: CheckoutEntry) -> Result<&mut Self, ConfigError> {
        entry.validate()?;
        self.checkouts.push(entry);
        Ok(self)
    }

    pub fn add_hook(&mut self, phase: HookPhase, hook: impl Hook + 'static) -> &mut Self {
        self.hooks.add(phase, hook);
        self
    }

    /// Register a zero-argument callback.
    pub fn add_hook_fn<F>(&mut self, phase: HookPhase, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn() -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.add_fn(phase, name, f);
        self
    }

    pub fn project(&self) -> &ProjectName {
        &self.project
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn scm(&self) -> ScmType {
        self.scm
    }

    pub fn web_server(&self) -> Option<WebServer> {
        self.web_server
    }

    pub fn database(&self) -> Option<&DatabaseSettings> {
        self.database.as_ref()
    }

    pub fn uwsgi(&self) -> Option<&UwsgiSettings> {
        self.uwsgi.as_ref()
    }

    pub fn transifex(&self) -> Option<&TransifexSettings> {
        self.transifex.as_ref()
    }

    pub fn django_project_path(&self) -> Option<&str> {
        required(&self.options.django_project_path)
    }

    pub fn deploy_scm(&self) -> bool {
        self.options.deploy_scm
    }

    pub fn deploy_database(&self) -> bool {
        self.options.deploy_database
    }

    pub fn deploy_django(&self) -> bool {
        self.options.deploy_django
    }

    pub fn deploy_web_server(&self) -> bool {
        self.options.deploy_web_server
    }

    pub fn restore_database(&self) -> bool {
        self.options.restore_database
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn python_dependencies(&self) -> &[String] {
        &self.python_dependencies
    }

    pub fn checkouts(&self) -> &[CheckoutEntry] {
        &self.checkouts
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a local file name from the options.
    pub fn local_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Local site configuration file for the chosen web server.
    pub fn site_config_name(&self) -> Option<&str> {
        required(&self.options.site_config_name)
            .or_else(|| self.web_server.map(|w| w.default_site_config_name()))
    }
}

fn seed_python_dependencies(options: &Options) -> Vec<String> {
    let mut deps: Vec<String> = DEFAULT_PYTHON_DEPENDENCIES
        .iter()
        .map(|d| d.to_string())
        .collect();

    if !options.deploy_database {
        deps.retain(|d| d != DATABASE_DRIVER);
    }

    deps.push(match required(&options.django_version) {
        Some(version) => format!("Django=={}", version),
        None => "Django".to_string(),
    });

    if options.use_transifex {
        deps.push(TRANSLATION_CLIENT.to_string());
    }

    deps
}
