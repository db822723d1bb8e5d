// ABOUTME: Hook registry for build lifecycle events.
// ABOUTME: Ordered pre-build, post-checkout and post-build callbacks; the first failure aborts.

mod script;

pub use script::{HookContext, LocalScriptHook, discover_local_hooks};

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::remote::{RemoteCommand, RemoteEnvironment, RemoteError};

/// Hook execution points in the build lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// After the provisioning guard, before any package is installed.
    PreBuild,
    /// After every checkout has been replaced.
    PostCheckout,
    /// After the Django stages, before permissions are fixed.
    PostBuild,
}

impl HookPhase {
    pub const ALL: [HookPhase; 3] = [
        HookPhase::PreBuild,
        HookPhase::PostCheckout,
        HookPhase::PostBuild,
    ];

    /// File name of the local script for this phase.
    pub fn filename(&self) -> &'static str {
        match self {
            HookPhase::PreBuild => "pre-build",
            HookPhase::PostCheckout => "post-checkout",
            HookPhase::PostBuild => "post-build",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename())
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("failed to execute {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exited with {}: {}", .path.display(), exit_status(.exit_code), .stderr.trim())]
    Script {
        path: PathBuf,
        exit_code: Option<i32>,
        stderr: String,
    },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl HookError {
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed(message.into())
    }
}

/// A callback run at one phase of the build.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    async fn run(&self, env: &dyn RemoteEnvironment) -> Result<(), HookError>;
}

/// Zero-argument closure hook.
pub struct FnHook<F> {
    name: String,
    f: F,
}

impl<F> FnHook<F>
where
    F: Fn() -> Result<(), HookError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn() -> Result<(), HookError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _env: &dyn RemoteEnvironment) -> Result<(), HookError> {
        (self.f)()
    }
}

/// A shell snippet run on the target host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellHook {
    command: String,
    sudo: bool,
    cwd: Option<String>,
}

impl ShellHook {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            sudo: false,
            cwd: None,
        }
    }

    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    pub fn cwd(mut self, dir: impl Into<String>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn command(&self) -> RemoteCommand {
        let mut command = RemoteCommand::shell(self.command.clone());
        if let Some(dir) = &self.cwd {
            command = command.cwd(dir.clone());
        }
        if self.sudo { command.sudo() } else { command }
    }
}

#[async_trait]
impl Hook for ShellHook {
    fn name(&self) -> &str {
        &self.command
    }

    async fn run(&self, env: &dyn RemoteEnvironment) -> Result<(), HookError> {
        env.run(&self.command()).await?;
        Ok(())
    }
}

/// A hook that failed, with the name it was registered under.
#[derive(Debug, Error)]
#[error("hook `{hook}` failed: {source}")]
pub struct HookFailure {
    pub hook: String,
    #[source]
    pub source: HookError,
}

/// Ordered hooks for each phase.
#[derive(Default)]
pub struct HookRegistry {
    pre_build: Vec<Box<dyn Hook>>,
    post_checkout: Vec<Box<dyn Hook>>,
    post_build: Vec<Box<dyn Hook>>,
}

impl HookRegistry {
    fn phase(&self, phase: HookPhase) -> &[Box<dyn Hook>] {
        match phase {
            HookPhase::PreBuild => &self.pre_build,
            HookPhase::PostCheckout => &self.post_checkout,
            HookPhase::PostBuild => &self.post_build,
        }
    }

    fn phase_mut(&mut self, phase: HookPhase) -> &mut Vec<Box<dyn Hook>> {
        match phase {
            HookPhase::PreBuild => &mut self.pre_build,
            HookPhase::PostCheckout => &mut self.post_checkout,
            HookPhase::PostBuild => &mut self.post_build,
        }
    }

    pub fn add(&mut self, phase: HookPhase, hook: impl Hook + 'static) {
        self.phase_mut(phase).push(Box::new(hook));
    }

    pub fn add_fn<F>(&mut self, phase: HookPhase, name: impl Into<String>, f: F)
    where
        F: Fn() -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.add(phase, FnHook::new(name, f));
    }

    pub fn len(&self, phase: HookPhase) -> usize {
        self.phase(phase).len()
    }

    pub fn is_empty(&self) -> bool {
        HookPhase::ALL.iter().all(|p| self.phase(*p).is_empty())
    }

    pub fn names(&self, phase: HookPhase) -> Vec<&str> {
        self.phase(phase).iter().map(|h| h.name()).collect()
    }

    /// Run every hook of `phase` in registration order, one at a time.
    /// Returns how many ran.
    pub async fn run(
        &self,
        phase: HookPhase,
        env: &dyn RemoteEnvironment,
    ) -> Result<usize, HookFailure> {
        let hooks = self.phase(phase);
        for hook in hooks {
            tracing::info!("Running {} hook: {}", phase, hook.name());
            hook.run(env).await.map_err(|source| HookFailure {
                hook: hook.name().to_string(),
                source,
            })?;
        }
        Ok(hooks.len())
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("pre_build", &self.names(HookPhase::PreBuild))
            .field("post_checkout", &self.names(HookPhase::PostCheckout))
            .field("post_build", &self.names(HookPhase::PostBuild))
            .finish()
    }
}
