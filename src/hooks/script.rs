// ABOUTME: Local executable hook scripts discovered under .djangostack/hooks.
// ABOUTME: Run on the operator's machine with DJANGOSTACK_* variables describing the build.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{Hook, HookError, HookPhase};
use crate::remote::RemoteEnvironment;
use crate::types::ProjectName;

/// Context passed to hook scripts via environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub project: ProjectName,
    pub phase: HookPhase,
    pub web_server: Option<String>,
}

impl HookContext {
    /// Convert context to environment variables for a run against `host`.
    pub fn to_env(&self, host: &str) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("DJANGOSTACK_PROJECT".to_string(), self.project.to_string());
        env.insert("DJANGOSTACK_HOST".to_string(), host.to_string());
        env.insert(
            "DJANGOSTACK_PHASE".to_string(),
            self.phase.filename().to_string(),
        );
        if let Some(ref server) = self.web_server {
            env.insert("DJANGOSTACK_WEB_SERVER".to_string(), server.clone());
        }
        env
    }
}

/// An executable script on the operator's machine.
#[derive(Debug, Clone)]
pub struct LocalScriptHook {
    path: PathBuf,
    name: String,
    context: HookContext,
}

impl LocalScriptHook {
    pub fn new(path: impl Into<PathBuf>, context: HookContext) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self {
            path,
            name,
            context,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn phase(&self) -> HookPhase {
        self.context.phase
    }
}

#[async_trait]
impl Hook for LocalScriptHook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, env: &dyn RemoteEnvironment) -> Result<(), HookError> {
        let output = Command::new(&self.path)
            .envs(self.context.to_env(env.host()))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| HookError::Spawn {
                path: self.path.clone(),
                source,
            })?;

        if output.status.success() {
            tracing::info!("{} hook completed successfully", self.context.phase);
            Ok(())
        } else {
            tracing::warn!(
                "{} hook failed with exit code {:?}",
                self.context.phase,
                output.status.code()
            );
            Err(HookError::Script {
                path: self.path.clone(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }
}

/// Find the scripts under `<project_dir>/.djangostack/hooks`, one per phase.
pub fn discover_local_hooks(
    project_dir: &Path,
    project: &ProjectName,
    web_server: Option<String>,
) -> Vec<LocalScriptHook> {
    let hooks_dir = project_dir.join(".djangostack").join("hooks");

    HookPhase::ALL
        .iter()
        .filter_map(|&phase| {
            let path = hooks_dir.join(phase.filename());
            path.is_file().then(|| {
                LocalScriptHook::new(
                    path,
                    HookContext {
                        project: project.clone(),
                        phase,
                        web_server: web_server.clone(),
                    },
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_context_to_env() {
        let context = HookContext {
            project: ProjectName::new("samplesite").unwrap(),
            phase: HookPhase::PostBuild,
            web_server: Some("nginx".to_string()),
        };

        let env = context.to_env("web1.example.com");
        assert_eq!(
            env.get("DJANGOSTACK_PROJECT"),
            Some(&"samplesite".to_string())
        );
        assert_eq!(
            env.get("DJANGOSTACK_HOST"),
            Some(&"web1.example.com".to_string())
        );
        assert_eq!(env.get("DJANGOSTACK_PHASE"), Some(&"post-build".to_string()));
        assert_eq!(env.get("DJANGOSTACK_WEB_SERVER"), Some(&"nginx".to_string()));
    }

    #[test]
    fn hook_context_without_web_server() {
        let context = HookContext {
            project: ProjectName::new("samplesite").unwrap(),
            phase: HookPhase::PreBuild,
            web_server: None,
        };

        assert!(!context.to_env("localhost").contains_key("DJANGOSTACK_WEB_SERVER"));
    }

    #[test]
    fn discovery_on_missing_dir_finds_nothing() {
        let project = ProjectName::new("samplesite").unwrap();
        assert!(discover_local_hooks(Path::new("/nonexistent"), &project, None).is_empty());
    }
}
