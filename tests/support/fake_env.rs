// ABOUTME: In-memory RemoteEnvironment that records every operation in order.
// ABOUTME: Scripted exit codes, pre-existing paths and installed packages drive the scenarios.

use async_trait::async_trait;
use djangostack::build::{Confirm, PromptError};
use djangostack::remote::{
    CommandOutput, DatabaseSpec, RemoteCommand, RemoteEnvironment, RemoteError, RoleSpec,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// One recorded interaction with the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Exec(String),
    Write { path: String, privileged: bool },
    RefreshPackages,
    PackageQuery(String),
    EnsurePackage(String),
    EnsureRole(String),
    EnsureDatabase(String),
    Reload,
}

#[derive(Default)]
struct State {
    ops: Vec<Op>,
    files: HashMap<String, Vec<u8>>,
    paths: HashSet<String>,
    installed: HashSet<String>,
    failures: Vec<(String, u32)>,
    stdout: Vec<(String, String)>,
}

pub struct FakeEnvironment {
    host: String,
    sandbox: bool,
    state: Mutex<State>,
}

impl FakeEnvironment {
    pub fn new() -> Self {
        Self {
            host: "fake.example.com".to_string(),
            sandbox: false,
            state: Mutex::new(State::default()),
        }
    }

    pub fn sandbox(mut self) -> Self {
        self.sandbox = true;
        self
    }

    /// Mark a remote path as existing.
    pub fn with_path(self, path: &str) -> Self {
        self.state.lock().paths.insert(path.to_string());
        self
    }

    pub fn with_file(self, path: &str, contents: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.paths.insert(path.to_string());
            state.files.insert(path.to_string(), contents.as_bytes().to_vec());
        }
        self
    }

    pub fn with_package(self, name: &str) -> Self {
        self.state.lock().installed.insert(name.to_string());
        self
    }

    /// Commands whose rendering contains `pattern` exit with `code`.
    pub fn fail_on(self, pattern: &str, code: u32) -> Self {
        self.state.lock().failures.push((pattern.to_string(), code));
        self
    }

    /// Commands whose rendering contains `pattern` print `stdout`.
    pub fn stdout_on(self, pattern: &str, stdout: &str) -> Self {
        self.state
            .lock()
            .stdout
            .push((pattern.to_string(), stdout.to_string()));
        self
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Rendered commands only, in order.
    pub fn commands(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Exec(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    pub fn written(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .files
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.state.lock().installed.contains(name)
    }

    /// Index of the first op matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&Op) -> bool) -> Option<usize> {
        self.ops().iter().position(predicate)
    }

    /// Index of the first command containing `needle`.
    pub fn command_position(&self, needle: &str) -> Option<usize> {
        self.position(|op| matches!(op, Op::Exec(c) if c.contains(needle)))
    }
}

impl Default for FakeEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteEnvironment for FakeEnvironment {
    fn host(&self) -> &str {
        &self.host
    }

    async fn exec(&self, command: &RemoteCommand) -> Result<CommandOutput, RemoteError> {
        let rendered = command.render();
        let mut state = self.state.lock();
        state.ops.push(Op::Exec(rendered.clone()));

        let exit_code = state
            .failures
            .iter()
            .find(|(pattern, _)| rendered.contains(pattern.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);

        let stdout = state
            .files
            .iter()
            .find(|(path, _)| rendered == format!("cat {}", path))
            .map(|(_, bytes)| String::from_utf8_lossy(bytes).into_owned())
            .or_else(|| {
                state
                    .stdout
                    .iter()
                    .find(|(pattern, _)| rendered.contains(pattern.as_str()))
                    .map(|(_, out)| out.clone())
            })
            .unwrap_or_default();

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr: if exit_code == 0 {
                String::new()
            } else {
                "scripted failure".to_string()
            },
        })
    }

    async fn write_file(
        &self,
        contents: &[u8],
        remote_path: &str,
        privileged: bool,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.ops.push(Op::Write {
            path: remote_path.to_string(),
            privileged,
        });
        state.paths.insert(remote_path.to_string());
        state
            .files
            .insert(remote_path.to_string(), contents.to_vec());
        Ok(())
    }

    async fn path_exists(&self, remote_path: &str) -> Result<bool, RemoteError> {
        let mut state = self.state.lock();
        state
            .ops
            .push(Op::Exec(format!("test -e {}", remote_path)));
        Ok(state.paths.contains(remote_path))
    }

    fn is_sandbox(&self) -> bool {
        self.sandbox
    }

    async fn reload(&self) -> Result<(), RemoteError> {
        self.state.lock().ops.push(Op::Reload);
        Ok(())
    }

    async fn refresh_packages(&self) -> Result<(), RemoteError> {
        self.state.lock().ops.push(Op::RefreshPackages);
        Ok(())
    }

    async fn package_installed(&self, name: &str) -> Result<bool, RemoteError> {
        let mut state = self.state.lock();
        state.ops.push(Op::PackageQuery(name.to_string()));
        Ok(state.installed.contains(name))
    }

    async fn ensure_package(&self, name: &str) -> Result<bool, RemoteError> {
        let mut state = self.state.lock();
        state.ops.push(Op::EnsurePackage(name.to_string()));
        Ok(!state.installed.insert(name.to_string()))
    }

    async fn ensure_role(&self, role: &RoleSpec) -> Result<(), RemoteError> {
        self.state.lock().ops.push(Op::EnsureRole(role.name.clone()));
        Ok(())
    }

    async fn ensure_database(&self, database: &DatabaseSpec) -> Result<(), RemoteError> {
        self.state
            .lock()
            .ops
            .push(Op::EnsureDatabase(database.name.clone()));
        Ok(())
    }
}

/// Answers each prompt with a fixed reply and counts the prompts.
pub struct ScriptedConfirm {
    answer: bool,
    asked: AtomicUsize,
}

impl ScriptedConfirm {
    pub fn yes() -> Self {
        Self {
            answer: true,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn no() -> Self {
        Self {
            answer: false,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirm for ScriptedConfirm {
    async fn confirm(&self, _message: &str) -> Result<bool, PromptError> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer)
    }
}
