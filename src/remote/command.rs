// ABOUTME: Structured builder for remote shell commands.
// ABOUTME: Quotes every argument so stage code never interpolates raw strings into a shell.

use std::fmt;

/// Who a remote command runs as.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Privilege {
    /// The SSH login user.
    #[default]
    Login,
    /// root, via sudo.
    Root,
    /// Another account, via `sudo -u <user> -H`.
    User(String),
}

/// A remote command: program, arguments, and the few shell features stages
/// need (working directory, redirections, a single upstream pipe, env vars).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    cwd: Option<String>,
    stdin_from: Option<String>,
    stdout_to: Option<String>,
    upstream: Option<Box<RemoteCommand>>,
    privilege: Privilege,
    script: bool,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            stdin_from: None,
            stdout_to: None,
            upstream: None,
            privilege: Privilege::Login,
            script: false,
        }
    }

    /// An operator-supplied shell snippet, passed to the shell verbatim.
    /// Only used for hook commands declared in the manifest.
    pub fn shell(script: impl Into<String>) -> Self {
        Self {
            script: true,
            ..Self::new(script)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cwd(mut self, dir: impl Into<String>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin_from(mut self, path: impl Into<String>) -> Self {
        self.stdin_from = Some(path.into());
        self
    }

    pub fn stdout_to(mut self, path: impl Into<String>) -> Self {
        self.stdout_to = Some(path.into());
        self
    }

    /// Feed the output of `upstream` into this command.
    /// The whole pipeline runs with this command's privilege.
    pub fn pipe_from(mut self, upstream: RemoteCommand) -> Self {
        self.upstream = Some(Box::new(upstream));
        self
    }

    pub fn sudo(mut self) -> Self {
        self.privilege = Privilege::Root;
        self
    }

    pub fn as_user(mut self, user: impl Into<String>) -> Self {
        self.privilege = Privilege::User(user.into());
        self
    }

    pub fn privilege(&self) -> &Privilege {
        &self.privilege
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Render to a single line for `sh -c` on the remote side.
    pub fn render(&self) -> String {
        let mut body = self.render_pipeline();
        if let Some(cwd) = &self.cwd {
            body = format!("cd {} && {}", quote(cwd), body);
        }

        match &self.privilege {
            Privilege::Login => body,
            Privilege::Root if self.needs_shell() => format!("sudo sh -c {}", quote(&body)),
            Privilege::Root => format!("sudo {}", body),
            Privilege::User(user) if self.needs_shell() => {
                format!("sudo -u {} -H sh -c {}", quote(user), quote(&body))
            }
            Privilege::User(user) => format!("sudo -u {} -H {}", quote(user), body),
        }
    }

    fn render_pipeline(&self) -> String {
        let mut line = String::new();

        if let Some(upstream) = &self.upstream {
            line.push_str(&upstream.render_pipeline());
            line.push_str(" | ");
        }

        for (key, value) in &self.env {
            line.push_str(key);
            line.push('=');
            line.push_str(&quote(value));
            line.push(' ');
        }

        if self.script {
            line.push_str(&self.program);
        } else {
            line.push_str(&quote(&self.program));
            for arg in &self.args {
                line.push(' ');
                line.push_str(&quote(arg));
            }
        }

        if let Some(path) = &self.stdin_from {
            line.push_str(" < ");
            line.push_str(&quote(path));
        }
        if let Some(path) = &self.stdout_to {
            line.push_str(" > ");
            line.push_str(&quote(path));
        }

        line
    }

    fn needs_shell(&self) -> bool {
        self.script
            || self.cwd.is_some()
            || self.upstream.is_some()
            || self.stdin_from.is_some()
            || self.stdout_to.is_some()
            || !self.env.is_empty()
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// POSIX shell quoting.
///
/// Words made only of safe characters are left bare. A leading `~/` stays
/// unquoted so the remote shell still expands it to the login user's home.
pub fn quote(word: &str) -> String {
    if let Some(rest) = word.strip_prefix("~/") {
        return if rest.is_empty() {
            "~/".to_string()
        } else {
            format!("~/{}", quote(rest))
        };
    }

    if !word.is_empty() && word.chars().all(is_safe) {
        return word.to_string();
    }

    format!("'{}'", word.replace('\'', "'\\''"))
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':' | '@' | ',' | '+' | '%')
}
