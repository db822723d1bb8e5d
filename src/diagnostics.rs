// ABOUTME: Diagnostics accumulator for non-fatal warnings during a build.
// ABOUTME: Collects tolerated failures that shouldn't stop a build but should be shown to users.

use serde::Serialize;

/// Collects non-fatal warnings during build operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Stopping or purging the replaced web server failed.
    pub fn server_teardown(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ServerTeardown,
            message: message.into(),
        }
    }

    /// A PostgreSQL configuration file could not be located.
    pub fn config_file_not_found(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ConfigFileNotFound,
            message: message.into(),
        }
    }

    /// Pulling translations was skipped.
    pub fn translations_skipped(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::TranslationsSkipped,
            message: message.into(),
        }
    }

    /// Create an SSH disconnect warning.
    pub fn ssh_disconnect(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SshDisconnect,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The other web server's service or packages could not be removed.
    ServerTeardown,
    /// `pg_hba.conf` or `postgresql.conf` was not found on the target.
    ConfigFileNotFound,
    /// No translation service configuration under the locale path.
    TranslationsSkipped,
    /// Failed to cleanly disconnect SSH session.
    SshDisconnect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::config_file_not_found("pg_hba.conf not found"));
        diag.warn(Warning::ssh_disconnect("connection reset"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(
            Warning::server_teardown("test").kind,
            WarningKind::ServerTeardown
        );
        assert_eq!(
            Warning::translations_skipped("test").kind,
            WarningKind::TranslationsSkipped
        );
        assert_eq!(
            Warning::ssh_disconnect("test").kind,
            WarningKind::SshDisconnect
        );
    }
}
