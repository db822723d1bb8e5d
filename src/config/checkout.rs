// ABOUTME: Checkout entries and the permission directives applied after a build.
// ABOUTME: Relative paths in directives resolve against the checkout destination.

use serde::Deserialize;
use std::path::{Component, Path};

use super::ConfigError;

/// A repository cloned into a destination directory on the target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutEntry {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub permissions: PermissionDirectives,
}

impl CheckoutEntry {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            permissions: PermissionDirectives::default(),
        }
    }

    pub fn with_permissions(mut self, permissions: PermissionDirectives) -> Self {
        self.permissions = permissions;
        self
    }

    /// The destination must be absolute, must not climb with `..` and must
    /// name something below `/`. It is emptied on every build.
    pub fn has_safe_destination(&self) -> bool {
        let path = Path::new(&self.destination);
        if !path.is_absolute() {
            return false;
        }
        let mut named = false;
        for component in path.components() {
            match component {
                Component::Normal(_) => named = true,
                Component::ParentDir | Component::Prefix(_) => return false,
                Component::RootDir | Component::CurDir => {}
            }
        }
        named
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.has_safe_destination() {
            Ok(())
        } else {
            Err(ConfigError::InvalidCheckoutDestination(
                self.destination.clone(),
            ))
        }
    }

    /// Resolve a directive path against the destination.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else if path.is_empty() || path == "." {
            self.destination.trim_end_matches('/').to_string()
        } else {
            format!("{}/{}", self.destination.trim_end_matches('/'), path)
        }
    }
}

/// Ownership and mode fixes for one checkout.
///
/// `uids` get `chmod -R u+s`, `gids` get `chmod -R g+s`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PermissionDirectives {
    #[serde(default)]
    pub dir_attribs: Vec<DirAttrib>,
    #[serde(default)]
    pub uids: Vec<String>,
    #[serde(default)]
    pub gids: Vec<String>,
}

impl PermissionDirectives {
    pub fn is_empty(&self) -> bool {
        self.dir_attribs.is_empty() && self.uids.is_empty() && self.gids.is_empty()
    }
}

/// Mode/owner/group for one path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DirAttrib {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub recursive: bool,
}
