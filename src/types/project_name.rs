// ABOUTME: Validated project name used for site configuration files and log names.
// ABOUTME: Restricts names to lowercase ASCII alphanumerics, hyphens and underscores.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectNameError {
    #[error("project name cannot be empty")]
    Empty,

    #[error("project name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("project name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("project name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("project name must be lowercase")]
    NotLowercase,

    #[error("invalid character in project name: '{0}'")]
    InvalidChar(char),
}

/// Name of the deployed project.
///
/// Becomes part of remote file names (`/etc/apache2/sites-available/<name>`),
/// so it never contains path separators or shell metacharacters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn new(value: &str) -> Result<Self, ProjectNameError> {
        if value.is_empty() {
            return Err(ProjectNameError::Empty);
        }

        if value.len() > 63 {
            return Err(ProjectNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(ProjectNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(ProjectNameError::EndsWithHyphen);
        }

        if let Some(c) = value.chars().find(|c| !is_allowed(*c)) {
            return Err(if c.is_ascii_uppercase() {
                ProjectNameError::NotLowercase
            } else {
                ProjectNameError::InvalidChar(c)
            });
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_django_style_names() {
        assert_eq!(ProjectName::new("samplesite").unwrap().as_str(), "samplesite");
        assert!(ProjectName::new("my_site-2").is_ok());
    }

    #[test]
    fn rejects_uppercase() {
        assert_eq!(
            ProjectName::new("SampleSite").unwrap_err(),
            ProjectNameError::NotLowercase
        );
    }

    #[test]
    fn rejects_path_separators() {
        assert_eq!(
            ProjectName::new("../etc").unwrap_err(),
            ProjectNameError::InvalidChar('.')
        );
        assert_eq!(
            ProjectName::new("a/b").unwrap_err(),
            ProjectNameError::InvalidChar('/')
        );
    }

    #[test]
    fn rejects_edge_hyphens_and_length() {
        assert_eq!(
            ProjectName::new("-site").unwrap_err(),
            ProjectNameError::StartsWithHyphen
        );
        assert_eq!(
            ProjectName::new("site-").unwrap_err(),
            ProjectNameError::EndsWithHyphen
        );
        assert_eq!(
            ProjectName::new(&"a".repeat(64)).unwrap_err(),
            ProjectNameError::TooLong
        );
        assert_eq!(ProjectName::new("").unwrap_err(), ProjectNameError::Empty);
    }
}
