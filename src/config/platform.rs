// ABOUTME: Source-control and web-server choices with their Debian packages and paths.
// ABOUTME: Parsed from the raw option strings during Config validation.

use std::fmt;

use super::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScmType {
    Mercurial,
    Git,
}

impl ScmType {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mercurial" | "hg" => Ok(ScmType::Mercurial),
            "git" => Ok(ScmType::Git),
            _ => Err(ConfigError::InvalidScmType(value.to_string())),
        }
    }

    pub fn package(&self) -> &'static str {
        match self {
            ScmType::Mercurial => "mercurial",
            ScmType::Git => "git",
        }
    }

    /// Client binary; both accept `clone <source> <dest>`.
    pub fn client(&self) -> &'static str {
        match self {
            ScmType::Mercurial => "hg",
            ScmType::Git => "git",
        }
    }
}

impl fmt::Display for ScmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.package())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebServer {
    /// Apache with mod_wsgi.
    Apache,
    /// nginx in front of uWSGI.
    Nginx,
}

impl WebServer {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "apache" | "apache2" => Ok(WebServer::Apache),
            "nginx" => Ok(WebServer::Nginx),
            _ => Err(ConfigError::InvalidWebServer(value.to_string())),
        }
    }

    /// The server being replaced when switching to this one.
    pub fn other(&self) -> WebServer {
        match self {
            WebServer::Apache => WebServer::Nginx,
            WebServer::Nginx => WebServer::Apache,
        }
    }

    /// Packages installed for this server. The first one decides whether
    /// the server counts as already installed.
    pub fn packages(&self) -> &'static [&'static str] {
        match self {
            WebServer::Apache => &["apache2", "libapache2-mod-wsgi"],
            WebServer::Nginx => &["nginx", "uwsgi", "uwsgi-plugin-python"],
        }
    }

    pub fn primary_package(&self) -> &'static str {
        self.packages()[0]
    }

    pub fn service(&self) -> &'static str {
        match self {
            WebServer::Apache => "apache2",
            WebServer::Nginx => "nginx",
        }
    }

    pub fn sites_available(&self) -> &'static str {
        match self {
            WebServer::Apache => "/etc/apache2/sites-available",
            WebServer::Nginx => "/etc/nginx/sites-available",
        }
    }

    pub fn sites_enabled(&self) -> &'static str {
        match self {
            WebServer::Apache => "/etc/apache2/sites-enabled",
            WebServer::Nginx => "/etc/nginx/sites-enabled",
        }
    }

    /// Site shipped enabled by the distribution package.
    pub fn default_site(&self) -> &'static str {
        match self {
            WebServer::Apache => "000-default",
            WebServer::Nginx => "default",
        }
    }

    /// Local site configuration file used when `site_config_name` is unset.
    pub fn default_site_config_name(&self) -> &'static str {
        match self {
            WebServer::Apache => "apache_site",
            WebServer::Nginx => "nginx_site",
        }
    }
}

impl fmt::Display for WebServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebServer::Apache => f.write_str("apache"),
            WebServer::Nginx => f.write_str("nginx"),
        }
    }
}
