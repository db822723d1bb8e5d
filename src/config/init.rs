// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented djangostack.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::ProjectName;

use super::CONFIG_FILENAME;

const FALLBACK_PROJECT: &str = "mysite";

/// Write a template manifest into `dir` and return its path.
///
/// Without an explicit project name the directory name is used when it is a
/// valid project name.
pub fn init_config(dir: &Path, project: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let name = match project {
        Some(name) => name.to_string(),
        None => default_project_name(dir),
    };
    let project = ProjectName::new(&name).map_err(|e| Error::InvalidConfig(e.to_string()))?;

    std::fs::write(&config_path, generate_template_yaml(&project))?;
    Ok(config_path)
}

fn default_project_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .and_then(|d| d.file_name().map(|n| n.to_string_lossy().to_lowercase()))
        .filter(|name| ProjectName::new(name).is_ok())
        .unwrap_or_else(|| FALLBACK_PROJECT.to_string())
}

fn generate_template_yaml(project: &ProjectName) -> String {
    format!(
        r#"project: {project}
servers:
  - deploy@server.example.com
  # Local Vagrant box on 127.0.0.1:2222, reloaded with `vagrant reload`
  # - vagrant

deploy_scm: true
scm_type: mercurial
deploy_database: true
database_name: {project}
database_user: {project}
database_password: change-me
deploy_django: true
django_project_path: /var/www/{project}
# django_version: "1.4.3"
# requirements_path: /var/www/{project}/requirements.txt
deploy_web_server: true
web_server: apache
# site_config_name: apache_site

packages: []
python_dependencies: []

checkouts:
  - source: ssh://hg@bitbucket.org/you/{project}
    destination: /var/www/{project}
    # permissions:
    #   dir_attribs: [{{ path: media, mode: "775", owner: www-data, recursive: true }}]
    #   gids: [media]

# hooks:
#   post_build:
#     - sudo service memcached restart
"#
    )
}
