// ABOUTME: Integration tests for manifest parsing and configuration validation.
// ABOUTME: Tests YAML parsing, server shorthands, discovery and per-option validation rules.

use djangostack::config::*;
use djangostack::error::Error;
use djangostack::hooks::HookPhase;
use std::fs;
use std::path::Path;
use std::time::Duration;

fn database_options() -> Options {
    Options {
        deploy_database: true,
        database_name: Some("sampledb".to_string()),
        database_user: Some("sampleuser".to_string()),
        database_password: Some("s3cret".to_string()),
        ..Options::default()
    }
}

mod parsing {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let yaml = r#"
project: samplesite
servers:
  - deploy@web1.example.com:2200
  - vagrant
deploy_database: true
database_name: sampledb
database_user: sampleuser
database_password: s3cret
deploy_web_server: true
web_server: nginx
uwsgi_ini_path: /etc/uwsgi/samplesite.ini
uwsgi_params_path: /etc/nginx/uwsgi_params
database_dump_type: archive
packages: [memcached]
python_dependencies: [python-memcached]
checkouts:
  - source: ssh://hg@bitbucket.org/user/project
    destination: /var/www/projectroot
    permissions:
      dir_attribs: [{ path: media, mode: "775", owner: www-data, recursive: true }]
      gids: [media]
hooks:
  post_build:
    - sudo service memcached restart
"#;
        let manifest = Manifest::from_yaml(yaml).unwrap();
        assert_eq!(manifest.servers.len(), 2);
        assert_eq!(manifest.options.database_dump_type, DumpFormat::Archive);

        let config = manifest.into_config(Path::new("/srv/samplesite")).unwrap();
        assert_eq!(config.project().as_str(), "samplesite");
        assert_eq!(config.web_server(), Some(WebServer::Nginx));
        assert_eq!(
            config.uwsgi().map(|u| u.ini_path.as_str()),
            Some("/etc/uwsgi/samplesite.ini")
        );
        assert_eq!(config.packages(), &["vim", "gettext", "memcached"]);
        assert_eq!(config.python_dependencies().last().unwrap(), "python-memcached");
        assert_eq!(config.checkouts().len(), 1);
        assert_eq!(
            config.checkouts()[0].permissions.gids,
            vec!["media".to_string()]
        );
        assert_eq!(config.hooks().len(HookPhase::PostBuild), 1);
        assert_eq!(
            config.local_path("nginx_site"),
            Path::new("/srv/samplesite/nginx_site")
        );
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let yaml = "project: samplesite\nservers: [web1]\nfavourite_colour: green\n";
        assert!(Manifest::from_yaml(yaml).is_ok());
    }

    #[test]
    fn missing_servers_returns_error() {
        let yaml = "project: samplesite\n";
        assert!(Manifest::from_yaml(yaml).is_err());
    }

    #[test]
    fn wrongly_typed_option_returns_error() {
        let yaml = "project: samplesite\nservers: [web1]\ndeploy_django: maybe\n";
        assert!(Manifest::from_yaml(yaml).is_err());
    }
}

mod server_parsing {
    use super::*;

    #[test]
    fn parse_simple_host() {
        let server = ServerConfig::parse("web1.example.com").unwrap();
        assert_eq!(server.host, "web1.example.com");
        assert_eq!(server.port, 22);
        assert!(server.user.is_none());
        assert!(server.reload_command().is_none());
    }

    #[test]
    fn parse_with_user_and_port() {
        let server = ServerConfig::parse("deploy@web1.example.com:2200").unwrap();
        assert_eq!(server.user.as_deref(), Some("deploy"));
        assert_eq!(server.port, 2200);
    }

    #[test]
    fn vagrant_shorthand_is_a_sandbox() {
        let server = ServerConfig::parse("vagrant").unwrap();
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.port, 2222);
        assert_eq!(server.user.as_deref(), Some("vagrant"));
        assert_eq!(server.reload_command(), Some("vagrant reload"));
    }

    #[test]
    fn rejects_bad_addresses() {
        assert!(ServerConfig::parse("").is_err());
        assert!(ServerConfig::parse("@host").is_err());
        assert!(ServerConfig::parse("host:ssh").is_err());
    }

    #[test]
    fn parse_detailed_server() {
        let yaml = r#"
project: samplesite
servers:
  - host: box.local
    user: admin
    key_path: /home/me/.ssh/box
    trust_first_connection: false
    reload_command: "virsh reboot box"
    reload_settle: 45s
"#;
        let manifest = Manifest::from_yaml(yaml).unwrap();
        let server = manifest.servers.first();
        assert_eq!(server.host, "box.local");
        assert!(!server.trust_first_connection);
        assert_eq!(server.reload_command(), Some("virsh reboot box"));
        assert_eq!(server.reload_settle, Duration::from_secs(45));
    }

    #[test]
    fn identity_file_from_ssh_config() {
        let output = "Host default\n  HostName 127.0.0.1\n  User vagrant\n  IdentityFile /home/me/.vagrant/private_key\n  IdentitiesOnly yes\n";
        assert_eq!(
            parse_identity_file(output).as_deref(),
            Some(Path::new("/home/me/.vagrant/private_key"))
        );
    }
}

mod validation {
    use super::*;

    #[test]
    fn database_requires_name_user_and_password() {
        for missing in ["database_name", "database_user", "database_password"] {
            let mut options = database_options();
            match missing {
                "database_name" => options.database_name = None,
                "database_user" => options.database_user = Some("   ".to_string()),
                _ => options.database_password = Some(String::new()),
            }
            let err = Config::new("samplesite", options).unwrap_err();
            assert!(
                matches!(err, ConfigError::MissingDatabaseSetting(name) if name == missing),
                "expected {missing} to be reported, got {err}"
            );
        }
    }

    #[test]
    fn web_server_must_be_known_even_when_not_deployed() {
        let options = Options {
            web_server: Some("lighttpd".to_string()),
            ..Options::default()
        };
        assert!(matches!(
            Config::new("samplesite", options),
            Err(ConfigError::InvalidWebServer(_))
        ));
    }

    #[test]
    fn deploying_web_server_requires_one() {
        let options = Options {
            deploy_web_server: true,
            ..Options::default()
        };
        assert!(matches!(
            Config::new("samplesite", options),
            Err(ConfigError::MissingWebServer)
        ));
    }

    #[test]
    fn apache_needs_no_uwsgi_settings() {
        let options = Options {
            deploy_web_server: true,
            web_server: Some("apache2".to_string()),
            ..Options::default()
        };
        let config = Config::new("samplesite", options).unwrap();
        assert!(config.uwsgi().is_none());
        assert_eq!(config.site_config_name(), Some("apache_site"));
    }

    #[test]
    fn unknown_scm_is_rejected() {
        let options = Options {
            scm_type: "svn".to_string(),
            ..Options::default()
        };
        assert!(matches!(
            Config::new("samplesite", options),
            Err(ConfigError::InvalidScmType(_))
        ));
    }

    #[test]
    fn django_requires_project_path() {
        let options = Options {
            deploy_django: true,
            ..Options::default()
        };
        assert!(matches!(
            Config::new("samplesite", options),
            Err(ConfigError::MissingDjangoProjectPath)
        ));
    }

    #[test]
    fn transifex_requires_rc_and_locale() {
        let options = Options {
            deploy_django: true,
            django_project_path: Some("/var/www/site".to_string()),
            use_transifex: true,
            transifexrc_name: Some("transifexrc".to_string()),
            ..Options::default()
        };
        assert!(matches!(
            Config::new("samplesite", options),
            Err(ConfigError::MissingTransifexSetting("django_locale_path"))
        ));
    }

    #[test]
    fn transifex_is_ignored_without_django() {
        let options = Options {
            use_transifex: true,
            ..Options::default()
        };
        let config = Config::new("samplesite", options).unwrap();
        assert!(config.transifex().is_none());
    }

    #[test]
    fn invalid_project_name_is_rejected() {
        assert!(matches!(
            Config::new("", Options::default()),
            Err(ConfigError::InvalidProjectName(_))
        ));
    }

    #[test]
    fn checkout_destination_must_be_below_root() {
        let mut config = Config::new("samplesite", Options::default()).unwrap();
        for destination in ["", "/", "///", "var/www/site", "/var/www/../.."] {
            let err = config
                .add_checkout("ssh://hg@bitbucket.org/me/site", destination, Default::default())
                .unwrap_err();
            assert_eq!(
                err,
                ConfigError::InvalidCheckoutDestination(destination.to_string())
            );
        }
        assert!(config.checkouts().is_empty());

        config
            .add_checkout("ssh://hg@bitbucket.org/me/site", "/var/www/site/", Default::default())
            .unwrap();
        assert_eq!(config.checkouts().len(), 1);
    }

    #[test]
    fn manifest_checkout_to_root_is_rejected() {
        let yaml = r#"
project: samplesite
servers: [web1]
checkouts:
  - source: ssh://hg@bitbucket.org/me/site
    destination: /
"#;
        let manifest = Manifest::from_yaml(yaml).unwrap();
        assert_eq!(
            manifest.into_config(Path::new(".")).unwrap_err(),
            ConfigError::InvalidCheckoutDestination("/".to_string())
        );
    }
}

mod defaults {
    use super::*;

    #[test]
    fn driver_is_dropped_without_database() {
        let config = Config::new("samplesite", Options::default()).unwrap();
        assert_eq!(config.python_dependencies(), &["south", "Django"]);
    }

    #[test]
    fn database_keeps_driver_and_pins_django() {
        let options = Options {
            django_version: Some("1.4.5".to_string()),
            ..database_options()
        };
        let config = Config::new("samplesite", options).unwrap();
        assert_eq!(
            config.python_dependencies(),
            &["psycopg2", "south", "Django==1.4.5"]
        );
    }

    #[test]
    fn each_config_gets_its_own_defaults() {
        let mut first = Config::new("first", Options::default()).unwrap();
        first.add_package("memcached");
        first.add_python_dependency("south");

        let second = Config::new("second", Options::default()).unwrap();
        assert_eq!(second.packages(), &["vim", "gettext"]);
        assert_eq!(second.python_dependencies(), &["south", "Django"]);
        // Duplicates are kept.
        assert_eq!(first.python_dependencies(), &["south", "Django", "south"]);
    }
}

mod discovery {
    use super::*;

    const MINIMAL: &str = "project: samplesite\nservers: [web1.example.com]\n";

    #[test]
    fn finds_each_supported_location() {
        for relative in [
            CONFIG_FILENAME,
            CONFIG_FILENAME_ALT,
            CONFIG_FILENAME_DIR,
        ] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, MINIMAL).unwrap();

            let manifest = Manifest::discover(dir.path()).unwrap();
            assert_eq!(manifest.project, "samplesite", "via {relative}");
        }
    }

    #[test]
    fn missing_manifest_returns_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Manifest::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }

    #[test]
    fn select_one_server_by_host() {
        let yaml = "project: samplesite\nservers: [web1.example.com, deploy@web2.example.com]\n";
        let manifest = Manifest::from_yaml(yaml).unwrap();
        let selected = manifest.select_servers(Some("web2.example.com")).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].user.as_deref(), Some("deploy"));
    }
}

mod init {
    use super::*;

    #[test]
    fn generated_template_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_config(dir.path(), Some("mysite"), false).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.project, "mysite");
        manifest.into_config(dir.path()).unwrap();
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), Some("mysite"), false).unwrap();

        assert!(matches!(
            init_config(dir.path(), Some("mysite"), false),
            Err(Error::AlreadyExists(_))
        ));
        assert!(init_config(dir.path(), Some("othersite"), true).is_ok());
    }

    #[test]
    fn rejects_invalid_project_name() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            init_config(dir.path(), Some("not a name!"), false),
            Err(Error::InvalidConfig(_))
        ));
    }
}
