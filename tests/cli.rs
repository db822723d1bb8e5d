// ABOUTME: Integration tests for the djangostack CLI commands.
// ABOUTME: Validates --help output, init scaffolding and the offline check command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn djangostack_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("djangostack"))
}

const DATABASE_ONLY: &str = r#"
project: samplesite
servers:
  - deploy@web1.example.com
deploy_database: true
database_name: sampledb
database_user: sampleuser
database_password: s3cret
"#;

#[test]
fn help_shows_commands() {
    djangostack_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("djangostack.yml");

    djangostack_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--project", "blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(config_path.exists(), "djangostack.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.starts_with("project: blog\n"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("djangostack.yml");

    fs::write(&config_path, "existing: config").unwrap();

    djangostack_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn check_prints_the_stage_plan() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("djangostack.yml"), DATABASE_ONLY).unwrap();

    djangostack_cmd()
        .current_dir(temp_dir.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("setup_database_engine"))
        .stdout(predicate::str::contains("create_database"))
        .stdout(predicate::str::contains("configure_web_server").not())
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn check_json_emits_plan_record() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("djangostack.yml"), DATABASE_ONLY).unwrap();

    let output = djangostack_cmd()
        .current_dir(temp_dir.path())
        .args(["check", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let plan: serde_json::Value = stdout
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .find(|event| event["event"] == "plan")
        .expect("plan record");
    assert_eq!(plan["data"]["project"], "samplesite");
    assert_eq!(plan["data"]["servers"][0], "web1.example.com");
    assert_eq!(plan["data"]["stages"][0], "pre_build_guard");
}

#[test]
fn check_reports_invalid_options() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("djangostack.yml"),
        "project: samplesite\nservers: [web1]\ndeploy_database: true\n",
    )
    .unwrap();

    djangostack_cmd()
        .current_dir(temp_dir.path())
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("database_name must be set"));
}

#[test]
fn check_without_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    djangostack_cmd()
        .current_dir(temp_dir.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn build_rejects_unknown_server_before_connecting() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("djangostack.yml"), DATABASE_ONLY).unwrap();

    djangostack_cmd()
        .current_dir(temp_dir.path())
        .args(["build", "--yes", "--server", "db9.example.com"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no server matches db9.example.com"));
}
