//! CLI integration tests for the Matrix command-line interface.
//!
//! Every test isolates the binary from the real user environment: config and
//! data directories point into a temp dir and the metadata service URL is
//! unreachable, so provider metadata comes from the bundled dataset.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the matrix binary, sandboxed under `home`.
fn matrix(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("matrix").unwrap();
    cmd.env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("MATRIX_CONFIG_DIR", home.join("config"))
        .env("CATWALK_URL", "http://127.0.0.1:9")
        .env_remove("MATRIX_CONFIG")
        .current_dir(home);
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let home = TempDir::new().unwrap();
    matrix(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Matrix"));
}

#[test]
fn test_version_displays() {
    let home = TempDir::new().unwrap();
    matrix(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("matrix"));
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    matrix(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("providers"))
        .stdout(predicate::str::contains("auth"));
}

#[test]
fn test_unknown_subcommand_rejected() {
    let home = TempDir::new().unwrap();
    matrix(home.path()).arg("serve").assert().failure();
}

#[test]
fn test_setup_requires_provider_and_key() {
    let home = TempDir::new().unwrap();
    matrix(home.path())
        .args(["auth", "setup", "--provider", "openai"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--api-key"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_picks_default_models() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("custom.json");
    std::fs::write(
        &file,
        r#"{"providers": {"openai": {"api_key": "sk-test-1234567890"}}}"#,
    )
    .unwrap();

    matrix(home.path())
        .args(["--config", file.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("openai"))
        .stdout(predicate::str::contains("sk-t...7890"))
        .stdout(predicate::str::contains("sk-test-1234567890").not());
}

#[test]
fn test_config_show_json() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("custom.json");
    std::fs::write(
        &file,
        r#"{"providers": {"openai": {"api_key": "sk-test-1234567890"}}}"#,
    )
    .unwrap();

    let output = matrix(home.path())
        .args(["--json", "--config", file.to_str().unwrap(), "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["models"]["large"]["provider"], "openai");
    assert_eq!(value["providers"]["openai"]["auth"], "api key");
}

#[test]
fn test_config_show_without_providers_fails() {
    let home = TempDir::new().unwrap();
    matrix(home.path())
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no providers configured"));
}

#[test]
fn test_config_path_explicit() {
    let home = TempDir::new().unwrap();
    matrix(home.path())
        .args(["--config", "/tmp/elsewhere.json", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/elsewhere.json (explicit)"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_auth_setup_writes_config() {
    let home = TempDir::new().unwrap();
    matrix(home.path())
        .args([
            "auth",
            "setup",
            "--provider",
            "openai",
            "--api-key",
            "$OPENAI_API_KEY",
            "--large",
            "gpt-big",
            "--small",
            "gpt-mini",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configured openai"));

    let saved = home.path().join("config").join("matrix.json");
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(saved).unwrap()).unwrap();
    assert_eq!(value["providers"]["openai"]["api_key"], "$OPENAI_API_KEY");
    assert_eq!(value["models"]["large"]["model"], "gpt-big");
    assert_eq!(value["models"]["small"]["model"], "gpt-mini");
}

#[test]
fn test_auth_status_before_setup() {
    let home = TempDir::new().unwrap();
    matrix(home.path())
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not set up"));
}

#[test]
fn test_auth_status_with_explicit_file_ignores_project_config() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("matrix.json"),
        r#"{"providers": {"openai": {"api_key": "sk-project-abcdefgh"}}}"#,
    )
    .unwrap();
    let file = home.path().join("empty.json");
    std::fs::write(&file, "{}").unwrap();

    matrix(home.path())
        .args(["--config", file.to_str().unwrap(), "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not set up"));
}

#[test]
fn test_auth_status_after_setup() {
    let home = TempDir::new().unwrap();
    matrix(home.path())
        .args(["auth", "setup", "--provider", "openai", "--api-key", "sk-live-abcdefgh1234"])
        .assert()
        .success();

    matrix(home.path())
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("openai"))
        .stdout(predicate::str::contains("api key"))
        .stdout(predicate::str::contains("Ready."));
}

// ─────────────────────────────────────────────────────────────────────────────
// Providers Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_providers_update_from_embedded() {
    let home = TempDir::new().unwrap();
    matrix(home.path())
        .args(["providers", "update", "embedded"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated"));

    assert!(home.path().join("data").join("matrix").join("providers.json").is_file());
}

#[test]
fn test_providers_list_falls_back_to_bundled() {
    let home = TempDir::new().unwrap();
    matrix(home.path())
        .args(["providers", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("anthropic"))
        .stdout(predicate::str::contains("openai"));
}

#[test]
fn test_providers_update_uses_configured_data_directory() {
    let home = TempDir::new().unwrap();
    let data_dir = home.path().join("custom-data");
    let config_dir = home.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("matrix.json"),
        serde_json::json!({
            "providers": {"openai": {"api_key": "sk-test-1234567890"}},
            "options": {"data_directory": data_dir},
        })
        .to_string(),
    )
    .unwrap();

    let source = home.path().join("catalog.json");
    std::fs::write(
        &source,
        r#"[{
            "id": "openai",
            "type": "openai",
            "api_endpoint": "https://api.openai.com/v1",
            "default_large_model_id": "gpt-house",
            "default_small_model_id": "gpt-house-mini",
            "models": [{"id": "gpt-house", "context_window": 1000}]
        }]"#,
    )
    .unwrap();

    matrix(home.path())
        .args(["providers", "update", source.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom-data"));
    assert!(data_dir.join("providers.json").is_file());
    assert!(!home.path().join("data").join("matrix").join("providers.json").exists());

    let output = matrix(home.path())
        .args(["--json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["known_providers"], 1);
    assert_eq!(value["models"]["large"]["model"], "gpt-house");

    assert!(data_dir.join("logs").is_dir());
}
