//! Integration tests for the appctl CLI

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const BATCH: &str = r#"
[[package]]
path = "a.app"
id = "aaa"
name = "A"
publisher = "Contoso"
version = "2.0"

[[package]]
path = "b.app"
id = "bbb"
name = "B"
publisher = "Contoso"
version = "1.5"
dependencies = ["ccc"]

[[package]]
path = "c.app"
id = "ccc"
name = "C"
publisher = "Contoso"
version = "1.0"

[[installed]]
AppId = "bbb"
Name = "B"
Publisher = "Contoso"
Version = "1.0"

[[installed]]
AppId = "ccc"
Name = "C"
Publisher = "Contoso"
Version = "1.0"
"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write fixture");
    path
}

fn appctl(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_appctl"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("APPCTL_TARGET")
        .env_remove("APPCTL_OUTPUT")
        .env_remove("APPCTL_ON_FAILURE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute appctl")
}

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_appctl"))
        .arg("--version")
        .output()
        .expect("Failed to execute appctl");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("appctl"));
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_appctl"))
        .arg("--help")
        .output()
        .expect("Failed to execute appctl");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("plan"));
    assert!(stdout.contains("install"));
}

#[test]
fn test_cli_invalid_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_appctl"))
        .arg("invalid-command")
        .output()
        .expect("Failed to execute appctl");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_plan_json_follows_declared_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "config.toml", "");
    let batch = write(dir.path(), "batch.toml", BATCH);

    let output = appctl(
        &config,
        &["--json", "--target", "bc", "plan", "--batch", batch.to_str().unwrap()],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["command"], "plan");
    assert_eq!(json["target"], "bc");

    let rows: Vec<(String, String)> = json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| {
            (
                entry["package"]["name"].as_str().unwrap().to_string(),
                entry["action"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            ("A".to_string(), "new_install".to_string()),
            ("C".to_string(), "skip".to_string()),
            ("B".to_string(), "upgrade".to_string()),
        ]
    );
}

#[test]
fn test_plan_without_target_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "config.toml", "");
    let batch = write(dir.path(), "batch.toml", BATCH);

    let output = appctl(&config, &["plan", "--batch", batch.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("target"));
}

#[test]
fn test_plan_rejects_malformed_version() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "config.toml", "");
    let batch = write(
        dir.path(),
        "batch.toml",
        "target = \"bc\"\n[[package]]\npath = \"a.app\"\nid = \"a\"\nname = \"A\"\npublisher = \"P\"\nversion = \"one\"\n[[installed]]\nAppId = \"x\"\nName = \"X\"\nPublisher = \"P\"\nVersion = \"1.0\"\n",
    );

    let output = appctl(&config, &["plan", "--batch", batch.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("version"));
}

#[cfg(unix)]
#[test]
fn test_install_runs_publish_commands() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let config = write(
        dir.path(),
        "config.toml",
        &format!(
            r#"
[commands]
publish = ["sh", "-c", "echo publish $0 $1 >> {log}", "{{name}}", "{{upgrade}}"]
unpublish = ["sh", "-c", "echo unpublish $0 $1 >> {log}", "{{name}}", "{{version}}"]
"#,
            log = log.display()
        ),
    );
    let batch = write(dir.path(), "batch.toml", BATCH);

    let output = appctl(
        &config,
        &[
            "--json",
            "--target",
            "bc",
            "install",
            "--yes",
            "--batch",
            batch.to_str().unwrap(),
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let summary = &json["summary"];
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["succeeded"], 2);
    assert_eq!(summary["skipped"], 1);
    assert_eq!(summary["failed"], 0);
    assert_eq!(summary["superseded_removed"], 1);

    let calls = std::fs::read_to_string(&log).unwrap();
    assert_eq!(
        calls.lines().collect::<Vec<_>>(),
        vec!["publish A false", "publish B true", "unpublish B 1.0"]
    );
}

#[cfg(unix)]
#[test]
fn test_install_refuses_downgrade() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "config.toml", "[commands]\npublish = [\"true\"]\n");
    let batch = write(
        dir.path(),
        "batch.toml",
        "target = \"bc\"\n[[package]]\npath = \"a.app\"\nid = \"a\"\nname = \"A\"\npublisher = \"P\"\nversion = \"1.0\"\n[[installed]]\nAppId = \"a\"\nName = \"A\"\nPublisher = \"P\"\nVersion = \"2.0\"\n",
    );

    let output = appctl(&config, &["install", "--yes", "--batch", batch.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--allow-downgrade"));
}

#[cfg(unix)]
#[test]
fn test_install_reports_failures_with_nonzero_exit() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(
        dir.path(),
        "config.toml",
        "[commands]\npublish = [\"sh\", \"-c\", \"exit 2\"]\n",
    );
    let batch = write(dir.path(), "batch.toml", BATCH);

    let output = appctl(
        &config,
        &[
            "--json",
            "--target",
            "bc",
            "install",
            "--yes",
            "--abort-on-failure",
            "--batch",
            batch.to_str().unwrap(),
        ],
    );
    assert!(!output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let summary = &json["summary"];
    assert_eq!(summary["aborted"], true);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["not_attempted"], 2);
}
