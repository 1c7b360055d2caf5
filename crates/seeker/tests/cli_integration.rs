use std::process::Command;

fn seeker() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_seeker"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_seeker_version() {
    let output = seeker().arg("--version").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0.1.0"));
}

#[test]
fn test_seeker_help() {
    let output = seeker().arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["init", "index", "search", "stats", "serve"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_seeker_init_writes_config_once() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("conf").join("seeker.toml");

    let output = seeker().arg("init").arg(&path).output().unwrap();
    assert!(output.status.success());
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("[index]"));
    assert!(content.contains("similarity_threshold"));

    let output = seeker().arg("init").arg(&path).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_seeker_stats_on_empty_index() {
    let dir = tempfile::TempDir::new().unwrap();

    let output = seeker()
        .arg("stats")
        .env("INDEX_DIR", dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(stats["last_indexed"].is_null());
    assert_eq!(stats["total_files"], 0);
    assert_eq!(stats["index_version"], "1.0.0");
}

#[test]
fn test_seeker_search_rejects_bad_filters() {
    let dir = tempfile::TempDir::new().unwrap();

    let output = seeker()
        .args(["search", "taxes", "--filters", "[1, 2]"])
        .env("INDEX_DIR", dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--filters"));
}
