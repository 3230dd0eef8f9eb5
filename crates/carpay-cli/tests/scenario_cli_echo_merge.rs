//! Scenario: `carpay echo-merge` applies the configured supersession window.
//!
//! GREEN when:
//! - a pending echo 20s before its server twin collapses under a 30s window,
//! - the same pair survives as two records under a 10s window,
//! - a negative window is refused as invalid config.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, body: &str) -> anyhow::Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, body)?;
    Ok(path)
}

fn records(dir: &TempDir) -> anyhow::Result<(PathBuf, PathBuf)> {
    let server = json!([
        { "id": "m1", "conversationId": "conv-1", "senderId": "u1", "text": "on my way",
          "createdAt": "2024-05-01T08:00:20Z", "origin": "confirmed" }
    ]);
    let client = json!([
        { "id": "local-1", "conversationId": "conv-1", "senderId": "u1", "text": "on my way",
          "createdAt": "2024-05-01T08:00:00Z", "origin": "pending" }
    ]);
    Ok((
        write(dir, "server.json", &server.to_string())?,
        write(dir, "client.json", &client.to_string())?,
    ))
}

fn echo_merge(dir: &TempDir, config: &PathBuf) -> anyhow::Result<Command> {
    let (server, client) = records(dir)?;
    let mut cmd = Command::cargo_bin("carpay")?;
    cmd.arg("echo-merge")
        .arg("--server")
        .arg(server)
        .arg("--client")
        .arg(client)
        .arg("--config")
        .arg(config);
    Ok(cmd)
}

fn merged_ids(stdout: &[u8]) -> anyhow::Result<Vec<String>> {
    let merged: Value = serde_json::from_slice(stdout)?;
    Ok(merged
        .as_array()
        .map(|a| a.iter().filter_map(|r| r["id"].as_str().map(String::from)).collect())
        .unwrap_or_default())
}

#[test]
fn default_window_drops_superseded_echo() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = write(&dir, "base.yaml", "echo:\n  window_secs: 30\n")?;

    let out = echo_merge(&dir, &config)?.output()?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(merged_ids(&out.stdout)?, vec!["m1"]);
    Ok(())
}

#[test]
fn narrow_window_keeps_pending_echo() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = write(&dir, "base.yaml", "echo:\n  window_secs: 10\n")?;

    let out = echo_merge(&dir, &config)?.output()?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(merged_ids(&out.stdout)?, vec!["local-1", "m1"]);
    Ok(())
}

#[test]
fn negative_window_is_invalid_config() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = write(&dir, "base.yaml", "echo:\n  window_secs: -1\n")?;

    echo_merge(&dir, &config)?
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_INVALID: echo.window_secs"));
    Ok(())
}
