//! Scenario: `carpay config-hash` prints a stable hash of the merged layers.
//!
//! GREEN when:
//! - later layers override earlier ones in the printed canonical JSON,
//! - the same inputs always hash the same,
//! - a literal secret in YAML aborts the command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, body: &str) -> anyhow::Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, body)?;
    Ok(path)
}

fn config_hash_line(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .lines()
        .find(|l| l.starts_with("config_hash="))
        .unwrap_or_default()
        .to_string()
}

#[test]
fn layers_merge_and_hash_is_stable() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let base = write(
        &dir,
        "base.yaml",
        "gateway:\n  timeout_ms: 10000\ncache:\n  list_ttl_ms: 30000\n",
    )?;
    let site = write(&dir, "site.yaml", "gateway:\n  timeout_ms: 2500\n")?;

    let run = || -> anyhow::Result<Vec<u8>> {
        let out = Command::cargo_bin("carpay")?
            .arg("config-hash")
            .arg(&base)
            .arg(&site)
            .output()?;
        assert!(out.status.success());
        Ok(out.stdout)
    };

    let first = run()?;
    let second = run()?;

    let text = String::from_utf8_lossy(&first);
    assert!(text.contains("\"timeout_ms\":2500"));
    assert!(text.contains("\"list_ttl_ms\":30000"));
    assert_eq!(config_hash_line(&first), config_hash_line(&second));
    assert_eq!(config_hash_line(&first).len(), "config_hash=".len() + 64);
    Ok(())
}

#[test]
fn literal_secret_is_rejected() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let bad = write(
        &dir,
        "bad.yaml",
        "gateway:\n  keys_env:\n    api_key: \"sk_live_abcdef\"\n",
    )?;

    Command::cargo_bin("carpay")?
        .arg("config-hash")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"));
    Ok(())
}

#[test]
fn strict_check_fails_on_unused_keys() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let cfg = write(
        &dir,
        "cfg.yaml",
        "api:\n  base_url: \"http://127.0.0.1:9\"\n  retries: 3\n",
    )?;

    Command::cargo_bin("carpay")?
        .args(["check-config", "--config"])
        .arg(&cfg)
        .assert()
        .success()
        .stdout(predicate::str::contains("unused_keys=1"))
        .stderr(predicate::str::contains("unused_key=/api/retries"));

    Command::cargo_bin("carpay")?
        .args(["check-config", "--strict", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"));
    Ok(())
}
