//! carpay-config
//!
//! Layered YAML configuration:
//! - documents are deep-merged in order (later layers override),
//! - the merged tree is serialised to canonical JSON and hashed (SHA-256),
//! - literal secrets are rejected; YAML only ever names environment variables,
//! - `report_unused_keys` flags keys nothing reads,
//! - `EngineSettings` is the typed view the binaries consume.

use std::fs;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

mod secrets;
mod settings;
mod unused;

pub use secrets::{resolve_secrets, GatewayCredentials, ResolvedSecrets};
pub use settings::{
    ApiSettings, CacheSettings, EchoSettings, EngineSettings, GatewaySettings, KeysEnv,
    ReconcileSettings,
};
pub use unused::{report_unused_keys, UnusedKeyPolicy, UnusedKeyReport, CONSUMED_POINTERS};

/// Value prefixes of well-known credential formats.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "glpat-",
    "xoxb-",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Hex SHA-256 of `canonical_json`.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}")))
        .collect::<Result<Vec<String>>>()?;

    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let layer: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        let layer = serde_json::to_value(layer).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, layer);
    }

    enforce_no_secret_literals(&merged)?;

    // serde_json's map is ordered by key, so serialising is canonical.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));

    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (k, v) in overlay {
                let prev = base.remove(&k).unwrap_or(Value::Null);
                base.insert(k, deep_merge(prev, v));
            }
            Value::Object(base)
        }
        // Null layers (an empty YAML document) leave the base untouched.
        (base, Value::Null) => base,
        (_, other) => other,
    }
}

fn enforce_no_secret_literals(root: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    unused::collect_leaf_pointers(root, "", &mut leaves);

    for ptr in leaves {
        let Some(s) = root.pointer(&ptr).and_then(Value::as_str) else {
            continue;
        };
        let under_keys_env = ptr.split('/').any(|seg| seg == "keys_env");
        if looks_like_secret(s) || (under_keys_env && !is_env_var_name(s)) {
            bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

/// `UPPER_SNAKE_CASE`, not starting with a digit.
fn is_env_var_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase() || c == '_')
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
