use std::collections::BTreeSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-pointer prefixes the binaries actually read.
///
/// A leaf under any of these is consumed. Keep in sync with
/// `EngineSettings::from_config_json` and `resolve_secrets`.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/gateway/base_url",
    "/gateway/timeout_ms",
    "/gateway/keys_env/client_id",
    "/gateway/keys_env/api_key",
    "/api/base_url",
    "/api/timeout_ms",
    "/cache/list_ttl_ms",
    "/cache/entity_ttl_ms",
    "/echo/window_secs",
    "/reconcile/max_concurrency",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub consumed_prefixes: Vec<String>,
    /// Sorted, unique.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Leaf pointers of `config_json` no consumer reads.
///
/// With `UnusedKeyPolicy::Fail` a non-clean report is an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed_prefixes: Vec<String> = CONSUMED_POINTERS
        .iter()
        .map(|p| normalize_pointer(p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let unused: BTreeSet<String> = leaves
        .into_iter()
        .filter(|leaf| !consumed_prefixes.iter().any(|p| is_prefix_pointer(p, leaf)))
        .collect();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused.into_iter().collect(),
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s). First few: {:?}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers.iter().take(12).collect::<Vec<_>>()
        );
    }

    Ok(report)
}

fn normalize_pointer(p: &str) -> String {
    let trimmed = p.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// `/a/b` covers `/a/b` and `/a/b/c`, not `/a/bc`. `/` covers everything.
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

pub(crate) fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, child) in map {
                let escaped = k.replace('~', "~0").replace('/', "~1");
                collect_leaf_pointers(child, &format!("{prefix}/{escaped}"), out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_leaf_pointers(child, &format!("{prefix}/{i}"), out);
            }
        }
        _ if prefix.is_empty() => out.push("/".to_string()),
        _ => out.push(prefix.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_respects_segment_boundaries() {
        assert!(is_prefix_pointer("/cache", "/cache/list_ttl_ms"));
        assert!(is_prefix_pointer("/cache", "/cache"));
        assert!(!is_prefix_pointer("/cache", "/cache_extra/x"));
        assert!(is_prefix_pointer("/", "/anything"));
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_pointer("gateway/"), "/gateway");
        assert_eq!(normalize_pointer(""), "/");
    }

    #[test]
    fn leaf_pointers_escape_tokens() {
        let v = serde_json::json!({"a/b": {"c~d": 1}, "list": [true]});
        let mut out = Vec::new();
        collect_leaf_pointers(&v, "", &mut out);
        out.sort();
        assert_eq!(out, vec!["/a~1b/c~0d", "/list/0"]);
    }
}
