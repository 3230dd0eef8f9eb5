use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://api-merchant.payos.vn";

/// Typed view of the merged config. Every section and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub gateway: GatewaySettings,
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub echo: EchoSettings,
    pub reconcile: ReconcileSettings,
}

impl EngineSettings {
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        if config_json.is_null() {
            return Ok(Self::default());
        }
        let settings: Self = serde_json::from_value(config_json.clone())
            .context("CONFIG_INVALID: settings do not match schema")?;
        if settings.echo.window_secs < 0 {
            bail!(
                "CONFIG_INVALID: echo.window_secs must be >= 0, got {}",
                settings.echo.window_secs
            );
        }
        Ok(settings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub base_url: String,
    pub timeout_ms: u64,
    pub keys_env: KeysEnv,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_BASE_URL.to_string(),
            timeout_ms: 10_000,
            keys_env: KeysEnv::default(),
        }
    }
}

/// Names of the environment variables holding gateway credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysEnv {
    pub client_id: String,
    pub api_key: String,
}

impl Default for KeysEnv {
    fn default() -> Self {
        Self {
            client_id: "PAYOS_CLIENT_ID".to_string(),
            api_key: "PAYOS_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Booking/payment REST system. Unset means no backend is wired.
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub list_ttl_ms: u64,
    pub entity_ttl_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            list_ttl_ms: 30_000,
            entity_ttl_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoSettings {
    /// Supersession window of the echo merge, inclusive. Zero means the
    /// timestamps must match exactly.
    pub window_secs: i64,
}

impl Default for EchoSettings {
    fn default() -> Self {
        Self { window_secs: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    /// Bookings reconciled at once by batch callers.
    pub max_concurrency: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_config_yields_defaults() {
        let s = EngineSettings::from_config_json(&json!({})).unwrap();
        assert_eq!(s.gateway.base_url, DEFAULT_GATEWAY_BASE_URL);
        assert_eq!(s.gateway.timeout_ms, 10_000);
        assert_eq!(s.cache.list_ttl_ms, 30_000);
        assert_eq!(s.cache.entity_ttl_ms, 300_000);
        assert_eq!(s.echo.window_secs, 30);
        assert_eq!(s.reconcile.max_concurrency, 8);
        assert!(s.api.base_url.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let s = EngineSettings::from_config_json(&json!({
            "gateway": { "timeout_ms": 2500 },
            "api": { "base_url": "http://localhost:8080" },
            "unrelated": { "x": 1 }
        }))
        .unwrap();
        assert_eq!(s.gateway.timeout_ms, 2500);
        assert_eq!(s.gateway.keys_env, KeysEnv::default());
        assert_eq!(s.api.base_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = EngineSettings::from_config_json(&json!({
            "cache": { "list_ttl_ms": "soon" }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("CONFIG_INVALID"));
    }

    #[test]
    fn negative_echo_window_is_rejected() {
        let err = EngineSettings::from_config_json(&json!({
            "echo": { "window_secs": -5 }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("CONFIG_INVALID: echo.window_secs"));

        let s = EngineSettings::from_config_json(&json!({
            "echo": { "window_secs": 0 }
        }))
        .unwrap();
        assert_eq!(s.echo.window_secs, 0);
    }
}
