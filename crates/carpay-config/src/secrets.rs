//! Runtime secret resolution.
//!
//! Config names environment variables; this module reads them, once, at
//! startup. Values never appear in `Debug` output or error messages; errors
//! name the variable instead.

use std::fmt;

use anyhow::{bail, Result};
use serde_json::Value;

use crate::KeysEnv;

/// Gateway credentials looked up from the environment.
#[derive(Clone)]
pub struct ResolvedSecrets {
    names: KeysEnv,
    gateway_client_id: Option<String>,
    gateway_api_key: Option<String>,
}

/// Both gateway credentials, present.
#[derive(Clone)]
pub struct GatewayCredentials {
    pub client_id: String,
    pub api_key: String,
}

impl fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("names", &self.names)
            .field(
                "gateway_client_id",
                &self.gateway_client_id.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "gateway_api_key",
                &self.gateway_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

impl fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("client_id", &"<REDACTED>")
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl ResolvedSecrets {
    pub fn has_gateway_credentials(&self) -> bool {
        self.gateway_client_id.is_some() && self.gateway_api_key.is_some()
    }

    /// Gateway credentials, or an error naming the first missing variable.
    pub fn require_gateway(&self) -> Result<GatewayCredentials> {
        let Some(client_id) = self.gateway_client_id.clone() else {
            bail!(
                "SECRETS_MISSING: required env var '{}' (gateway client id) is not set or empty",
                self.names.client_id
            );
        };
        let Some(api_key) = self.gateway_api_key.clone() else {
            bail!(
                "SECRETS_MISSING: required env var '{}' (gateway api key) is not set or empty",
                self.names.api_key
            );
        };
        Ok(GatewayCredentials { client_id, api_key })
    }
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn resolve_env(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

/// Read the env vars named under `/gateway/keys_env`, falling back to the
/// default names. Missing variables are not an error here; callers that
/// need the gateway call [`ResolvedSecrets::require_gateway`].
pub fn resolve_secrets(config_json: &Value) -> ResolvedSecrets {
    let defaults = KeysEnv::default();
    let names = KeysEnv {
        client_id: read_str_at(config_json, "/gateway/keys_env/client_id")
            .unwrap_or(defaults.client_id),
        api_key: read_str_at(config_json, "/gateway/keys_env/api_key").unwrap_or(defaults.api_key),
    };

    ResolvedSecrets {
        gateway_client_id: resolve_env(&names.client_id),
        gateway_api_key: resolve_env(&names.api_key),
        names,
    }
}
