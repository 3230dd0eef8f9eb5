//! Scenario: gateway credentials come from the named env vars.
//!
//! Each test uses its own variable names; the process environment is shared
//! by every test in this binary.

use carpay_config::{load_layered_yaml_from_strings, resolve_secrets};

fn config(client_var: &str, key_var: &str) -> serde_json::Value {
    let yaml = format!("gateway:\n  keys_env:\n    client_id: {client_var}\n    api_key: {key_var}\n");
    load_layered_yaml_from_strings(&[yaml.as_str()])
        .unwrap()
        .config_json
}

#[test]
fn present_vars_resolve_and_debug_redacts() {
    std::env::set_var("CARPAY_T1_CLIENT", "client-123");
    std::env::set_var("CARPAY_T1_KEY", "key-secret-456");

    let secrets = resolve_secrets(&config("CARPAY_T1_CLIENT", "CARPAY_T1_KEY"));
    assert!(secrets.has_gateway_credentials());

    let creds = secrets.require_gateway().unwrap();
    assert_eq!(creds.client_id, "client-123");
    assert_eq!(creds.api_key, "key-secret-456");

    let dbg = format!("{secrets:?} {creds:?}");
    assert!(!dbg.contains("client-123"));
    assert!(!dbg.contains("key-secret-456"));
    assert!(dbg.contains("<REDACTED>"));
}

#[test]
fn missing_var_is_named_in_error() {
    std::env::set_var("CARPAY_T2_CLIENT", "client-123");
    std::env::remove_var("CARPAY_T2_KEY");

    let secrets = resolve_secrets(&config("CARPAY_T2_CLIENT", "CARPAY_T2_KEY"));
    assert!(!secrets.has_gateway_credentials());

    let msg = secrets.require_gateway().unwrap_err().to_string();
    assert!(msg.contains("SECRETS_MISSING"));
    assert!(msg.contains("CARPAY_T2_KEY"));
}

#[test]
fn blank_var_counts_as_missing() {
    std::env::set_var("CARPAY_T3_CLIENT", "   ");
    std::env::set_var("CARPAY_T3_KEY", "k");

    let secrets = resolve_secrets(&config("CARPAY_T3_CLIENT", "CARPAY_T3_KEY"));
    let msg = secrets.require_gateway().unwrap_err().to_string();
    assert!(msg.contains("CARPAY_T3_CLIENT"));
}
