//! carpay-gateway
//!
//! PayOS-backed [`GatewayClient`]: read-only payment-request status lookup.
//!
//! Credentials are resolved by the caller (see `carpay-config`) and passed
//! in; they are sent as headers and never logged.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use carpay_ledger::{GatewayClient, GatewayError, GatewayStatus};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api-merchant.payos.vn";

/// Envelope code of a successful call.
const CODE_OK: &str = "00";

#[derive(Clone)]
pub struct PayOsGateway {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    api_key: String,
}

impl fmt::Debug for PayOsGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayOsGateway")
            .field("base_url", &self.base_url)
            .field("client_id", &"<REDACTED>")
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl PayOsGateway {
    pub fn new(client_id: String, api_key: String, timeout: Duration) -> Result<Self> {
        Self::new_with_base_url(client_id, api_key, DEFAULT_BASE_URL.to_string(), timeout)
    }

    pub fn new_with_base_url(
        client_id: String,
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("payos http client build failed")?;
        Ok(Self {
            http,
            base_url,
            client_id,
            api_key,
        })
    }

    fn status_url(&self, order_code: i64) -> String {
        format!(
            "{}/v2/payment-requests/{order_code}",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl GatewayClient for PayOsGateway {
    fn name(&self) -> &'static str {
        "payos"
    }

    async fn get_status(&self, order_code: i64) -> Result<GatewayStatus, GatewayError> {
        let resp = self
            .http
            .get(self.status_url(order_code))
            .header("x-client-id", &self.client_id)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let http_status = resp.status();
        if http_status.is_server_error() {
            return Err(GatewayError::Unreachable(format!(
                "payos http status={}",
                http_status.as_u16()
            )));
        }

        let body: PaymentRequestEnvelope = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("payos response: {e}")))?;

        if body.code != CODE_OK {
            return Err(GatewayError::Api {
                code: body.code,
                message: body.desc,
            });
        }

        let data = body
            .data
            .ok_or_else(|| GatewayError::Decode("payos response has no data".to_string()))?;

        if data.order_code != order_code {
            return Err(GatewayError::Decode(format!(
                "payos answered for order {} instead of {order_code}",
                data.order_code
            )));
        }

        let status = GatewayStatus::parse(&data.status);
        debug!(order_code, status = %status, "payos: status fetched");
        Ok(status)
    }
}

#[derive(Debug, Deserialize)]
struct PaymentRequestEnvelope {
    code: String,
    #[serde(default)]
    desc: String,
    data: Option<PaymentRequestData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequestData {
    order_code: i64,
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> PayOsGateway {
        PayOsGateway::new_with_base_url(
            "cid".to_string(),
            "key".to_string(),
            base.to_string(),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn status_url_tolerates_trailing_slash() {
        assert_eq!(
            gateway("http://gw/").status_url(42),
            "http://gw/v2/payment-requests/42"
        );
    }

    #[test]
    fn debug_redacts_credentials() {
        let dbg = format!("{:?}", gateway("http://gw"));
        assert!(!dbg.contains("cid"));
        assert!(!dbg.contains("\"key\""));
        assert!(dbg.contains("<REDACTED>"));
    }

    #[test]
    fn envelope_decodes_payos_shape() {
        let raw = r#"{"code":"00","desc":"success","data":{"id":"x","orderCode":42,"amount":1500000,"status":"PAID"},"signature":"s"}"#;
        let env: PaymentRequestEnvelope = serde_json::from_str(raw).unwrap();
        let data = env.data.unwrap();
        assert_eq!(data.order_code, 42);
        assert_eq!(data.status, "PAID");
    }
}
