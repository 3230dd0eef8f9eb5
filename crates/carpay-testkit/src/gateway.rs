use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use carpay_ledger::{GatewayClient, GatewayError, GatewayStatus};

/// Scripted answer for one order code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Script {
    Status(GatewayStatus),
    Unreachable,
}

#[derive(Default)]
struct GatewayState {
    scripts: BTreeMap<i64, Script>,
    queries: Vec<i64>,
}

/// Gateway fake answering from a per-order-code script.
///
/// Unscripted order codes report `PENDING`. Every query is recorded, so
/// tests can assert which lines were (or were not) looked up.
#[derive(Default)]
pub struct ScriptedGateway {
    inner: Mutex<GatewayState>,
    latency: Option<Duration>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer, to widen interleavings in concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn state(&self) -> MutexGuard<'_, GatewayState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn script(&self, order_code: i64, script: Script) {
        self.state().scripts.insert(order_code, script);
    }

    pub fn set_status(&self, order_code: i64, status: GatewayStatus) {
        self.script(order_code, Script::Status(status));
    }

    pub fn set_unreachable(&self, order_code: i64) {
        self.script(order_code, Script::Unreachable);
    }

    /// Order codes queried so far, in call order.
    pub fn queries(&self) -> Vec<i64> {
        self.state().queries.clone()
    }

    pub fn query_count(&self) -> usize {
        self.state().queries.len()
    }
}

#[async_trait]
impl GatewayClient for ScriptedGateway {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn get_status(&self, order_code: i64) -> Result<GatewayStatus, GatewayError> {
        let script = {
            let mut st = self.state();
            st.queries.push(order_code);
            st.scripts.get(&order_code).cloned()
        };

        match self.latency {
            Some(d) => tokio::time::sleep(d).await,
            None => tokio::task::yield_now().await,
        }

        match script {
            Some(Script::Status(status)) => Ok(status),
            Some(Script::Unreachable) => Err(GatewayError::Unreachable(format!(
                "scripted outage for order {order_code}"
            ))),
            None => Ok(GatewayStatus::Other("PENDING".to_string())),
        }
    }
}
