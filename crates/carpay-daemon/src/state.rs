//! Shared runtime state for carpay-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The only mutable state
//! is inside the list loader's caches.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use carpay_api::RestApi;
use carpay_cache::{BookingListLoader, ListTtls};
use carpay_config::{EngineSettings, ResolvedSecrets};
use carpay_gateway::PayOsGateway;
use carpay_ledger::{BookingStore, DirectoryStore, GatewayClient, PaymentLineStore};
use carpay_reconcile::Reconciler;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "carpay-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Store and gateway handles the daemon is wired to.
#[derive(Clone)]
pub struct Backends {
    pub bookings: Arc<dyn BookingStore>,
    pub lines: Arc<dyn PaymentLineStore>,
    pub directory: Arc<dyn DirectoryStore>,
    pub gateway: Arc<dyn GatewayClient>,
}

/// Handle shared across all Axum handlers.
pub struct AppState {
    pub build: BuildInfo,
    pub bookings: Arc<dyn BookingStore>,
    pub lines: Arc<dyn PaymentLineStore>,
    pub reconciler: Reconciler,
    pub lists: BookingListLoader,
    /// Upper bound for `POST /v1/bookings/reconcile`.
    pub max_concurrency: usize,
}

impl AppState {
    pub fn new(backends: Backends, ttls: ListTtls, max_concurrency: usize) -> Self {
        let reconciler = Reconciler::new(
            backends.bookings.clone(),
            backends.lines.clone(),
            backends.gateway,
        );
        let lists = BookingListLoader::new(
            backends.bookings.clone(),
            backends.lines.clone(),
            backends.directory,
            ttls,
        );
        Self {
            build: BuildInfo::default(),
            bookings: backends.bookings,
            lines: backends.lines,
            reconciler,
            lists,
            max_concurrency,
        }
    }

    /// Production wiring: REST system of record plus the PayOS gateway.
    pub fn from_settings(settings: &EngineSettings, secrets: &ResolvedSecrets) -> Result<Self> {
        let Some(base_url) = settings.api.base_url.as_deref() else {
            bail!("CONFIG_INVALID: api.base_url is required to reach the booking system");
        };
        let api = Arc::new(RestApi::new(
            base_url,
            Duration::from_millis(settings.api.timeout_ms),
        )?);

        let creds = secrets.require_gateway()?;
        let gateway = Arc::new(PayOsGateway::new_with_base_url(
            creds.client_id,
            creds.api_key,
            settings.gateway.base_url.clone(),
            Duration::from_millis(settings.gateway.timeout_ms),
        )?);

        let backends = Backends {
            bookings: api.clone(),
            lines: api.clone(),
            directory: api,
            gateway,
        };
        let ttls = ListTtls {
            list: Duration::from_millis(settings.cache.list_ttl_ms),
            entity: Duration::from_millis(settings.cache.entity_ttl_ms),
        };
        Ok(Self::new(backends, ttls, settings.reconcile.max_concurrency))
    }
}

/// Spawn a background task that drops expired list-cache entries every
/// `interval`.
pub fn spawn_cache_purge(state: Arc<AppState>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let dropped = state.lists.purge_expired().await;
            if dropped > 0 {
                debug!(dropped, "daemon: expired cache entries purged");
            }
        }
    });
}
