//! Request and response types for the carpay-daemon HTTP endpoints.
//!
//! No business logic lives here.

use carpay_cache::BookingListItem;
use carpay_ledger::{BookingStatus, DerivedStatus, PaymentLine};
use carpay_reconcile::ReconciliationReport;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response. Never carries gateway vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// /v1/bookings/:booking_id/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStatusResponse {
    pub booking_id: String,
    /// Status as persisted by the system of record.
    pub stored_status: BookingStatus,
    /// Projection of the current local lines; no gateway call is made.
    pub derived: DerivedStatus,
}

// ---------------------------------------------------------------------------
// /v1/bookings/reconcile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReconcileRequest {
    pub booking_ids: Vec<String>,
}

/// One booking of a batch: either a report or an error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReconcileEntry {
    pub booking_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ReconciliationReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReconcileResponse {
    pub results: Vec<BatchReconcileEntry>,
}

// ---------------------------------------------------------------------------
// /v1/derive
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeriveRequest {
    pub lines: Vec<PaymentLine>,
}

// ---------------------------------------------------------------------------
// /v1/users/:user_id/bookings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListResponse {
    pub user_id: String,
    pub bookings: Vec<BookingListItem>,
}
