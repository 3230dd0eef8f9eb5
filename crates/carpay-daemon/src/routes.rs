//! Axum router and HTTP handlers for carpay-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Error bodies are fixed strings: gateway and store
//! details go to the log, never to the client.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use carpay_ledger::{derive_status, StoreError};
use carpay_reconcile::ReconcileError;
use tracing::{info, warn};

use crate::{
    api_types::{
        BatchReconcileEntry, BatchReconcileRequest, BatchReconcileResponse, BookingListResponse,
        BookingStatusResponse, DeriveRequest, ErrorResponse, HealthResponse,
    },
    state::AppState,
};

pub const MSG_UNAVAILABLE: &str = "could not determine payment status, try again";
pub const MSG_NOT_FOUND: &str = "booking not found";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are not applied here; `main.rs`
/// attaches them so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/derive", post(derive))
        .route("/v1/bookings/reconcile", post(reconcile_batch))
        .route("/v1/bookings/:booking_id/reconcile", post(reconcile_one))
        .route("/v1/bookings/:booking_id/status", get(booking_status))
        .route("/v1/users/:user_id/bookings", get(user_bookings))
        .with_state(state)
}

fn error(status: StatusCode, msg: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

fn store_error(e: &StoreError) -> Response {
    if e.is_not_found() {
        error(StatusCode::NOT_FOUND, MSG_NOT_FOUND)
    } else {
        error(StatusCode::SERVICE_UNAVAILABLE, MSG_UNAVAILABLE)
    }
}

fn reconcile_error(e: &ReconcileError) -> Response {
    if e.is_not_found() {
        error(StatusCode::NOT_FOUND, MSG_NOT_FOUND)
    } else {
        error(StatusCode::SERVICE_UNAVAILABLE, MSG_UNAVAILABLE)
    }
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/derive
// ---------------------------------------------------------------------------

pub(crate) async fn derive(Json(req): Json<DeriveRequest>) -> impl IntoResponse {
    (StatusCode::OK, Json(derive_status(&req.lines)))
}

// ---------------------------------------------------------------------------
// POST /v1/bookings/:booking_id/reconcile
// ---------------------------------------------------------------------------

pub(crate) async fn reconcile_one(
    State(st): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Response {
    match st.reconciler.reconcile(&booking_id).await {
        Ok(report) => {
            st.lists.invalidate_booking(&booking_id).await;
            info!(
                booking_id = %booking_id,
                updated_lines = report.updated_lines(),
                booking_updated = report.booking_updated,
                "daemon: booking reconciled"
            );
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(e) => {
            warn!(booking_id = %booking_id, error = %e, "daemon: reconcile failed");
            reconcile_error(&e)
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/bookings/reconcile
// ---------------------------------------------------------------------------

pub(crate) async fn reconcile_batch(
    State(st): State<Arc<AppState>>,
    Json(req): Json<BatchReconcileRequest>,
) -> impl IntoResponse {
    let results = st
        .reconciler
        .reconcile_many(&req.booking_ids, st.max_concurrency)
        .await;

    let mut entries = Vec::with_capacity(results.len());
    for (booking_id, result) in results {
        let entry = match result {
            Ok(report) => {
                st.lists.invalidate_booking(&booking_id).await;
                BatchReconcileEntry {
                    booking_id,
                    report: Some(report),
                    error: None,
                }
            }
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "daemon: reconcile failed");
                let msg = if e.is_not_found() {
                    MSG_NOT_FOUND
                } else {
                    MSG_UNAVAILABLE
                };
                BatchReconcileEntry {
                    booking_id,
                    report: None,
                    error: Some(msg.to_string()),
                }
            }
        };
        entries.push(entry);
    }

    (StatusCode::OK, Json(BatchReconcileResponse { results: entries }))
}

// ---------------------------------------------------------------------------
// GET /v1/bookings/:booking_id/status
// ---------------------------------------------------------------------------

pub(crate) async fn booking_status(
    State(st): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Response {
    let (booking, lines) = tokio::join!(
        st.bookings.get_booking(&booking_id),
        st.lines.lines_for_booking(&booking_id),
    );
    let (booking, lines) = match (booking, lines) {
        (Ok(b), Ok(l)) => (b, l),
        (Err(e), _) | (_, Err(e)) => {
            warn!(booking_id = %booking_id, error = %e, "daemon: status lookup failed");
            return store_error(&e);
        }
    };

    (
        StatusCode::OK,
        Json(BookingStatusResponse {
            booking_id: booking.booking_id,
            stored_status: booking.status,
            derived: derive_status(&lines),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/users/:user_id/bookings
// ---------------------------------------------------------------------------

pub(crate) async fn user_bookings(
    State(st): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Response {
    match st.lists.load_page(&user_id).await {
        Ok(bookings) => (
            StatusCode::OK,
            Json(BookingListResponse { user_id, bookings }),
        )
            .into_response(),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "daemon: booking list failed");
            store_error(&e)
        }
    }
}
