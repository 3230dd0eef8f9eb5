//! Scenario: nothing to reconcile.
//!
//! # Invariant under test
//! A missing booking, a booking without an invoice, or a dangling invoice
//! reference fails the whole call with `NotFound` and writes nothing. An
//! unreachable source of record fails with `StoreUnavailable`.

use std::sync::Arc;

use carpay_ledger::{Booking, BookingStatus, LineKind, LineStatus};
use carpay_reconcile::{ReconcileError, Reconciler};
use carpay_testkit::{line, InMemoryLedger, ScriptedGateway};

fn setup() -> (Arc<InMemoryLedger>, Arc<ScriptedGateway>, Reconciler) {
    let ledger = Arc::new(InMemoryLedger::new());
    let gateway = Arc::new(ScriptedGateway::new());
    let reconciler = Reconciler::new(ledger.clone(), ledger.clone(), gateway.clone());
    (ledger, gateway, reconciler)
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let (ledger, gateway, reconciler) = setup();

    let err = reconciler.reconcile("nope").await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(gateway.query_count(), 0);
    assert!(ledger.writes().is_empty());
}

#[tokio::test]
async fn booking_without_invoice_is_not_found() {
    let (ledger, gateway, reconciler) = setup();
    ledger.insert_booking(
        Booking::new("B1", "U1", "C1", BookingStatus::Pending),
        vec![line(42, LineKind::RentalFee, LineStatus::Pending)],
    );

    let err = reconciler.reconcile("B1").await.unwrap_err();

    assert_eq!(
        err,
        ReconcileError::NotFound {
            entity: "invoice",
            id: "B1".to_string()
        }
    );
    assert_eq!(gateway.query_count(), 0);
}

#[tokio::test]
async fn dangling_invoice_is_not_found() {
    let (ledger, _gateway, reconciler) = setup();
    ledger.insert_booking(
        Booking::new("B1", "U1", "C1", BookingStatus::Pending).with_invoice("INV1"),
        vec![line(42, LineKind::RentalFee, LineStatus::Pending)],
    );
    ledger.remove_invoice("INV1");

    let err = reconciler.reconcile("B1").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn offline_store_is_unavailable() {
    let (ledger, _gateway, reconciler) = setup();
    ledger.insert_booking(
        Booking::new("B1", "U1", "C1", BookingStatus::Pending).with_invoice("INV1"),
        vec![],
    );
    ledger.set_unavailable(true);

    let err = reconciler.reconcile("B1").await.unwrap_err();
    assert!(matches!(err, ReconcileError::StoreUnavailable(_)));
}

#[tokio::test]
async fn empty_line_set_is_indeterminate() {
    let (ledger, _gateway, reconciler) = setup();
    ledger.insert_booking(
        Booking::new("B1", "U1", "C1", BookingStatus::Pending).with_invoice("INV1"),
        vec![],
    );

    let report = reconciler.reconcile("B1").await.unwrap();
    assert!(report.is_noop());
    assert!(report.lines.is_empty());
    assert_eq!(report.booking_status, BookingStatus::Pending);
}
