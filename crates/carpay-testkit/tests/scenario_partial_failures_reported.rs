//! Scenario: per-line failures never abort a pass.
//!
//! # Invariant under test
//! A gateway outage for one line, or a refused write for another, is
//! recorded on that line's report entry. The other lines are still
//! corrected, and the booking status still follows the corrected set.

use std::sync::Arc;

use carpay_ledger::{Booking, BookingStatus, GatewayStatus, LineKind, LineStatus};
use carpay_reconcile::{GatewayObservation, Reconciler};
use carpay_testkit::{line, InMemoryLedger, ScriptedGateway};

fn setup() -> (Arc<InMemoryLedger>, Arc<ScriptedGateway>, Reconciler) {
    let ledger = Arc::new(InMemoryLedger::new());
    let gateway = Arc::new(ScriptedGateway::new());
    let reconciler = Reconciler::new(ledger.clone(), ledger.clone(), gateway.clone());
    (ledger, gateway, reconciler)
}

fn seed(ledger: &InMemoryLedger) {
    ledger.insert_booking(
        Booking::new("B1", "U1", "C1", BookingStatus::Pending).with_invoice("INV1"),
        vec![
            line(41, LineKind::BookingFee, LineStatus::Pending),
            line(42, LineKind::RentalFee, LineStatus::Pending),
            line(43, LineKind::Extension, LineStatus::Pending),
        ],
    );
}

#[tokio::test]
async fn gateway_outage_is_reported_per_line() {
    let (ledger, gateway, reconciler) = setup();
    seed(&ledger);
    gateway.set_status(41, GatewayStatus::Paid);
    gateway.set_unreachable(42);
    gateway.set_status(43, GatewayStatus::Paid);

    let report = reconciler.reconcile("B1").await.unwrap();

    assert_eq!(report.gateway_errors(), 1);
    let failed = report.line(42).unwrap();
    assert_eq!(failed.gateway_status, GatewayObservation::Error);
    assert!(!failed.was_updated);
    assert!(failed.note.is_some());

    assert!(report.line(41).unwrap().was_updated);
    assert!(report.line(43).unwrap().was_updated);
    assert_eq!(ledger.line(42).unwrap().status, LineStatus::Pending);

    // Unknown outcome for the rental fee: the booking stays where it was.
    assert_eq!(report.booking_status, BookingStatus::Pending);
    assert!(!report.booking_updated);
}

#[tokio::test]
async fn refused_write_keeps_local_status() {
    let (ledger, gateway, reconciler) = setup();
    seed(&ledger);
    for code in 41..=43 {
        gateway.set_status(code, GatewayStatus::Paid);
    }
    ledger.reject_line_writes(43);

    let report = reconciler.reconcile("B1").await.unwrap();

    let refused = report.line(43).unwrap();
    assert!(!refused.was_updated);
    assert!(refused.note.as_deref().unwrap_or("").contains("locked"));
    assert_eq!(ledger.line(43).unwrap().status, LineStatus::Pending);

    // The gateway still says every order is paid.
    assert_eq!(report.booking_status, BookingStatus::Confirmed);
    // The derived view reflects only what was actually written.
    assert!(report.derived.can_pickup);
    assert!(!report.derived.can_return);
}

#[tokio::test]
async fn refused_booking_write_keeps_previous_status() {
    let (ledger, gateway, reconciler) = setup();
    seed(&ledger);
    for code in 41..=43 {
        gateway.set_status(code, GatewayStatus::Paid);
    }
    ledger.reject_booking_writes(true);

    let report = reconciler.reconcile("B1").await.unwrap();

    assert_eq!(report.updated_lines(), 3);
    assert!(!report.booking_updated);
    assert_eq!(report.booking_status, BookingStatus::Pending);
    assert_eq!(ledger.booking("B1").unwrap().status, BookingStatus::Pending);
}
