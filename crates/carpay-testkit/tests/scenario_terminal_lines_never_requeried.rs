//! Scenario: terminal lines are final.
//!
//! # Invariant under test
//! Lines already `Paid` or `Cancelled` are never sent to the gateway and
//! never overwritten, even when the gateway would answer differently. A
//! second pass over a settled booking writes nothing.

use std::sync::Arc;

use carpay_ledger::{Booking, BookingStatus, GatewayStatus, LineKind, LineStatus};
use carpay_reconcile::{GatewayObservation, Reconciler};
use carpay_testkit::{line, line_at, InMemoryLedger, ScriptedGateway};

fn setup() -> (Arc<InMemoryLedger>, Arc<ScriptedGateway>, Reconciler) {
    let ledger = Arc::new(InMemoryLedger::new());
    let gateway = Arc::new(ScriptedGateway::new());
    let reconciler = Reconciler::new(ledger.clone(), ledger.clone(), gateway.clone());
    (ledger, gateway, reconciler)
}

#[tokio::test]
async fn terminal_lines_are_skipped() {
    let (ledger, gateway, reconciler) = setup();
    ledger.insert_booking(
        Booking::new("B1", "U1", "C1", BookingStatus::Pending).with_invoice("INV1"),
        vec![
            line(41, LineKind::BookingFee, LineStatus::Paid),
            line_at(40, LineKind::RentalFee, LineStatus::Cancelled, -3600),
            line(42, LineKind::RentalFee, LineStatus::Pending),
        ],
    );
    // The gateway disagrees with the local terminal states; it must not matter.
    gateway.set_status(41, GatewayStatus::Cancelled);
    gateway.set_status(40, GatewayStatus::Paid);

    let report = reconciler.reconcile("B1").await.unwrap();

    assert_eq!(gateway.queries(), vec![42]);
    assert_eq!(
        report.line(41).unwrap().gateway_status,
        GatewayObservation::Skipped
    );
    assert_eq!(
        report.line(40).unwrap().gateway_status,
        GatewayObservation::Skipped
    );
    assert_eq!(ledger.line(41).unwrap().status, LineStatus::Paid);
    assert_eq!(ledger.line(40).unwrap().status, LineStatus::Cancelled);

    // The cancelled predecessor is history, not a reason to cancel.
    assert_eq!(report.booking_status, BookingStatus::Pending);
    assert!(!report.booking_updated);
    assert_eq!(ledger.booking("B1").unwrap().status, BookingStatus::Pending);
}

#[tokio::test]
async fn second_pass_is_a_noop() {
    let (ledger, gateway, reconciler) = setup();
    ledger.insert_booking(
        Booking::new("B1", "U1", "C1", BookingStatus::Pending).with_invoice("INV1"),
        vec![
            line(41, LineKind::BookingFee, LineStatus::Pending),
            line(42, LineKind::RentalFee, LineStatus::Pending),
        ],
    );
    gateway.set_status(41, GatewayStatus::Paid);
    gateway.set_status(42, GatewayStatus::Paid);

    let first = reconciler.reconcile("B1").await.unwrap();
    assert_eq!(first.updated_lines(), 2);
    assert!(first.booking_updated);
    let writes_after_first = ledger.writes();

    let second = reconciler.reconcile("B1").await.unwrap();
    assert!(second.is_noop());
    assert_eq!(second.booking_status, BookingStatus::Confirmed);
    assert_eq!(ledger.writes(), writes_after_first);
    assert_eq!(gateway.query_count(), 2, "settled lines are not re-queried");
}

#[tokio::test]
async fn concurrent_passes_converge_to_one_state() {
    let ledger = Arc::new(InMemoryLedger::new());
    let gateway =
        Arc::new(ScriptedGateway::new().with_latency(std::time::Duration::from_millis(5)));
    let reconciler = Reconciler::new(ledger.clone(), ledger.clone(), gateway.clone());

    ledger.insert_booking(
        Booking::new("B1", "U1", "C1", BookingStatus::Pending).with_invoice("INV1"),
        vec![
            line(41, LineKind::BookingFee, LineStatus::Paid),
            line(42, LineKind::RentalFee, LineStatus::Pending),
            line(43, LineKind::Extension, LineStatus::Pending),
        ],
    );
    gateway.set_status(42, GatewayStatus::Paid);
    gateway.set_status(43, GatewayStatus::Paid);

    let (a, b) = tokio::join!(reconciler.reconcile("B1"), reconciler.reconcile("B1"));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.derived, b.derived);
    assert_eq!(ledger.line(42).unwrap().status, LineStatus::Paid);
    assert_eq!(ledger.line(43).unwrap().status, LineStatus::Paid);
    assert_eq!(ledger.booking("B1").unwrap().status, BookingStatus::Confirmed);

    // Whatever interleaving happened, a third pass has nothing left to do.
    let third = reconciler.reconcile("B1").await.unwrap();
    assert!(third.is_noop());
}
