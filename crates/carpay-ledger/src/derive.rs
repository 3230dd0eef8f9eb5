//! Booking status derivation.
//!
//! Maps the full set of a booking's payment lines to a display status and the
//! actions the customer may take next. Pure and cheap: it runs on every list
//! render and after every reconciliation pass, and is never cached beyond a
//! single request.
//!
//! Rules, first match wins:
//! 1. no rental-fee line        => `Pending`
//! 2. rental fee `Paid`         => `Confirmed`, pickup allowed
//! 3. rental fee not paid       => `Pending`, no pickup
//! 4. return allowed iff pickup allowed and any extension is paid

use serde::{Deserialize, Serialize};

use crate::{BookingStatus, LineKind, LineStatus, PaymentLine};

/// Projection of a booking's lines. Not persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStatus {
    pub status: BookingStatus,
    pub can_pickup: bool,
    pub can_return: bool,
    /// Sum of active lines still awaiting payment.
    pub outstanding_amount: i64,
}

/// The line that decides a kind's state.
///
/// A kind may carry historical cancelled lines next to its single active
/// line. The active line governs; when every line of the kind is cancelled,
/// the most recently created one does.
pub fn governing_line(lines: &[PaymentLine], kind: LineKind) -> Option<&PaymentLine> {
    let mut latest_cancelled: Option<&PaymentLine> = None;
    for line in lines.iter().filter(|l| l.kind == kind) {
        if line.is_active() {
            return Some(line);
        }
        match latest_cancelled {
            Some(prev) if prev.created_at >= line.created_at => {}
            _ => latest_cancelled = Some(line),
        }
    }
    latest_cancelled
}

pub fn derive_status(lines: &[PaymentLine]) -> DerivedStatus {
    let (status, can_pickup) = match governing_line(lines, LineKind::RentalFee).map(|l| l.status) {
        None => (BookingStatus::Pending, false),
        Some(LineStatus::Paid) => (BookingStatus::Confirmed, true),
        // A cancelled rental fee has to be re-created before pickup.
        Some(LineStatus::Pending) | Some(LineStatus::Cancelled) => (BookingStatus::Pending, false),
    };

    // A cancelled extension request does not hold the car back.
    let extension_settled = match governing_line(lines, LineKind::Extension).map(|l| l.status) {
        None | Some(LineStatus::Paid) | Some(LineStatus::Cancelled) => true,
        Some(LineStatus::Pending) => false,
    };

    let outstanding_amount = lines
        .iter()
        .filter(|l| l.status == LineStatus::Pending)
        .map(|l| l.amount)
        .sum();

    DerivedStatus {
        status,
        can_pickup,
        can_return: can_pickup && extension_settled,
        outstanding_amount,
    }
}
