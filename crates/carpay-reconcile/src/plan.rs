//! Pure decision rules for a reconciliation pass. No IO.

use carpay_ledger::{governing_line, BookingStatus, LineStatus, PaymentLine};

use crate::GatewayObservation;

/// A line after its correction step, paired with what the gateway said.
///
/// `line.status` is the local status after the write (or the previous status
/// if no write happened or the write was refused).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineOutcome {
    pub line: PaymentLine,
    pub observation: GatewayObservation,
}

/// Local status a line should move to, or `None` to leave it alone.
///
/// Terminal lines are never touched. Only terminal gateway answers produce a
/// candidate, and only when it differs from the current status.
pub fn plan_line(line: &PaymentLine, observation: &GatewayObservation) -> Option<LineStatus> {
    if line.status.is_terminal() {
        return None;
    }
    match observation {
        GatewayObservation::Reported(status) => {
            status.candidate().filter(|next| *next != line.status)
        }
        GatewayObservation::Skipped | GatewayObservation::Error => None,
    }
}

/// Booking status implied by the line set, or `None` when the mix is
/// indeterminate (pending lines are not evidence of failure).
///
/// Only active lines, plus the governing line of a kind with no active line,
/// are considered, so cancelled history next to a recreated line does not
/// count.
///
/// - every governing line paid (gateway `PAID` or locally `Paid`) => `Confirmed`
/// - otherwise any governing line reported `CANCELLED`/`EXPIRED` by the gateway
///   in this pass => `Canceled`
///
/// A line that was already cancelled locally was not queried, so it is not
/// fresh evidence and never cancels the booking on its own. An empty line set
/// is indeterminate.
pub fn aggregate_target(outcomes: &[LineOutcome]) -> Option<BookingStatus> {
    let lines: Vec<PaymentLine> = outcomes.iter().map(|o| o.line.clone()).collect();
    let deciding: Vec<&LineOutcome> = outcomes
        .iter()
        .filter(|o| o.line.is_active() || governs(&lines, &o.line))
        .collect();
    if deciding.is_empty() {
        return None;
    }

    let all_paid = deciding
        .iter()
        .all(|o| o.line.status == LineStatus::Paid || o.observation.is_paid());
    if all_paid {
        return Some(BookingStatus::Confirmed);
    }

    if deciding.iter().any(|o| o.observation.is_cancelled()) {
        return Some(BookingStatus::Canceled);
    }

    None
}

fn governs(lines: &[PaymentLine], line: &PaymentLine) -> bool {
    governing_line(lines, line.kind).is_some_and(|g| g.order_code == line.order_code)
}
