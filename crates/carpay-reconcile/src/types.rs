use std::fmt;

use carpay_ledger::{BookingStatus, DerivedStatus, GatewayStatus, LineKind, LineStatus, StoreError};
use serde::{Deserialize, Serialize};

/// What the gateway said about one line during a pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GatewayObservation {
    /// Line was already terminal locally; the gateway was not asked.
    Skipped,
    /// Gateway answered.
    Reported(GatewayStatus),
    /// Gateway could not be reached or returned an unusable answer.
    Error,
}

impl GatewayObservation {
    pub fn as_str(&self) -> &str {
        match self {
            GatewayObservation::Skipped => "SKIPPED",
            GatewayObservation::Reported(s) => s.as_str(),
            GatewayObservation::Error => "ERROR",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, GatewayObservation::Reported(s) if s.is_paid())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayObservation::Reported(s) if s.is_cancelled())
    }
}

impl From<String> for GatewayObservation {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "SKIPPED" => GatewayObservation::Skipped,
            "ERROR" => GatewayObservation::Error,
            _ => GatewayObservation::Reported(GatewayStatus::parse(&raw)),
        }
    }
}

impl From<GatewayObservation> for String {
    fn from(o: GatewayObservation) -> Self {
        o.as_str().to_string()
    }
}

/// Per-line entry of a [`ReconciliationReport`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineReport {
    pub order_code: i64,
    pub kind: LineKind,
    pub previous_status: LineStatus,
    pub gateway_status: GatewayObservation,
    pub was_updated: bool,
    /// Operator-facing detail when the gateway lookup or the write failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Full result of one reconciliation pass over a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub booking_id: String,
    pub previous_booking_status: BookingStatus,
    /// Status after the pass (unchanged if no transition was written).
    pub booking_status: BookingStatus,
    pub booking_updated: bool,
    pub lines: Vec<LineReport>,
    /// Derived status over the corrected lines.
    pub derived: DerivedStatus,
}

impl ReconciliationReport {
    pub fn updated_lines(&self) -> usize {
        self.lines.iter().filter(|l| l.was_updated).count()
    }

    /// `true` when the pass wrote nothing at all.
    pub fn is_noop(&self) -> bool {
        !self.booking_updated && self.updated_lines() == 0
    }

    pub fn gateway_errors(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.gateway_status == GatewayObservation::Error)
            .count()
    }

    pub fn line(&self, order_code: i64) -> Option<&LineReport> {
        self.lines.iter().find(|l| l.order_code == order_code)
    }
}

/// Fatal reconciliation failures. Everything else lands in the report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    /// Booking or invoice missing, or the booking has no invoice yet.
    NotFound { entity: &'static str, id: String },
    /// The source of record could not be read.
    StoreUnavailable(String),
}

impl ReconcileError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReconcileError::NotFound { .. })
    }
}

impl From<StoreError> for ReconcileError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => ReconcileError::NotFound { entity, id },
            other => ReconcileError::StoreUnavailable(other.to_string()),
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::NotFound { entity, id } => {
                write!(f, "nothing to reconcile: {entity} not found: {id}")
            }
            ReconcileError::StoreUnavailable(msg) => {
                write!(f, "could not load booking ledger: {msg}")
            }
        }
    }
}

impl std::error::Error for ReconcileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_wire_values() {
        assert_eq!(String::from(GatewayObservation::Error), "ERROR");
        assert_eq!(String::from(GatewayObservation::Skipped), "SKIPPED");
        assert_eq!(
            String::from(GatewayObservation::Reported(GatewayStatus::Paid)),
            "PAID"
        );
        assert_eq!(
            GatewayObservation::from("EXPIRED".to_string()),
            GatewayObservation::Reported(GatewayStatus::Expired)
        );
    }

    #[test]
    fn store_not_found_stays_not_found() {
        let e: ReconcileError = StoreError::not_found("booking", "B-1").into();
        assert!(e.is_not_found());

        let e: ReconcileError = StoreError::Unavailable("timeout".into()).into();
        assert_eq!(e, ReconcileError::StoreUnavailable("store unavailable: timeout".into()));
    }
}
