//! Ledger data model: bookings, invoices, payment lines, directory entries and gateway statuses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Booking lifecycle. Never deleted, only terminalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payable component of a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineKind {
    BookingFee,
    RentalFee,
    Extension,
    AdditionalFee,
}

/// Which upstream endpoint owns writes for a line kind.
///
/// The boundary system models booking-level fees and order-level fees
/// differently; the two paths are kept distinct all the way down to the
/// store trait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdatePath {
    /// Booking-level payment endpoint, keyed by booking id.
    ByBooking,
    /// Order-level endpoint, keyed by order code.
    ByOrderCode,
}

impl LineKind {
    pub const ALL: [LineKind; 4] = [
        LineKind::BookingFee,
        LineKind::RentalFee,
        LineKind::Extension,
        LineKind::AdditionalFee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::BookingFee => "BOOKING_FEE",
            LineKind::RentalFee => "RENTAL_FEE",
            LineKind::Extension => "EXTENSION",
            LineKind::AdditionalFee => "ADDITIONAL_FEE",
        }
    }

    pub fn update_path(&self) -> UpdatePath {
        match self {
            LineKind::BookingFee | LineKind::RentalFee => UpdatePath::ByBooking,
            LineKind::Extension | LineKind::AdditionalFee => UpdatePath::ByOrderCode,
        }
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local status of a payment line. `Paid` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    Pending,
    Paid,
    Cancelled,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Pending => "PENDING",
            LineStatus::Paid => "PAID",
            LineStatus::Cancelled => "CANCELLED",
        }
    }

    /// Terminal statuses are never overwritten once reached.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LineStatus::Paid | LineStatus::Cancelled)
    }
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an order-level line was settled, passed through to the order endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "PAYOS")]
    PayOs,
    #[serde(rename = "CASH")]
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::PayOs => "PAYOS",
            PaymentMethod::Cash => "CASH",
        }
    }
}

/// Status of an order as reported by the payment gateway, in the gateway's
/// own vocabulary. Anything that is not a known terminal value is kept
/// verbatim and treated as still pending.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GatewayStatus {
    Paid,
    Cancelled,
    Expired,
    Other(String),
}

impl GatewayStatus {
    /// Case-insensitive parse of a raw gateway status string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PAID" => GatewayStatus::Paid,
            "CANCELLED" | "CANCELED" => GatewayStatus::Cancelled,
            "EXPIRED" => GatewayStatus::Expired,
            other => GatewayStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GatewayStatus::Paid => "PAID",
            GatewayStatus::Cancelled => "CANCELLED",
            GatewayStatus::Expired => "EXPIRED",
            GatewayStatus::Other(s) => s.as_str(),
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, GatewayStatus::Paid)
    }

    /// `CANCELLED` and `EXPIRED` both end the order without payment.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayStatus::Cancelled | GatewayStatus::Expired)
    }

    /// Local status this gateway answer maps to, if any.
    pub fn candidate(&self) -> Option<LineStatus> {
        match self {
            GatewayStatus::Paid => Some(LineStatus::Paid),
            GatewayStatus::Cancelled | GatewayStatus::Expired => Some(LineStatus::Cancelled),
            GatewayStatus::Other(_) => None,
        }
    }
}

impl From<String> for GatewayStatus {
    fn from(raw: String) -> Self {
        GatewayStatus::parse(&raw)
    }
}

impl From<GatewayStatus> for String {
    fn from(s: GatewayStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One payable line item of a booking, joined to the gateway by `order_code`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLine {
    pub order_code: i64,
    pub kind: LineKind,
    /// Integer minor units of the booking currency.
    pub amount: i64,
    pub status: LineStatus,
    pub created_at: DateTime<Utc>,
}

impl PaymentLine {
    pub fn new(
        order_code: i64,
        kind: LineKind,
        amount: i64,
        status: LineStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_code,
            kind,
            amount,
            status,
            created_at,
        }
    }

    /// Active = not cancelled. At most one active line per kind per booking.
    pub fn is_active(&self) -> bool {
        self.status != LineStatus::Cancelled
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_id: String,
    pub user_id: String,
    pub car_id: String,
    pub status: BookingStatus,
    #[serde(default)]
    pub invoice_id: Option<String>,
}

impl Booking {
    pub fn new(
        booking_id: impl Into<String>,
        user_id: impl Into<String>,
        car_id: impl Into<String>,
        status: BookingStatus,
    ) -> Self {
        Self {
            booking_id: booking_id.into(),
            user_id: user_id.into(),
            car_id: car_id.into(),
            status,
            invoice_id: None,
        }
    }

    pub fn with_invoice(mut self, invoice_id: impl Into<String>) -> Self {
        self.invoice_id = Some(invoice_id.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_id: String,
    pub booking_id: String,
    #[serde(default)]
    pub lines: Vec<PaymentLine>,
}

/// Directory entry for a rentable car (list views only).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub car_id: String,
    pub name: String,
    pub plate: String,
    pub daily_rate: i64,
}

/// Directory entry for a customer (list views only).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}
