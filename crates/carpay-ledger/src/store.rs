//! Store and gateway contracts consumed by the engine.
//!
//! These are capabilities, not transports: the reconciliation loop and the
//! list loader only ever see these traits, so tests drive them with scripted
//! fakes and production wires in the HTTP adapters.
//!
//! The two payment-line write paths are separate methods on purpose: the
//! boundary system updates booking-level fees through a booking endpoint and
//! order-level fees through an order endpoint. Callers pick one via
//! [`LineKind::update_path`].

use std::fmt;

use async_trait::async_trait;

use crate::{
    Booking, BookingStatus, Car, GatewayStatus, Invoice, LineKind, LineStatus, PaymentLine,
    PaymentMethod, UserProfile,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors a booking / payment-line / directory store may return.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The requested entity does not exist.
    NotFound { entity: &'static str, id: String },
    /// The store understood the request and refused it.
    Rejected { reason: String },
    /// The store could not be reached or failed internally.
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            StoreError::Rejected { reason } => write!(f, "store rejected write: {reason}"),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors a [`GatewayClient`] may return.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayError {
    /// Network or transport failure.
    Unreachable(String),
    /// The gateway answered with an application-level error.
    Api { code: String, message: String },
    /// The response payload could not be decoded.
    Decode(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Unreachable(msg) => write!(f, "gateway unreachable: {msg}"),
            GatewayError::Api { code, message } => {
                write!(f, "gateway api error code={code}: {message}")
            }
            GatewayError::Decode(msg) => write!(f, "gateway decode error: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Source of record for bookings and invoices.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get_booking(&self, booking_id: &str) -> Result<Booking, StoreError>;

    async fn get_invoice(&self, invoice_id: &str) -> Result<Invoice, StoreError>;

    async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<(), StoreError>;

    /// Bookings owned by a user, newest first as the store returns them.
    async fn list_bookings(&self, user_id: &str) -> Result<Vec<Booking>, StoreError>;
}

/// Source of record for payment lines.
#[async_trait]
pub trait PaymentLineStore: Send + Sync {
    async fn lines_for_booking(&self, booking_id: &str) -> Result<Vec<PaymentLine>, StoreError>;

    /// Booking-level payment endpoint (`BookingFee`, `RentalFee`).
    async fn update_line_by_booking(
        &self,
        booking_id: &str,
        kind: LineKind,
        status: LineStatus,
    ) -> Result<(), StoreError>;

    /// Order-level endpoint (`Extension`, `AdditionalFee`).
    async fn update_line_by_order_code(
        &self,
        order_code: i64,
        status: LineStatus,
        method: PaymentMethod,
    ) -> Result<(), StoreError>;
}

/// Read-only status lookup against the payment gateway.
///
/// The gateway is eventually consistent and authoritative: its answer wins
/// over local state whenever it reports a terminal value.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_status(&self, order_code: i64) -> Result<GatewayStatus, GatewayError>;
}

/// Car and user lookups used by list views.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn get_car(&self, car_id: &str) -> Result<Car, StoreError>;

    async fn get_user(&self, user_id: &str) -> Result<UserProfile, StoreError>;
}
