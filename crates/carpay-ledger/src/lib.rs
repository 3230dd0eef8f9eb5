//! carpay-ledger
//!
//! Booking and payment-line model shared by every other crate.
//!
//! - `types`: bookings, invoices, payment lines, gateway vocabulary.
//! - `store`: the async contracts the engine consumes (booking store,
//!   payment-line store, gateway client, directory).
//! - `derive`: the pure booking-status / action-permission projection.
//!
//! Deterministic, no IO. `store` only declares traits.

pub mod derive;
pub mod store;
mod types;

pub use derive::{derive_status, governing_line, DerivedStatus};
pub use store::*;
pub use types::*;
