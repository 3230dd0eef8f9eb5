//! carpay-cache
//!
//! Read-side helpers for list views:
//! - `TtlCache`: time-boxed key/value cache on the tokio clock.
//! - `batch_fetch`: one concurrent lookup per distinct id.
//! - `BookingListLoader`: a user's bookings with cars, users, payment lines
//!   and derived status, fetched in batches and cached per entity.
//!
//! Derived status is recomputed on every page load and never cached.

mod batch;
mod cache;
mod list;

pub use batch::batch_fetch;
pub use cache::TtlCache;
pub use list::{BookingListItem, BookingListLoader, ListTtls};
