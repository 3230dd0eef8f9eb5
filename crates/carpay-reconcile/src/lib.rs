//! carpay-reconcile
//!
//! Payment reconciliation loop.
//!
//! - The gateway is the source of truth for whether money moved.
//! - Terminal local lines (`Paid` / `Cancelled`) are never re-queried nor
//!   overwritten, which makes every pass idempotent and safe to run
//!   concurrently for the same booking.
//! - A single line's failure is recorded in the report; only failing to load
//!   the booking, its invoice or its lines aborts the call.

mod engine;
mod plan;
mod types;

pub use engine::Reconciler;
pub use plan::{aggregate_target, plan_line, LineOutcome};
pub use types::*;
