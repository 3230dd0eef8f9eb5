//! carpay-testkit
//!
//! In-process fakes for the store and gateway contracts, plus fixtures.
//! Used by the scenario tests under `tests/` and by the daemon's route tests.
//! Nothing here talks to a network.

mod fixtures;
mod gateway;
mod ledger;
mod records;

pub use fixtures::{car, line, line_at, t0, user};
pub use gateway::{Script, ScriptedGateway};
pub use ledger::{InMemoryLedger, ReadCounts, WriteCall};
pub use records::InMemoryRecords;
