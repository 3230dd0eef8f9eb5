//! carpay-echo
//!
//! Optimistic echo reconciliation: a locally created record is shown at once
//! and later replaced by its server-confirmed counterpart, without visible
//! duplication and without losing records the server has not seen yet.
//!
//! Synthetic and authoritative records never share an id, so supersession is
//! decided by content and a time window. This is best-effort de-duplication:
//! two distinct messages with identical text from the same sender inside the
//! window collapse into one.

mod merge;
mod record;
mod session;

pub use merge::{is_superseded, merge, MergePolicy, DEFAULT_ECHO_WINDOW_SECS};
pub use record::{chronological, latest_first, EchoRecord, MessageDraft, MessageRecord, Origin};
pub use session::{EchoSession, RecordStore};
