use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};

use crate::EchoRecord;

/// Default supersession window between a pending echo and its server twin.
pub const DEFAULT_ECHO_WINDOW_SECS: i64 = 30;

/// Parameters of one merge instance.
///
/// Every call site shares [`merge`]; what differs is how records are compared
/// for "same content" and how the result is ordered for presentation.
pub struct MergePolicy<T> {
    /// Maximum distance (inclusive) between the pending record's creation
    /// time and the server record's timestamp.
    pub window: Duration,
    /// Semantic equality between a server record and a pending record.
    pub same_content: fn(&T, &T) -> bool,
    /// Presentation order of the merged output.
    pub order: fn(&T, &T) -> Ordering,
}

impl<T> Clone for MergePolicy<T> {
    fn clone(&self) -> Self {
        Self {
            window: self.window,
            same_content: self.same_content,
            order: self.order,
        }
    }
}

impl<T> MergePolicy<T> {
    pub fn new(same_content: fn(&T, &T) -> bool, order: fn(&T, &T) -> Ordering) -> Self {
        Self {
            window: Duration::seconds(DEFAULT_ECHO_WINDOW_SECS),
            same_content,
            order,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Window from a configured number of seconds; negative values are
    /// clamped to zero.
    pub fn with_window_secs(self, secs: i64) -> Self {
        self.with_window(Duration::seconds(secs.max(0)))
    }
}

/// `true` if some confirmed server record has the same content as `pending`
/// and lies within the policy window of it.
pub fn is_superseded<T: EchoRecord>(pending: &T, server: &[T], policy: &MergePolicy<T>) -> bool {
    server.iter().filter(|s| !s.is_pending()).any(|s| {
        (policy.same_content)(s, pending)
            && within(s.echoed_at(), pending.echoed_at(), policy.window)
    })
}

/// Merge the authoritative server list with the client's current view.
///
/// 1. Client records already confirmed are dropped: the server list carries
///    them.
/// 2. Pending client records superseded by a server record are dropped.
/// 3. Server records plus surviving pending records are stable-sorted by
///    the policy's order.
///
/// Pure and deterministic; merging the output again with the same server
/// list yields the same output.
pub fn merge<T: EchoRecord + Clone>(server: &[T], client: &[T], policy: &MergePolicy<T>) -> Vec<T> {
    let mut merged: Vec<T> = server.to_vec();
    merged.extend(
        client
            .iter()
            .filter(|r| r.is_pending())
            .filter(|r| !is_superseded(*r, server, policy))
            .cloned(),
    );
    merged.sort_by(policy.order);
    merged
}

fn within(a: DateTime<Utc>, b: DateTime<Utc>, window: Duration) -> bool {
    let delta = if a >= b { a - b } else { b - a };
    delta <= window
}
