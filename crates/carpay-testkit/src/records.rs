use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use carpay_echo::{MessageDraft, MessageRecord, RecordStore};
use carpay_ledger::StoreError;
use chrono::{DateTime, Duration, Utc};

#[derive(Default)]
struct RecordState {
    server: Vec<MessageRecord>,
    queued: Vec<(String, MessageDraft)>,
    lagging: bool,
    fail_submit: bool,
    submits: usize,
}

/// Message store fake.
///
/// Accepted submissions become server records stamped `clock + 1s`. With
/// `set_lagging(true)` they are queued instead, and only show up in listings
/// after `flush`.
pub struct InMemoryRecords {
    inner: Mutex<RecordState>,
    clock: Mutex<DateTime<Utc>>,
}

impl InMemoryRecords {
    pub fn new(clock: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(RecordState::default()),
            clock: Mutex::new(clock),
        }
    }

    fn state(&self) -> MutexGuard<'_, RecordState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> DateTime<Utc> {
        *self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn advance(&self, secs: i64) {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock += Duration::seconds(secs);
    }

    /// A record written by someone else (the other party of the chat).
    pub fn push_server(&self, record: MessageRecord) {
        self.state().server.push(record);
    }

    pub fn set_lagging(&self, lagging: bool) {
        self.state().lagging = lagging;
    }

    pub fn set_fail_submit(&self, fail: bool) {
        self.state().fail_submit = fail;
    }

    /// Materialise every queued submission as a server record.
    pub fn flush(&self) {
        let at = self.now() + Duration::seconds(1);
        let mut st = self.state();
        let queued = std::mem::take(&mut st.queued);
        for (owner_id, draft) in queued {
            let id = format!("srv-{}", st.server.len() + 1);
            st.server.push(MessageRecord::confirmed(
                id,
                owner_id,
                draft.sender_id,
                draft.text,
                at,
            ));
        }
    }

    pub fn submit_count(&self) -> usize {
        self.state().submits
    }

    pub fn server_len(&self) -> usize {
        self.state().server.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecords {
    async fn list_records(&self, owner_id: &str) -> Result<Vec<MessageRecord>, StoreError> {
        let mut records: Vec<MessageRecord> = self
            .state()
            .server
            .iter()
            .filter(|r| r.conversation_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn submit_record(&self, owner_id: &str, draft: &MessageDraft) -> Result<(), StoreError> {
        let lagging = {
            let mut st = self.state();
            st.submits += 1;
            if st.fail_submit {
                return Err(StoreError::Unavailable("message store offline".to_string()));
            }
            st.queued.push((owner_id.to_string(), draft.clone()));
            st.lagging
        };
        if !lagging {
            self.flush();
        }
        Ok(())
    }
}
