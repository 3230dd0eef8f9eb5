//! Caller side of the echo merge for one conversation.
//!
//! Pending records live only in this session's memory. A pending record ends
//! either superseded by its server twin on `refresh`, or rolled back when its
//! submission fails.

use std::sync::Arc;

use async_trait::async_trait;
use carpay_ledger::StoreError;
use chrono::{DateTime, Utc};

use crate::{merge, EchoRecord, MergePolicy, MessageDraft, MessageRecord};

/// Server-side message history.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records of a conversation, sorted by creation time ascending.
    async fn list_records(&self, owner_id: &str) -> Result<Vec<MessageRecord>, StoreError>;

    async fn submit_record(&self, owner_id: &str, draft: &MessageDraft) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn list_records(&self, owner_id: &str) -> Result<Vec<MessageRecord>, StoreError> {
        (**self).list_records(owner_id).await
    }

    async fn submit_record(&self, owner_id: &str, draft: &MessageDraft) -> Result<(), StoreError> {
        (**self).submit_record(owner_id, draft).await
    }
}

pub struct EchoSession<S> {
    store: S,
    owner_id: String,
    policy: MergePolicy<MessageRecord>,
    records: Vec<MessageRecord>,
}

impl<S: RecordStore> EchoSession<S> {
    pub fn new(store: S, owner_id: impl Into<String>, policy: MergePolicy<MessageRecord>) -> Self {
        Self {
            store,
            owner_id: owner_id.into(),
            policy,
            records: Vec::new(),
        }
    }

    /// Current merged view, in the policy's order.
    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    pub fn pending_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_pending()).count()
    }

    /// Show `text` immediately as a pending echo, then submit it.
    ///
    /// Returns the synthetic id on success. On failure the echo is removed
    /// again and the store error is returned.
    pub async fn send(
        &mut self,
        sender_id: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let echo = MessageRecord::local(self.owner_id.clone(), sender_id, text, at);
        let local_id = echo.id.clone();
        let draft = echo.draft();

        self.records.push(echo);
        self.records.sort_by(self.policy.order);

        match self.store.submit_record(&self.owner_id, &draft).await {
            Ok(()) => Ok(local_id),
            Err(e) => {
                self.rollback(&local_id);
                Err(e)
            }
        }
    }

    /// Drop a pending echo. Returns `false` if no such pending record exists.
    pub fn rollback(&mut self, local_id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| !(r.is_pending() && r.id == local_id));
        self.records.len() != before
    }

    /// Pull the server listing and merge it with the local view.
    ///
    /// On error the local view is left untouched.
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        let server = self.store.list_records(&self.owner_id).await?;
        self.records = merge(&server, &self.records, &self.policy);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chronological;
    use chrono::Duration;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        server: Mutex<Vec<MessageRecord>>,
        fail_submit: bool,
        server_lag: bool,
    }

    #[async_trait]
    impl RecordStore for FakeStore {
        async fn list_records(&self, _owner_id: &str) -> Result<Vec<MessageRecord>, StoreError> {
            Ok(self.server.lock().unwrap().clone())
        }

        async fn submit_record(&self, owner_id: &str, draft: &MessageDraft) -> Result<(), StoreError> {
            if self.fail_submit {
                return Err(StoreError::Unavailable("offline".into()));
            }
            if self.server_lag {
                return Ok(());
            }
            let mut server = self.server.lock().unwrap();
            let id = format!("srv-{}", server.len() + 1);
            server.push(MessageRecord::confirmed(
                id,
                owner_id,
                draft.sender_id.clone(),
                draft.text.clone(),
                t0() + Duration::seconds(2),
            ));
            Ok(())
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn sent_echo_is_visible_then_superseded() {
        let mut session = EchoSession::new(FakeStore::default(), "conv-1", chronological());

        let local_id = session.send("u1", "hello", t0()).await.unwrap();
        assert_eq!(session.records().len(), 1);
        assert_eq!(session.records()[0].id, local_id);

        session.refresh().await.unwrap();
        assert_eq!(session.records().len(), 1);
        assert_eq!(session.records()[0].id, "srv-1");
        assert_eq!(session.pending_count(), 0);
    }

    #[tokio::test]
    async fn slow_server_keeps_echo_across_refresh() {
        let store = FakeStore {
            server_lag: true,
            ..FakeStore::default()
        };
        let mut session = EchoSession::new(store, "conv-1", chronological());

        session.send("u1", "hello", t0()).await.unwrap();
        session.refresh().await.unwrap();
        assert_eq!(session.pending_count(), 1);
    }

    #[tokio::test]
    async fn failed_submit_rolls_back_echo() {
        let store = FakeStore {
            fail_submit: true,
            ..FakeStore::default()
        };
        let mut session = EchoSession::new(store, "conv-1", chronological());

        let err = session.send("u1", "hello", t0()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(session.records().is_empty());
    }

    #[test]
    fn rollback_ignores_confirmed_records() {
        let mut session = EchoSession::new(FakeStore::default(), "conv-1", chronological());
        session
            .records
            .push(MessageRecord::confirmed("m1", "conv-1", "u1", "hi", t0()));
        assert!(!session.rollback("m1"));
        assert_eq!(session.records().len(), 1);
    }
}
