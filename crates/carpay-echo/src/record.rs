use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MergePolicy;

/// Prefix of synthetic ids minted for locally originated records.
const LOCAL_ID_PREFIX: &str = "local-";

/// A record that may be a not-yet-confirmed local echo.
pub trait EchoRecord {
    fn is_pending(&self) -> bool;

    /// Creation time for pending records, server timestamp for confirmed ones.
    fn echoed_at(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Carries a durable server id.
    #[default]
    Confirmed,
    /// Locally originated, synthetic id, not yet seen in a server listing.
    Pending,
}

/// One chat message as shown in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub origin: Origin,
}

impl MessageRecord {
    pub fn confirmed(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            text: text.into(),
            created_at,
            origin: Origin::Confirmed,
        }
    }

    /// New pending echo with a fresh synthetic id.
    pub fn local(
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4()),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            text: text.into(),
            created_at,
            origin: Origin::Pending,
        }
    }

    pub fn is_local_id(id: &str) -> bool {
        id.starts_with(LOCAL_ID_PREFIX)
    }

    /// Sender + text equality, the match predicate of both merge instances.
    pub fn same_sender_and_text(a: &MessageRecord, b: &MessageRecord) -> bool {
        a.sender_id == b.sender_id && a.text == b.text
    }

    pub fn draft(&self) -> MessageDraft {
        MessageDraft {
            sender_id: self.sender_id.clone(),
            text: self.text.clone(),
        }
    }
}

impl EchoRecord for MessageRecord {
    fn is_pending(&self) -> bool {
        self.origin == Origin::Pending
    }

    fn echoed_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Body submitted to the record store for a new message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    pub sender_id: String,
    pub text: String,
}

fn oldest_first(a: &MessageRecord, b: &MessageRecord) -> Ordering {
    a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
}

fn newest_first(a: &MessageRecord, b: &MessageRecord) -> Ordering {
    oldest_first(b, a)
}

/// Conversation thread: oldest message at the top.
pub fn chronological() -> MergePolicy<MessageRecord> {
    MergePolicy::new(MessageRecord::same_sender_and_text, oldest_first)
}

/// Inverted list (newest at the top), as used by the support inbox.
pub fn latest_first() -> MergePolicy<MessageRecord> {
    MergePolicy::new(MessageRecord::same_sender_and_text, newest_first)
}
