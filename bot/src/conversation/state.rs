//! # Conversation State
//!
//! File: bot/src/conversation/state.rs
//! Author: Christi Mahu
//!
//! In-memory, per-conversation session data. State is loaded at the start of
//! a turn (a fresh value when the conversation is new) and saved once the turn
//! has been handled. Entries are never evicted, so the map grows with the
//! number of distinct conversations for the life of the process.
//!
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Session data for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub turn_count: u64,
    pub first_turn_at: Option<DateTime<Utc>>,
    pub last_turn_at: Option<DateTime<Utc>>,
}

impl ConversationState {
    /// Records that a turn started at `now`.
    pub fn record_turn(&mut self, now: DateTime<Utc>) {
        self.turn_count += 1;
        self.first_turn_at.get_or_insert(now);
        self.last_turn_at = Some(now);
    }
}

/// Conversation state keyed by `{channelId}/conversations/{conversationId}`.
///
/// `load` and `save` each take the lock once; two concurrent turns of the same
/// conversation may both load the same snapshot and the later save wins.
#[derive(Debug, Default)]
pub struct ConversationStateStore {
    entries: Mutex<HashMap<String, ConversationState>>,
}

impl ConversationStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored state, or a fresh default that is not stored until `save`.
    pub async fn load(&self, key: &str) -> ConversationState {
        self.entries
            .lock()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn save(&self, key: &str, state: ConversationState) {
        self.entries.lock().await.insert(key.to_string(), state);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
