//! In-memory store implementation.
//!
//! Backs the saved-query and transcript seams for tests and for deployments
//! where the owning services push data in at startup.

use super::{SavedQuery, SavedQueryStore, TranscriptPart, TranscriptStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// A thread-safe in-memory favourites and transcript store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: RwLock<HashMap<String, SavedQuery>>,
    transcripts: RwLock<HashMap<String, Vec<TranscriptPart>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a favourited query under a chat message id.
    pub fn insert_saved(&self, chat_message_id: impl Into<String>, saved: SavedQuery) {
        self.saved
            .write()
            .expect("saved-query store poisoned")
            .insert(chat_message_id.into(), saved);
    }

    /// Records a message's tool-call parts.
    pub fn insert_transcript(
        &self,
        chat_message_id: impl Into<String>,
        parts: Vec<TranscriptPart>,
    ) {
        self.transcripts
            .write()
            .expect("transcript store poisoned")
            .insert(chat_message_id.into(), parts);
    }
}

#[async_trait]
impl SavedQueryStore for MemoryStore {
    async fn find_by_message(&self, chat_message_id: &str) -> Result<Option<SavedQuery>> {
        Ok(self
            .saved
            .read()
            .expect("saved-query store poisoned")
            .get(chat_message_id)
            .cloned())
    }
}

#[async_trait]
impl TranscriptStore for MemoryStore {
    async fn message_parts(&self, chat_message_id: &str) -> Result<Option<Vec<TranscriptPart>>> {
        Ok(self
            .transcripts
            .read()
            .expect("transcript store poisoned")
            .get(chat_message_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SQL_READ_PART_KIND;
    use serde_json::json;

    #[tokio::test]
    async fn test_saved_query_round_trip() {
        let store = MemoryStore::new();
        store.insert_saved(
            "msg-1",
            SavedQuery {
                sql: "SELECT 1".to_string(),
                database: None,
                purpose: Some("smoke".to_string()),
            },
        );

        let found = store.find_by_message("msg-1").await.unwrap().unwrap();
        assert_eq!(found.sql, "SELECT 1");
        assert!(store.find_by_message("msg-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transcript_round_trip() {
        let store = MemoryStore::new();
        store.insert_transcript(
            "msg-1",
            vec![TranscriptPart {
                kind: SQL_READ_PART_KIND.to_string(),
                input: json!({"query": "SELECT 1"}),
                output: json!({}),
            }],
        );

        let parts = store.message_parts("msg-1").await.unwrap().unwrap();
        assert_eq!(parts.len(), 1);
        assert!(store.message_parts("msg-2").await.unwrap().is_none());
    }
}
