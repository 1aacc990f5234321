//! In-memory state store for tests.
//!
//! Serializes through JSON like the real backend so wire-format bugs show
//! up in unit tests too. Tracks operation counts so tests can assert the
//! store was (or wasn't) touched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::state::ConversationState;
use crate::store::{StateStore, state_key};

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, String>>,
    gets: AtomicU64,
    puts: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls observed.
    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }

    /// Number of `put` calls observed.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, user_id: &str) -> Result<Option<ConversationState>, StoreError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let records = self.records.read().await;
        match records.get(&state_key(user_id)) {
            Some(value) => serde_json::from_str(value)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn put(&self, user_id: &str, state: &ConversationState) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        let value = serde_json::to_string(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.records.write().await.insert(state_key(user_id), value);
        Ok(())
    }
}
