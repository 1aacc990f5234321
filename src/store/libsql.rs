//! libSQL backend — conversation state in a single key-value table.
//!
//! Supports local file and in-memory databases. `libsql::Connection` is
//! `Send + Sync` and safe for concurrent async use, so one connection is
//! reused for all operations.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use tracing::info;

use crate::error::StoreError;
use crate::state::ConversationState;
use crate::store::{StateStore, state_key};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS conversation_state (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// libSQL-backed state store.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and ensure the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("Failed to create store directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "state store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute(SCHEMA, ())
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for LibSqlStore {
    async fn get(&self, user_id: &str) -> Result<Option<ConversationState>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM conversation_state WHERE key = ?1",
                params![state_key(user_id)],
            )
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let Some(row) = rows.next().await.map_err(|e| StoreError::Query(e.to_string()))? else {
            return Ok(None);
        };

        let value: String = row.get(0).map_err(|e| StoreError::Query(e.to_string()))?;
        let state = serde_json::from_str(&value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(state))
    }

    async fn put(&self, user_id: &str, state: &ConversationState) -> Result<(), StoreError> {
        let value = serde_json::to_string(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO conversation_state (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![state_key(user_id), value, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChatTurn, Mode};

    #[tokio::test]
    async fn missing_key_yields_none() {
        let store = LibSqlStore::new_memory().await.unwrap();
        assert!(store.get("U-never-seen").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = LibSqlStore::new_memory().await.unwrap();

        let mut state = ConversationState::default();
        state.mode = Mode::Chat;
        state.diagnostic_step = 99;
        state.diagnostic_answers.subsidy = Some(true);
        state.chat_history.push(ChatTurn::user("こんにちは"));

        store.put("U1", &state).await.unwrap();
        let loaded = store.get("U1").await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn put_overwrites_existing_record() {
        let store = LibSqlStore::new_memory().await.unwrap();

        let mut state = ConversationState::default();
        store.put("U1", &state).await.unwrap();

        state.diagnostic_step = 2;
        store.put("U1", &state).await.unwrap();

        let loaded = store.get("U1").await.unwrap().unwrap();
        assert_eq!(loaded.diagnostic_step, 2);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = LibSqlStore::new_memory().await.unwrap();

        let mut a = ConversationState::default();
        a.diagnostic_step = 1;
        let b = ConversationState::default();

        store.put("UA", &a).await.unwrap();
        store.put("UB", &b).await.unwrap();

        assert_eq!(store.get("UA").await.unwrap().unwrap().diagnostic_step, 1);
        assert_eq!(store.get("UB").await.unwrap().unwrap().diagnostic_step, 0);
    }

    #[tokio::test]
    async fn survives_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");

        let mut state = ConversationState::default();
        state.diagnostic_step = 2;

        {
            let store = LibSqlStore::new_local(&path).await.unwrap();
            store.put("U1", &state).await.unwrap();
        }

        let store = LibSqlStore::new_local(&path).await.unwrap();
        let loaded = store.get("U1").await.unwrap().unwrap();
        assert_eq!(loaded.diagnostic_step, 2);
    }
}
