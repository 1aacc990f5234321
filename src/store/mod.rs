//! Persistence layer — durable key-value storage for conversation state.

pub mod libsql;
pub mod memory;

pub use libsql::LibSqlStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::state::ConversationState;

/// Async key-value store for per-user conversation state.
///
/// Injected into the dispatcher as `Arc<dyn StateStore>` so event handling
/// is testable without a live backend. A missing key is `Ok(None)`, never
/// an error; callers synthesize the default state.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<ConversationState>, StoreError>;

    async fn put(&self, user_id: &str, state: &ConversationState) -> Result<(), StoreError>;
}

/// Storage key for a user's state record.
pub fn state_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_prefix() {
        assert_eq!(state_key("U1234"), "user:U1234");
    }
}
