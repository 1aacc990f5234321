//! AI responder integration.
//!
//! The chat fallback talks to Cerebras' OpenAI-compatible chat-completions
//! API. The provider is a trait so the dispatcher can be exercised with a
//! stub in tests.

pub mod cerebras;

pub use cerebras::CerebrasProvider;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::state::ChatTurn;

/// Opaque remote AI responder: full transcript in, one assistant turn out.
///
/// A single blocking request with no internal retry; any failure surfaces
/// as an [`LlmError`].
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn model_name(&self) -> &str;

    async fn chat(&self, history: &[ChatTurn]) -> Result<String, LlmError>;
}
