//! Chat transcript manager — appends turns, drives the AI responder, and
//! enforces the retained-turn window.

use tracing::debug;

use crate::error::LlmError;
use crate::llm::ChatProvider;
use crate::state::{ChatTurn, ConversationState};

/// Maximum number of retained transcript turns. The window is a flat ring
/// over individual turns, not conversation pairs; truncation may drop a
/// user turn while keeping its assistant reply.
pub const MAX_TRANSCRIPT_TURNS: usize = 10;

/// Drop the oldest turns until the transcript fits the window.
pub fn trim_history(history: &mut Vec<ChatTurn>) {
    if history.len() > MAX_TRANSCRIPT_TURNS {
        let excess = history.len() - MAX_TRANSCRIPT_TURNS;
        history.drain(..excess);
        debug!(dropped = excess, "trimmed chat transcript to window");
    }
}

/// Append the user's turn, ask the AI responder for a reply, and append it.
///
/// On success the transcript gains both turns and is trimmed to the window.
/// On failure the user's turn stays in the transcript (still trimmed) and
/// the error is returned; the caller persists the state regardless and
/// substitutes a user-visible fallback message.
pub async fn respond(
    state: &mut ConversationState,
    user_text: &str,
    provider: &dyn ChatProvider,
) -> Result<String, LlmError> {
    state.chat_history.push(ChatTurn::user(user_text));

    let reply = match provider.chat(&state.chat_history).await {
        Ok(reply) => reply,
        Err(e) => {
            trim_history(&mut state.chat_history);
            return Err(e);
        }
    };

    state.chat_history.push(ChatTurn::assistant(&reply));
    trim_history(&mut state.chat_history);

    Ok(reply)
}
