//! Per-user conversation state — which flow mode the user is in, diagnostic
//! progress, and the retained chat transcript.
//!
//! Serialized field names match the original key-value wire format
//! (`mode`, `diagnosticStep`, `diagnosticAnswers`, `chatHistory`,
//! `lastActivity`), so existing stored records stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel step value meaning the diagnostic flow has completed.
pub const COMPLETED_STEP: u8 = 99;

/// Which engine handles the user's next inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Diagnostic,
    Chat,
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the chat transcript, insertion order = chronological.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Answers collected by the diagnostic flow. Built incrementally; fields are
/// absent until their step has been answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticAnswers {
    /// Whether the user's employer offers a housing subsidy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsidy: Option<bool>,
    /// Monthly subsidy amount in yen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsidy_amount: Option<u32>,
    /// Rent-band tag, stored verbatim from the postback payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent: Option<String>,
}

/// Persisted per-user conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub mode: Mode,
    /// 0..2 = active question index, 99 = completed. Absent in stored
    /// records is treated as 0.
    #[serde(default)]
    pub diagnostic_step: u8,
    #[serde(default)]
    pub diagnostic_answers: DiagnosticAnswers,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
    /// Overwritten on every persisted write.
    pub last_activity: DateTime<Utc>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            mode: Mode::Diagnostic,
            diagnostic_step: 0,
            diagnostic_answers: DiagnosticAnswers::default(),
            chat_history: Vec::new(),
            last_activity: Utc::now(),
        }
    }
}

impl ConversationState {
    /// Put the user back at the start of the diagnostic flow, clearing any
    /// collected answers. The chat transcript is kept.
    pub fn reset_diagnostic(&mut self) {
        self.mode = Mode::Diagnostic;
        self.diagnostic_step = 0;
        self.diagnostic_answers = DiagnosticAnswers::default();
    }

    /// Whether the diagnostic flow has reached its terminal step.
    pub fn diagnostic_completed(&self) -> bool {
        self.diagnostic_step == COMPLETED_STEP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_fresh_diagnostic() {
        let state = ConversationState::default();
        assert_eq!(state.mode, Mode::Diagnostic);
        assert_eq!(state.diagnostic_step, 0);
        assert_eq!(state.diagnostic_answers, DiagnosticAnswers::default());
        assert!(state.chat_history.is_empty());
    }

    #[test]
    fn serde_uses_original_wire_names() {
        let mut state = ConversationState::default();
        state.mode = Mode::Chat;
        state.diagnostic_step = COMPLETED_STEP;
        state.diagnostic_answers.subsidy = Some(true);
        state.diagnostic_answers.subsidy_amount = Some(50000);
        state.diagnostic_answers.rent = Some("rent_high".to_string());
        state.chat_history.push(ChatTurn::user("hello"));

        let json: serde_json::Value = serde_json::to_value(&state).unwrap();
        assert_eq!(json["mode"], "chat");
        assert_eq!(json["diagnosticStep"], 99);
        assert_eq!(json["diagnosticAnswers"]["subsidy"], true);
        assert_eq!(json["diagnosticAnswers"]["subsidyAmount"], 50000);
        assert_eq!(json["diagnosticAnswers"]["rent"], "rent_high");
        assert_eq!(json["chatHistory"][0]["role"], "user");
        assert_eq!(json["chatHistory"][0]["content"], "hello");
        assert!(json["lastActivity"].is_string());
    }

    #[test]
    fn unanswered_fields_are_absent_on_the_wire() {
        let state = ConversationState::default();
        let json: serde_json::Value = serde_json::to_value(&state).unwrap();
        let answers = json["diagnosticAnswers"].as_object().unwrap();
        assert!(answers.is_empty());
    }

    #[test]
    fn missing_step_deserializes_as_zero() {
        let json = r#"{
            "mode": "diagnostic",
            "chatHistory": [],
            "lastActivity": "2025-01-15T09:30:00Z"
        }"#;
        let state: ConversationState = serde_json::from_str(json).unwrap();
        assert_eq!(state.diagnostic_step, 0);
        assert_eq!(state.diagnostic_answers, DiagnosticAnswers::default());
    }

    #[test]
    fn serde_roundtrip() {
        let mut state = ConversationState::default();
        state.diagnostic_step = 2;
        state.diagnostic_answers.subsidy = Some(false);
        state.chat_history.push(ChatTurn::user("家賃について"));
        state.chat_history.push(ChatTurn::assistant("🏠 はい、どうぞ"));

        let json = serde_json::to_string(&state).unwrap();
        let parsed: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn reset_clears_answers_but_keeps_transcript() {
        let mut state = ConversationState::default();
        state.mode = Mode::Chat;
        state.diagnostic_step = COMPLETED_STEP;
        state.diagnostic_answers.subsidy = Some(true);
        state.chat_history.push(ChatTurn::user("hi"));
        assert!(state.diagnostic_completed());

        state.reset_diagnostic();
        assert!(!state.diagnostic_completed());
        assert_eq!(state.mode, Mode::Diagnostic);
        assert_eq!(state.diagnostic_step, 0);
        assert_eq!(state.diagnostic_answers, DiagnosticAnswers::default());
        assert_eq!(state.chat_history.len(), 1);
    }
}
