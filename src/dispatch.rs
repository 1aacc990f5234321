//! Event dispatcher — decodes inbound webhook events and drives the
//! per-user conversation state machine.
//!
//! Events in one batch are processed sequentially, so a user's state is
//! never read and written concurrently within a single invocation. No
//! per-event failure escapes: every failure becomes a fixed localized
//! fallback message and the batch continues.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::chat;
use crate::diagnostic;
use crate::error::Error;
use crate::line::ReplyMessage;
use crate::llm::ChatProvider;
use crate::state::{ConversationState, Mode};
use crate::store::StateStore;

/// Guidance shown when a user types free text instead of using the
/// diagnostic buttons; the flow hands over to chat mode without an AI call.
pub const GUIDANCE_TEXT: &str = "🤖 診断が完了していません。AIチャットモードに移行しました！\n\n住宅や不動産について何でもお聞きください。\n\n診断をやり直したい場合は「診断」と入力してください。";

/// Fallback for failures on the text-message path (AI responder or store).
pub const UNAVAILABLE_TEXT: &str =
    "申し訳ありません。一時的にサービスが利用できません。しばらく時間をおいてから再度お試しください。";

/// Fallback for failures on the postback/follow path.
pub const PROCESSING_ERROR_TEXT: &str =
    "申し訳ありません。処理中にエラーが発生しました。もう一度お試しください。";

// ── Inbound event model ─────────────────────────────────────────────

/// Webhook request body.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// One platform event. Unrecognized kinds decode to `Unknown` and are
/// ignored rather than crashed on.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebhookEvent {
    Follow {
        #[serde(rename = "replyToken")]
        reply_token: String,
        source: EventSource,
    },
    Postback {
        #[serde(rename = "replyToken")]
        reply_token: String,
        source: EventSource,
        postback: PostbackData,
    },
    Message {
        #[serde(rename = "replyToken")]
        reply_token: String,
        source: EventSource,
        message: MessageContent,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventSource {
    #[serde(rename = "userId", default)]
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostbackData {
    pub data: String,
}

/// Message payload, narrowed by its `type` tag. Only text is handled.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// An outbound reply keyed by the one-shot token of the event that
/// produced it.
#[derive(Debug)]
pub struct ReplyIntent {
    pub reply_token: String,
    pub messages: Vec<ReplyMessage>,
}

impl ReplyIntent {
    fn single(reply_token: String, message: ReplyMessage) -> Self {
        Self {
            reply_token,
            messages: vec![message],
        }
    }
}

// ── Metrics ─────────────────────────────────────────────────────────

/// Counters for batch-level observability. The webhook always acknowledges
/// with 200, so degraded AI/store availability is visible here and in the
/// logs rather than in HTTP statuses.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    events_processed: AtomicU64,
    fallback_replies: AtomicU64,
}

impl DispatchMetrics {
    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    pub fn fallback_replies(&self) -> u64 {
        self.fallback_replies.load(Ordering::Relaxed)
    }

    fn record_event(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_fallback(&self) {
        self.fallback_replies.fetch_add(1, Ordering::Relaxed);
    }
}

// ── Dispatcher ──────────────────────────────────────────────────────

/// Routes each inbound event to the diagnostic engine or the chat
/// transcript manager based on event kind and current mode, persisting the
/// state after every handled event.
pub struct Dispatcher {
    store: Arc<dyn StateStore>,
    provider: Arc<dyn ChatProvider>,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn StateStore>, provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            store,
            provider,
            metrics: Arc::new(DispatchMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Process a batch sequentially and collect the reply intents.
    ///
    /// Intents preserve per-user event order; delivery is the caller's
    /// concern.
    pub async fn dispatch(&self, events: Vec<WebhookEvent>) -> Vec<ReplyIntent> {
        let mut replies = Vec::new();

        for event in events {
            self.metrics.record_event();
            if let Some(intent) = self.handle_event(event).await {
                replies.push(intent);
            }
        }

        debug!(
            replies = replies.len(),
            fallbacks = self.metrics.fallback_replies(),
            "batch dispatched"
        );
        replies
    }

    async fn handle_event(&self, event: WebhookEvent) -> Option<ReplyIntent> {
        match event {
            WebhookEvent::Follow {
                reply_token,
                source,
            } => {
                let user_id = known_user(&source)?;
                info!(user_id, "user followed, starting diagnostic flow");
                let message = match self.handle_follow(user_id).await {
                    Ok(message) => message,
                    Err(e) => self.fallback(user_id, PROCESSING_ERROR_TEXT, &e),
                };
                Some(ReplyIntent::single(reply_token, message))
            }

            WebhookEvent::Postback {
                reply_token,
                source,
                postback,
            } => {
                let user_id = known_user(&source)?;
                debug!(user_id, data = %postback.data, "postback received");
                let message = match self.handle_postback(user_id, &postback.data).await {
                    Ok(message) => message,
                    Err(e) => self.fallback(user_id, PROCESSING_ERROR_TEXT, &e),
                };
                Some(ReplyIntent::single(reply_token, message))
            }

            WebhookEvent::Message {
                reply_token,
                source,
                message,
            } => {
                let user_id = known_user(&source)?;
                let MessageContent::Text { text } = message else {
                    debug!(user_id, "ignoring non-text message");
                    return None;
                };
                if text.is_empty() {
                    debug!(user_id, "ignoring empty message");
                    return None;
                }
                let message = match self.handle_text(user_id, &text).await {
                    Ok(message) => message,
                    Err(e) => self.fallback(user_id, UNAVAILABLE_TEXT, &e),
                };
                Some(ReplyIntent::single(reply_token, message))
            }

            WebhookEvent::Unknown => {
                debug!("ignoring unrecognized event kind");
                None
            }
        }
    }

    /// Follow (and restart command): force-reset to the start of the
    /// diagnostic flow and prompt the first question.
    async fn handle_follow(&self, user_id: &str) -> Result<ReplyMessage, Error> {
        let mut state = self.load_state(user_id).await;
        state.reset_diagnostic();
        self.persist(user_id, &mut state).await?;
        Ok(diagnostic::prompt_for_step(0))
    }

    /// Postbacks always go to the diagnostic engine — they are only emitted
    /// by diagnostic UI elements.
    async fn handle_postback(&self, user_id: &str, data: &str) -> Result<ReplyMessage, Error> {
        let mut state = self.load_state(user_id).await;
        let message = diagnostic::advance(&mut state, Some(data));
        self.persist(user_id, &mut state).await?;
        Ok(message)
    }

    async fn handle_text(&self, user_id: &str, text: &str) -> Result<ReplyMessage, Error> {
        if diagnostic::RESTART_COMMANDS.contains(&text) {
            info!(user_id, "restarting diagnostic flow by command");
            return self.handle_follow(user_id).await;
        }

        let mut state = self.load_state(user_id).await;
        match state.mode {
            Mode::Diagnostic => {
                // Typed free text instead of using a button: hand over to
                // chat mode with a guidance message, no AI call this turn.
                state.mode = Mode::Chat;
                self.persist(user_id, &mut state).await?;
                Ok(ReplyMessage::text(GUIDANCE_TEXT))
            }
            Mode::Chat => {
                match chat::respond(&mut state, text, self.provider.as_ref()).await {
                    Ok(reply) => {
                        self.persist(user_id, &mut state).await?;
                        Ok(ReplyMessage::text(reply))
                    }
                    Err(e) => {
                        // The unanswered user turn stays in the transcript.
                        if let Err(pe) = self.persist(user_id, &mut state).await {
                            error!(user_id, error = %pe, "failed to persist state after AI failure");
                        }
                        Err(e.into())
                    }
                }
            }
        }
    }

    /// Read failures degrade to the synthesized default state rather than
    /// failing the event.
    async fn load_state(&self, user_id: &str) -> ConversationState {
        match self.store.get(user_id).await {
            Ok(Some(state)) => state,
            Ok(None) => ConversationState::default(),
            Err(e) => {
                warn!(user_id, error = %e, "state read failed, starting from default");
                ConversationState::default()
            }
        }
    }

    async fn persist(&self, user_id: &str, state: &mut ConversationState) -> Result<(), Error> {
        state.last_activity = Utc::now();
        self.store.put(user_id, state).await?;
        Ok(())
    }

    fn fallback(&self, user_id: &str, text: &'static str, error: &Error) -> ReplyMessage {
        error!(user_id, error = %error, "event processing failed, sending fallback");
        self.metrics.record_fallback();
        ReplyMessage::text(text)
    }
}

fn known_user(source: &EventSource) -> Option<&str> {
    if source.user_id.is_empty() {
        warn!("event without userId, skipping");
        return None;
    }
    Some(&source.user_id)
}
