//! Cerebras chat-completions provider.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::error::LlmError;
use crate::llm::ChatProvider;
use crate::state::{ChatRole, ChatTurn};

const API_URL: &str = "https://api.cerebras.ai/v1/chat/completions";
const PROVIDER: &str = "cerebras";

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.7;

/// Persona instruction prepended to every completion request. Markdown is
/// forbidden because LINE renders plain text; emoji carry the structure
/// instead.
pub const SYSTEM_PROMPT: &str = "あなたは親切で知識豊富なアシスタントです。日本語で回答してください。住宅や不動産に関する質問には特に詳しく答えてください。\n\n重要な注意事項：\n- マークダウン記法（**太字**、*斜体*、`コード`、#見出し、リストの- や1.など）は一切使用しないでください\n- 代わりに絵文字を積極的に使用して、読みやすく親しみやすい回答にしてください\n- 改行と適切な絵文字で情報を整理してください\n- 箇条書きが必要な場合は絵文字を使って視覚的に分かりやすくしてください（例：🏠 住宅情報、💰 費用について、など）";

/// Chat provider backed by the Cerebras cloud API.
pub struct CerebrasProvider {
    api_key: SecretString,
    model: String,
    client: reqwest::Client,
}

impl CerebrasProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    fn request_body(&self, history: &[ChatTurn]) -> Value {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(serde_json::json!({
            "role": "system",
            "content": SYSTEM_PROMPT,
        }));
        for turn in history {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            messages.push(serde_json::json!({
                "role": role,
                "content": turn.content,
            }));
        }

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        })
    }
}

#[async_trait]
impl ChatProvider for CerebrasProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, history: &[ChatTurn]) -> Result<String, LlmError> {
        tracing::debug!(model = %self.model, turns = history.len(), "calling Cerebras API");

        let resp = self
            .client
            .post(API_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(history))
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("completion returned {status}: {err}"),
            });
        }

        let data: Value = resp.json().await.map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;

        let content = data
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "no content in completion response".to_string(),
            })?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> CerebrasProvider {
        CerebrasProvider::new(SecretString::from("test-key"), "llama3.1-8b")
    }

    #[test]
    fn model_name_exposed() {
        assert_eq!(provider().model_name(), "llama3.1-8b");
    }

    #[test]
    fn request_body_prepends_system_persona() {
        let history = vec![
            ChatTurn::user("家賃補助について教えて"),
            ChatTurn::assistant("🏠 もちろんです"),
            ChatTurn::user("ありがとう"),
        ];
        let body = provider().request_body(&history);

        assert_eq!(body["model"], "llama3.1-8b");
        assert_eq!(body["max_tokens"], 500);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], SYSTEM_PROMPT);
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[3]["content"], "ありがとう");
    }

    #[test]
    fn request_body_empty_history_still_has_persona() {
        let body = provider().request_body(&[]);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "system");
    }
}
