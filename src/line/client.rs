//! LINE Messaging API client — delivers reply intents.

use secrecy::{ExposeSecret, SecretString};

use crate::error::LineError;
use crate::line::messages::ReplyMessage;

const DEFAULT_BASE_URL: &str = "https://api.line.me/v2/bot";

/// Client for the LINE Messaging API reply endpoint.
pub struct LineClient {
    access_token: SecretString,
    base_url: String,
    client: reqwest::Client,
}

impl LineClient {
    pub fn new(access_token: SecretString) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    /// Client against a non-default API host (tests point this at a local
    /// listener).
    pub fn with_base_url(access_token: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            access_token,
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// Send reply messages for a one-shot reply token.
    ///
    /// The token is tied to the inbound event that produced it and can be
    /// used once; a failed send is not retried here.
    pub async fn reply(
        &self,
        reply_token: &str,
        messages: &[ReplyMessage],
    ) -> Result<(), LineError> {
        let body = serde_json::json!({
            "replyToken": reply_token,
            "messages": messages,
        });

        let resp = self
            .client
            .post(self.api_url("message/reply"))
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LineError::SendFailed {
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(LineError::SendFailed {
                reason: format!("reply returned {status}: {err}"),
            });
        }

        tracing::debug!(reply_token, count = messages.len(), "reply delivered");
        Ok(())
    }
}
