//! Outbound message objects for the LINE reply API.
//!
//! Three shapes are used: plain text, text with a quick-reply row of
//! postback buttons, and a flex bubble for the diagnostic result card.

use serde::Serialize;

/// A single message object in a reply payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReplyMessage {
    Text {
        text: String,
        #[serde(rename = "quickReply", skip_serializing_if = "Option::is_none")]
        quick_reply: Option<QuickReply>,
    },
    Flex {
        #[serde(rename = "altText")]
        alt_text: String,
        contents: serde_json::Value,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct QuickReply {
    pub items: Vec<QuickReplyItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuickReplyItem {
    #[serde(rename = "type")]
    pub item_type: &'static str,
    pub action: PostbackAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostbackAction {
    #[serde(rename = "type")]
    pub action_type: &'static str,
    pub label: String,
    pub data: String,
}

impl ReplyMessage {
    /// Plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            quick_reply: None,
        }
    }

    /// Text message with a row of postback quick-reply buttons, one per
    /// `(label, data)` pair.
    pub fn quick_reply(text: impl Into<String>, options: &[(&str, &str)]) -> Self {
        let items = options
            .iter()
            .map(|(label, data)| QuickReplyItem {
                item_type: "action",
                action: PostbackAction {
                    action_type: "postback",
                    label: (*label).to_string(),
                    data: (*data).to_string(),
                },
            })
            .collect();

        Self::Text {
            text: text.into(),
            quick_reply: Some(QuickReply { items }),
        }
    }

    /// Flex message with prebuilt bubble contents.
    pub fn flex(alt_text: impl Into<String>, contents: serde_json::Value) -> Self {
        Self::Flex {
            alt_text: alt_text.into(),
            contents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_message_shape() {
        let json = serde_json::to_value(ReplyMessage::text("hello")).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hello");
        assert!(json.get("quickReply").is_none());
    }

    #[test]
    fn quick_reply_shape() {
        let msg = ReplyMessage::quick_reply(
            "question?",
            &[("はい", "subsidy_yes"), ("いいえ", "subsidy_no")],
        );
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "text");
        let items = json["quickReply"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["type"], "action");
        assert_eq!(items[0]["action"]["type"], "postback");
        assert_eq!(items[0]["action"]["label"], "はい");
        assert_eq!(items[0]["action"]["data"], "subsidy_yes");
        assert_eq!(items[1]["action"]["data"], "subsidy_no");
    }

    #[test]
    fn flex_message_shape() {
        let msg = ReplyMessage::flex("診断結果", serde_json::json!({"type": "bubble"}));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "flex");
        assert_eq!(json["altText"], "診断結果");
        assert_eq!(json["contents"]["type"], "bubble");
    }
}
