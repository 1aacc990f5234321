//! LINE Messaging API integration — outbound message model, reply client,
//! and webhook signature validation.

pub mod client;
pub mod messages;
pub mod signature;

pub use client::LineClient;
pub use messages::{PostbackAction, QuickReply, QuickReplyItem, ReplyMessage};
