//! Chat adapter (capability) — spec.md §6.
//!
//! The core only ever talks to this trait; today the one implementation is
//! Telegram (`telegram.rs`, feature `telegram`), but nothing here names
//! Telegram so a second transport could be dropped in later.

use async_trait::async_trait;

/// One button in an inline keyboard row. `data` is the opaque callback
/// payload echoed back on press, e.g. `"approve:42"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub data: String,
}

pub type InlineKeyboard = Vec<Vec<InlineButton>>;

/// A button press routed back from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonEvent {
    pub callback_query_id: String,
    pub callback_data: String,
    pub message_id: String,
}

/// A free-text message routed back from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub text: String,
    /// The message id this text was sent in reply to, if any.
    pub reply_to_message_id: Option<String>,
}

#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Send a message, optionally with an inline keyboard. Returns the
    /// transport's message id.
    async fn send_message(&self, text: &str, keyboard: Option<InlineKeyboard>) -> Result<String, String>;

    /// Edit a previously sent message's text in place.
    async fn edit_message(&self, message_id: &str, text: &str) -> Result<(), String>;

    /// Acknowledge a button press, optionally with a transient toast `text`.
    async fn answer_button(&self, callback_query_id: &str, text: &str) -> Result<(), String>;
}
