//! Telegram chat adapter (feature `telegram`) — spec.md §6.
//!
//! Implements `ChatAdapter` for outbound sends and runs a long-poll loop that
//! feeds inbound button presses and text replies to an `ApprovalCoordinator`.
//! Messages from any chat id other than the configured one are dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, UpdateKind};

use crate::approval::coordinator::ApprovalCoordinator;
use crate::channels::traits::{ButtonEvent, ChatAdapter, InlineKeyboard, TextEvent};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
    #[serde(default = "default_polling_timeout")]
    pub polling_timeout_secs: u32,
}

fn default_polling_timeout() -> u32 {
    30
}

pub struct TelegramChatAdapter {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramChatAdapter {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            bot: Bot::new(&config.bot_token),
            chat_id: ChatId(config.chat_id),
        }
    }

    fn to_markup(keyboard: &InlineKeyboard) -> InlineKeyboardMarkup {
        let rows = keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        InlineKeyboardMarkup::new(rows)
    }
}

#[async_trait]
impl ChatAdapter for TelegramChatAdapter {
    async fn send_message(&self, text: &str, keyboard: Option<InlineKeyboard>) -> Result<String, String> {
        let parts = split_message(text);
        let last_index = parts.len().saturating_sub(1);
        let mut last_message_id = String::new();

        for (i, part) in parts.iter().enumerate() {
            let escaped = escape_markdown_v2(part);
            let mut request = self.bot.send_message(self.chat_id, escaped).parse_mode(ParseMode::MarkdownV2);
            if i == last_index {
                if let Some(keyboard) = &keyboard {
                    request = request.reply_markup(Self::to_markup(keyboard));
                }
            }
            let sent = request.await.map_err(|e| format!("telegram send error: {e}"))?;
            last_message_id = sent.id.0.to_string();
        }
        Ok(last_message_id)
    }

    async fn edit_message(&self, message_id: &str, text: &str) -> Result<(), String> {
        let id: i32 = message_id.parse().map_err(|_| format!("invalid message id '{message_id}'"))?;
        self.bot
            .edit_message_text(self.chat_id, teloxide::types::MessageId(id), escape_markdown_v2(text))
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .map_err(|e| format!("telegram edit error: {e}"))?;
        Ok(())
    }

    async fn answer_button(&self, callback_query_id: &str, text: &str) -> Result<(), String> {
        let mut request = self.bot.answer_callback_query(callback_query_id);
        if !text.is_empty() {
            request = request.text(text);
        }
        request.await.map_err(|e| format!("telegram answer error: {e}"))?;
        Ok(())
    }
}

/// Long-poll Telegram updates and route button presses / text replies to
/// `coordinator`. Reconnects with exponential back-off on transport errors.
pub async fn run_polling(config: TelegramConfig, coordinator: Arc<ApprovalCoordinator>) {
    let bot = Bot::new(&config.bot_token);
    let allowed_chat_id = config.chat_id;
    let mut attempt = 0u32;
    let mut offset: i32 = 0;

    loop {
        let result = bot.get_updates().offset(offset).timeout(config.polling_timeout_secs).await;

        match result {
            Ok(updates) => {
                attempt = 0;
                for update in updates {
                    offset = (update.id.0 as i32).saturating_add(1);
                    match update.kind {
                        UpdateKind::CallbackQuery(cb) => {
                            let Some(msg) = &cb.message else { continue };
                            if msg.chat().id.0 != allowed_chat_id {
                                continue;
                            }
                            let Some(data) = cb.data.clone() else { continue };
                            coordinator
                                .handle_button(ButtonEvent {
                                    callback_query_id: cb.id.clone(),
                                    callback_data: data,
                                    message_id: msg.id().0.to_string(),
                                })
                                .await;
                        }
                        UpdateKind::Message(msg) => {
                            if msg.chat.id.0 != allowed_chat_id {
                                continue;
                            }
                            if let Some(text) = msg.text() {
                                coordinator
                                    .handle_text(TextEvent {
                                        text: text.to_owned(),
                                        reply_to_message_id: msg
                                            .reply_to_message()
                                            .map(|m| m.id.0.to_string()),
                                    })
                                    .await;
                            }
                        }
                        _ => {}
                    }
                }
            }
            Err(e) => {
                tracing::warn!("telegram: polling error (attempt {attempt}): {e}");
                let backoff = reconnect_backoff(attempt);
                attempt = attempt.saturating_add(1);
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// Escape text for Telegram's MarkdownV2 parse mode.
pub fn escape_markdown_v2(text: &str) -> String {
    const RESERVED: &[char] = &[
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        if RESERVED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Split `text` into chunks of at most 4096 characters (Telegram's limit),
/// preferring paragraph, then line, then sentence, then word boundaries.
pub fn split_message(text: &str) -> Vec<String> {
    const MAX: usize = 4096;

    if text.len() <= MAX {
        return vec![text.to_owned()];
    }

    let mut parts = Vec::new();
    let mut remaining = text;

    while remaining.len() > MAX {
        let chunk = &remaining[..MAX];
        let split_at = find_split(chunk, "\n\n")
            .or_else(|| find_split(chunk, "\n"))
            .or_else(|| find_split(chunk, ". "))
            .or_else(|| find_split(chunk, " "))
            .unwrap_or(MAX);

        parts.push(remaining[..split_at].to_owned());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() {
        parts.push(remaining.to_owned());
    }

    parts
}

fn find_split(chunk: &str, delimiter: &str) -> Option<usize> {
    chunk.rfind(delimiter).map(|i| i + delimiter.len())
}

/// `min(2^attempt, 60)` seconds.
pub fn reconnect_backoff(attempt: u32) -> Duration {
    let secs = (1u64 << attempt.min(63)).min(60);
    Duration::from_secs(secs)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_markdown_v2_escapes_reserved_characters() {
        assert_eq!(escape_markdown_v2("a.b_c"), "a\\.b\\_c");
        assert_eq!(escape_markdown_v2("no reserved here"), "no reserved here");
    }

    #[test]
    fn split_message_leaves_short_text_untouched() {
        assert_eq!(split_message("hello"), vec!["hello".to_owned()]);
    }

    #[test]
    fn split_message_prefers_paragraph_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(4000), "b".repeat(200));
        let parts = split_message(&text);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with('a'));
    }

    #[test]
    fn split_message_hard_cuts_when_no_boundary_exists() {
        let text = "x".repeat(9000);
        let parts = split_message(&text);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 4096);
    }

    #[test]
    fn reconnect_backoff_doubles_until_the_cap() {
        assert_eq!(reconnect_backoff(0), Duration::from_secs(1));
        assert_eq!(reconnect_backoff(1), Duration::from_secs(2));
        assert_eq!(reconnect_backoff(6), Duration::from_secs(60));
        assert_eq!(reconnect_backoff(20), Duration::from_secs(60));
    }
}
