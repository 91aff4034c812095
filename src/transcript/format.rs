//! Human-readable formatters for inclusion in chat messages (spec.md §4.5).

use super::types::{Role, TranscriptExcerpt};

/// Render up to `max_messages` of the most recent messages as a short
/// human-readable block, newest last.
pub fn format_recent_activity(excerpt: &TranscriptExcerpt, max_messages: usize) -> String {
    if excerpt.messages.is_empty() {
        return "No recent activity.".to_owned();
    }
    let start = excerpt.messages.len().saturating_sub(max_messages);
    excerpt.messages[start..]
        .iter()
        .map(|m| {
            let who = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            let text = if m.text.is_empty() {
                "(no text)".to_owned()
            } else {
                m.text.clone()
            };
            format!("{who}: {text}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render up to `max_tools` of the most recently used tools, newest last.
pub fn extract_recent_tools(excerpt: &TranscriptExcerpt, max_tools: usize) -> Vec<String> {
    let mut tools: Vec<String> = excerpt
        .messages
        .iter()
        .flat_map(|m| &m.tool_uses)
        .map(|t| format!("{} ({})", t.name, t.input_summary))
        .collect();

    if tools.len() > max_tools {
        tools = tools.split_off(tools.len() - max_tools);
    }
    tools
}

// ─── Tests ───────────────────────────────────────────────────────────────────
