//! Transcript summariser (C5) — spec.md §4.5.
//!
//! Single LLM call producing a 3–5 sentence summary covering goal, progress,
//! and status. Per-message text is truncated to 600 chars; the aggregate
//! prompt is capped at 8000 chars; max 300 output tokens.

use std::sync::Arc;

use crate::llm::client::LlmClient;

use super::types::TranscriptExcerpt;

const PER_MESSAGE_TRUNCATE: usize = 600;
const AGGREGATE_CAP: usize = 8000;
const MAX_OUTPUT_TOKENS: u32 = 300;
const EMPTY_EXCERPT_MESSAGE: &str = "No transcript messages available.";

const SYSTEM_PROMPT: &str = "Summarise a coding agent's recent transcript in 3 to 5 sentences, \
covering what the user's goal appears to be, what progress has been made, and the current status.";

pub struct TranscriptSummarizer {
    client: Arc<dyn LlmClient>,
}

impl TranscriptSummarizer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Summarise `excerpt`. An empty excerpt short-circuits without calling
    /// the LLM. LLM failure propagates — callers (the stop pipeline) must
    /// degrade gracefully (spec.md §4.5, §7 taxonomy item 4).
    pub async fn summarize(&self, excerpt: &TranscriptExcerpt) -> Result<String, String> {
        if excerpt.messages.is_empty() {
            return Ok(EMPTY_EXCERPT_MESSAGE.to_owned());
        }

        let user_message = build_prompt(excerpt);
        let (summary, _usage) = self
            .client
            .complete(SYSTEM_PROMPT, &user_message, MAX_OUTPUT_TOKENS)
            .await?;
        Ok(summary)
    }
}

fn build_prompt(excerpt: &TranscriptExcerpt) -> String {
    let mut prompt = String::new();
    for message in &excerpt.messages {
        let who = match message.role {
            super::types::Role::User => "User",
            super::types::Role::Assistant => "Assistant",
        };
        let text = truncate(&message.text, PER_MESSAGE_TRUNCATE);
        let line = format!("{who}: {text}\n");
        if prompt.len() + line.len() > AGGREGATE_CAP {
            break;
        }
        prompt.push_str(&line);
    }
    prompt
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_owned()
    } else {
        s.chars().take(max).collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::Usage;
    use crate::transcript::types::{Role, TranscriptMessage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeClient {
        response: Mutex<Result<String, String>>,
        last_user_message: Mutex<String>,
    }

    #[async_trait]
    impl LlmClient for FakeClient {
        async fn complete(
            &self,
            _system: &str,
            user_message: &str,
            _max_tokens: u32,
        ) -> Result<(String, Usage), String> {
            *self.last_user_message.lock().unwrap() = user_message.to_owned();
            self.response.lock().unwrap().clone().map(|t| (t, Usage::default()))
        }
    }

    fn fake(response: Result<String, String>) -> Arc<FakeClient> {
        Arc::new(FakeClient {
            response: Mutex::new(response),
            last_user_message: Mutex::new(String::new()),
        })
    }

    #[tokio::test]
    async fn empty_excerpt_skips_the_llm_call() {
        let client = fake(Ok("unused".to_owned()));
        let summarizer = TranscriptSummarizer::new(client.clone());
        let summary = summarizer.summarize(&TranscriptExcerpt::default()).await.unwrap();
        assert_eq!(summary, EMPTY_EXCERPT_MESSAGE);
        assert!(client.last_user_message.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_empty_excerpt_calls_the_llm_and_returns_its_text() {
        let client = fake(Ok("Goal: fix bug. Progress: done. Status: complete.".to_owned()));
        let summarizer = TranscriptSummarizer::new(client);
        let excerpt = TranscriptExcerpt {
            messages: vec![TranscriptMessage {
                role: Role::User,
                text: "fix the bug".to_owned(),
                tool_uses: vec![],
            }],
            total_messages: 1,
        };
        let summary = summarizer.summarize(&excerpt).await.unwrap();
        assert!(summary.starts_with("Goal:"));
    }

    #[tokio::test]
    async fn llm_failure_propagates() {
        let client = fake(Err("network down".to_owned()));
        let summarizer = TranscriptSummarizer::new(client);
        let excerpt = TranscriptExcerpt {
            messages: vec![TranscriptMessage { role: Role::User, text: "x".into(), tool_uses: vec![] }],
            total_messages: 1,
        };
        assert!(summarizer.summarize(&excerpt).await.is_err());
    }

    #[test]
    fn build_prompt_truncates_long_messages() {
        let excerpt = TranscriptExcerpt {
            messages: vec![TranscriptMessage {
                role: Role::User,
                text: "x".repeat(1000),
                tool_uses: vec![],
            }],
            total_messages: 1,
        };
        let prompt = build_prompt(&excerpt);
        // "User: " (6) + 600 x's + "\n" (1)
        assert_eq!(prompt.len(), 6 + PER_MESSAGE_TRUNCATE + 1);
    }
}
