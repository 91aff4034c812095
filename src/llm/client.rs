//! LLM client: a single-user-message, bounded-output-token call against the
//! Anthropic Messages API. Shared by the tool-call evaluator, the reply
//! classifier, and the transcript summariser — spec.md §9: "Two LLMs coexist
//! with identical model id. Keep the adapters distinct so one can be mocked
//! without the other."

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Token usage reported by a completed call, used for cost accounting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a single-user-message completion and return the first text
    /// block's content plus token usage.
    async fn complete(
        &self,
        system: &str,
        user_message: &str,
        max_tokens: u32,
    ) -> Result<(String, Usage), String>;
}

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// Construct from the `ANTHROPIC_API_KEY` environment variable
    /// (spec.md §6: "required for any LLM call").
    pub fn from_env(model: String) -> Result<Self, String> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| "ANTHROPIC_API_KEY is not set".to_owned())?;
        Ok(Self::new(api_key, model))
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<ResponseUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponseUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(
        &self,
        system: &str,
        user_message: &str,
        max_tokens: u32,
    ) -> Result<(String, Usage), String> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "system": system,
            "messages": [{ "role": "user", "content": user_message }],
        });

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("LLM request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(format!("LLM request returned {status}: {text}"));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| format!("LLM response was not valid JSON: {e}"))?;

        let text = parsed
            .content
            .into_iter()
            .find_map(|b| b.text)
            .ok_or_else(|| "LLM response contained no text block".to_owned())?;

        let usage = parsed
            .usage
            .map(|u| Usage { input_tokens: u.input_tokens, output_tokens: u.output_tokens })
            .unwrap_or_default();

        Ok((text, usage))
    }
}

/// Take the first `{ … }` in `text` with a non-greedy brace scan, matching
/// spec.md §4.6.1's extraction rule, and JSON-parse it.
pub fn extract_first_json_object<T: for<'de> Deserialize<'de>>(text: &str) -> Option<T> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return serde_json::from_str(&text[start..end]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Verdict {
        allowed: bool,
    }

    #[test]
    fn extracts_json_object_from_surrounding_prose() {
        let text = "Sure, here's my answer: {\"allowed\": true} -- hope that helps";
        let parsed: Verdict = extract_first_json_object(text).unwrap();
        assert!(parsed.allowed);
    }

    #[test]
    fn extracts_first_object_when_nested_braces_present() {
        let text = r#"{"allowed": false, "nested": {"a": 1}} trailing"#;
        let parsed: Verdict = extract_first_json_object(text).unwrap();
        assert!(!parsed.allowed);
    }

    #[test]
    fn returns_none_when_no_braces() {
        let parsed: Option<Verdict> = extract_first_json_object("no json here");
        assert!(parsed.is_none());
    }

    #[test]
    fn returns_none_on_unbalanced_braces() {
        let parsed: Option<Verdict> = extract_first_json_object("{\"allowed\": true");
        assert!(parsed.is_none());
    }
}
