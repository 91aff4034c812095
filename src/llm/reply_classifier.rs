//! Reply classifier (C6.2) — spec.md §4.6.2.

use std::sync::Arc;

use crate::audit::CostSink;

use super::client::{extract_first_json_object, LlmClient};
use super::types::ReplyEvaluation;

const MAX_OUTPUT_TOKENS: u32 = 512;
const PURPOSE: &str = "reply-eval";

const SYSTEM_PROMPT: &str = "You classify a human's free-text reply to a pending tool-approval \
request from a coding agent. Choose exactly one intent: \
`approve` (the human is agreeing to let the tool call proceed), \
`deny` (the human is refusing), \
`forward` (the human wants different text or a correction sent to the agent instead — extract it \
as forwardText), \
`add_policy` (the human is stating a standing instruction for future similar calls — extract it as \
policyText), or \
`add_rule` (the human is dictating a literal rule in YAML form — extract it as ruleYaml). \
Respond with a single JSON object: {\"intent\": string, \"forwardText\"?: string, \
\"policyText\"?: string, \"ruleYaml\"?: string}.";

pub struct ReplyClassifier {
    client: Arc<dyn LlmClient>,
    model: String,
    cost_sink: Option<Arc<CostSink>>,
}

impl ReplyClassifier {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client, model: "claude-haiku-4-5-20251001".to_owned(), cost_sink: None }
    }

    pub fn with_cost_sink(mut self, model: String, cost_sink: Arc<CostSink>) -> Self {
        self.model = model;
        self.cost_sink = Some(cost_sink);
        self
    }

    /// Classify a human's reply text. Any parsing/API error falls back to a
    /// permissive `approve` — spec.md §4.6.2: "the reply was typed by the
    /// authorised human".
    pub async fn classify(&self, text: &str, tool_name: &str, label: &str) -> ReplyEvaluation {
        let user_message =
            format!("Tool awaiting approval: {tool_name}\nSession label: {label}\nReply: {text}");

        match self
            .client
            .complete(SYSTEM_PROMPT, &user_message, MAX_OUTPUT_TOKENS)
            .await
        {
            Ok((response, usage)) => {
                if let Some(sink) = &self.cost_sink {
                    sink.record(PURPOSE, &self.model, &usage);
                }
                extract_first_json_object(&response).unwrap_or_else(ReplyEvaluation::permissive_fallback)
            }
            Err(_) => ReplyEvaluation::permissive_fallback(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
