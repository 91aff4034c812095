//! Tool-call evaluator (C6.1) — spec.md §4.6.1.

use std::sync::Arc;

use crate::audit::CostSink;

use super::client::{extract_first_json_object, LlmClient};
use super::types::EvaluatorVerdict;

const MAX_OUTPUT_TOKENS: u32 = 256;
const PURPOSE: &str = "tool-eval";

const SYSTEM_PROMPT: &str = "You evaluate whether a coding agent's tool call should be allowed to \
proceed without human review. Read-only operations are generally safe. Edits under the project \
source tree are generally safe. Commands that modify system state outside the project, install \
software, or touch credentials are cautious. Human-defined policies take precedence over your own \
judgement. When in doubt, set confident to false. Respond with a single JSON object: \
{\"allowed\": bool, \"confident\": bool, \"reason\": string}.";

pub struct ToolCallEvaluator {
    client: Arc<dyn LlmClient>,
    model: String,
    cost_sink: Option<Arc<CostSink>>,
}

impl ToolCallEvaluator {
    pub fn new(client: Arc<dyn LlmClient>, model: String, cost_sink: Option<Arc<CostSink>>) -> Self {
        Self { client, model, cost_sink }
    }

    /// Evaluate one escalated tool call. Never returns an `Err` variant to
    /// the caller — any failure is folded into a non-confident, non-allowed
    /// verdict so the pre-tool pipeline always escalates further
    /// (spec.md P5, §7 taxonomy item 3).
    pub async fn evaluate(
        &self,
        tool_name: &str,
        tool_input: &serde_json::Value,
        rules_context: &str,
        escalation_reason: &str,
        policies_text: &str,
    ) -> EvaluatorVerdict {
        let user_message = format!(
            "Tool: {tool_name}\nInput: {tool_input}\nRule evaluation: {rules_context}\n\
             Escalation reason: {escalation_reason}\n{policies_text}"
        );

        match self
            .client
            .complete(SYSTEM_PROMPT, &user_message, MAX_OUTPUT_TOKENS)
            .await
        {
            Ok((text, usage)) => {
                if let Some(sink) = &self.cost_sink {
                    sink.record(PURPOSE, &self.model, &usage);
                }
                extract_first_json_object(&text).unwrap_or_else(EvaluatorVerdict::unparseable)
            }
            Err(e) => EvaluatorVerdict::error(e),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
