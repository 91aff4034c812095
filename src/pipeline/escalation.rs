//! Escalation handler — spec.md §4.8.1 step 5.
//!
//! Shared by the pre-tool pipeline: asks the LLM evaluator first; anything
//! short of a confident allow always goes to a human (or a hard deny when no
//! chat channel is configured).

use serde_json::Value;

use super::PipelineDeps;

pub struct EscalationOutcome {
    pub allowed: bool,
    pub decided_by: &'static str,
    pub reason: String,
}

pub async fn escalate(
    deps: &PipelineDeps,
    tool_name: &str,
    tool_input: &Value,
    session_id: &str,
    rules_context: &str,
    escalation_reason: &str,
) -> EscalationOutcome {
    let policies_text = deps.policies.format_for_prompt(tool_name);
    let verdict = deps
        .evaluator
        .evaluate(tool_name, tool_input, rules_context, escalation_reason, &policies_text)
        .await;

    if verdict.confident && verdict.allowed {
        return EscalationOutcome {
            allowed: true,
            decided_by: "llm",
            reason: format!("LLM: {}", verdict.reason),
        };
    }

    let Some(coordinator) = &deps.coordinator else {
        return EscalationOutcome {
            allowed: false,
            decided_by: "timeout",
            reason: "LLM uncertain and no Telegram available".to_owned(),
        };
    };

    let label = deps.sessions.get_label(session_id).unwrap_or_else(|| session_id.to_owned());
    let pane_id = deps.sessions.get_pane_id(session_id);
    let text = format!(
        "Tool call awaiting approval\nSession: {label}\nTool: {tool_name}\nInput: {tool_input}\n\
         Reason: {}",
        verdict.reason
    );

    let resolution = coordinator.request_approval(tool_name, session_id, &label, pane_id, &text).await;

    if let Some(policy_text) = &resolution.policy_text {
        deps.policies.add(policy_text.clone(), Some(tool_name.to_owned()));
    }

    let decided_by = if resolution.reason.contains("timed out") { "timeout" } else { "telegram" };
    EscalationOutcome { allowed: resolution.approved, decided_by, reason: resolution.reason }
}
