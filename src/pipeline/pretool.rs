//! Pre-tool pipeline — spec.md §4.8.1.

use crate::audit::AuditEntry;
use crate::rules::Action;
use crate::session::SessionState;

use super::escalation::escalate;
use super::types::{HookSpecificOutput, PreToolEvent, PreToolResponse};
use super::PipelineDeps;

fn action_lower(action: Action) -> &'static str {
    match action {
        Action::Deny => "deny",
        Action::Allow => "allow",
        Action::Escalate => "escalate",
    }
}

pub async fn handle(deps: &PipelineDeps, event: PreToolEvent) -> PreToolResponse {
    deps.sessions
        .ensure_registered(&event.session_id, &event.cwd, event.transcript_path.clone())
        .await;
    deps.sessions.update_tool_use(&event.session_id, &event.tool_name);
    deps.sessions.update_state(&event.session_id, SessionState::PermissionPending);

    let engine = deps.rules.load();
    let result = engine.evaluate(&event.tool_name, &event.tool_input);

    match result.action {
        Action::Allow => {
            deps.audit.record(&AuditEntry {
                session_id: event.session_id.clone(),
                tool_name: Some(event.tool_name.clone()),
                action: "allow".to_owned(),
                decided_by: "rule".to_owned(),
                reason: result.reason.clone(),
            });
            deps.sessions.update_state(&event.session_id, SessionState::Active);
            PreToolResponse {
                decision: None,
                reason: None,
                hook_specific_output: HookSpecificOutput {
                    hook_event_name: "PreToolUse",
                    permission_decision: "allow",
                    permission_decision_reason: Some(result.reason),
                },
            }
        }
        Action::Deny => {
            deps.audit.record(&AuditEntry {
                session_id: event.session_id.clone(),
                tool_name: Some(event.tool_name.clone()),
                action: "deny".to_owned(),
                decided_by: "rule".to_owned(),
                reason: result.reason.clone(),
            });
            deps.sessions.record_denial(&event.session_id);
            deps.sessions.update_state(&event.session_id, SessionState::Active);
            PreToolResponse {
                decision: Some("block"),
                reason: Some(result.reason.clone()),
                hook_specific_output: HookSpecificOutput {
                    hook_event_name: "PreToolUse",
                    permission_decision: "deny",
                    permission_decision_reason: Some(result.reason),
                },
            }
        }
        Action::Escalate => {
            let rules_context = match &result.rule {
                Some(name) => format!("Matched rule: {name} ({})", action_lower(result.action)),
                None => "No rule matched".to_owned(),
            };
            let outcome = escalate(
                deps,
                &event.tool_name,
                &event.tool_input,
                &event.session_id,
                &rules_context,
                &result.reason,
            )
            .await;

            deps.audit.record(&AuditEntry {
                session_id: event.session_id.clone(),
                tool_name: Some(event.tool_name.clone()),
                action: if outcome.allowed { "allow" } else { "deny" }.to_owned(),
                decided_by: outcome.decided_by.to_owned(),
                reason: outcome.reason.clone(),
            });
            if !outcome.allowed {
                deps.sessions.record_denial(&event.session_id);
            }
            deps.sessions.update_state(&event.session_id, SessionState::Active);

            PreToolResponse {
                decision: Some(if outcome.allowed { "approve" } else { "block" }),
                reason: Some(outcome.reason.clone()),
                hook_specific_output: HookSpecificOutput {
                    hook_event_name: "PreToolUse",
                    permission_decision: if outcome.allowed { "allow" } else { "deny" },
                    permission_decision_reason: Some(outcome.reason),
                },
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
