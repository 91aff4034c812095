//! Stop pipeline (state machine) — spec.md §4.8.2.
//!
//! States S0 precheck, S1 retry?, S2 analyse+escalate, S3 done are folded
//! into one function; each early `return` below is a state transition to
//! S3 with its response already decided.

use regex::Regex;
use std::sync::LazyLock;

use super::types::{StopEvent, StopResponse};
use super::PipelineDeps;

static ERROR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)error|failed|cannot|unable|exception|traceback").unwrap());
static SUCCESS_ANTI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)successfully|completed|fixed|resolved").unwrap());

const TRANSCRIPT_TAIL: usize = 15;

pub async fn handle(deps: &PipelineDeps, event: StopEvent) -> StopResponse {
    // S0: precheck.
    deps.sessions
        .ensure_registered(&event.session_id, &event.cwd, event.transcript_path.clone())
        .await;

    if event.stop_hook_active {
        return StopResponse::default();
    }
    let Some(last_message) = &event.last_assistant_message else {
        return StopResponse::default();
    };

    // S1: retry on error heuristic.
    let looks_like_error = ERROR_PATTERN.is_match(last_message) && !SUCCESS_ANTI_PATTERN.is_match(last_message);
    if looks_like_error && deps.stop_config.retry_on_error {
        let retries = deps.retry_count(&event.session_id);
        if retries < deps.stop_config.max_retries {
            deps.increment_retry(&event.session_id);
            return StopResponse {
                decision: Some("block"),
                reason: Some(
                    "The previous approach hit an error. Try a different approach to accomplish the task."
                        .to_owned(),
                ),
            };
        }
        deps.clear_retry(&event.session_id);
    }

    // S2: analyse + escalate.
    if deps.stop_config.escalate_to_telegram {
        if let Some(coordinator) = &deps.coordinator {
            let transcript_path = deps.sessions.get_transcript_path(&event.session_id);
            let excerpt = match &transcript_path {
                Some(path) => crate::transcript::read_transcript(path, Some(TRANSCRIPT_TAIL)),
                None => Default::default(),
            };
            let recent_tools = crate::transcript::extract_recent_tools(&excerpt, 6);
            let summary = deps.summarizer.summarize(&excerpt).await.unwrap_or_else(|e| format!("(summary unavailable: {e})"));

            let label = deps.sessions.get_label(&event.session_id).unwrap_or_else(|| event.session_id.clone());
            let pane_id = deps.sessions.get_pane_id(&event.session_id);
            let text = format!(
                "Agent stopped\nSession: {label}\nLast message: {last_message}\n\
                 Summary: {summary}\nRecent tools: {}",
                recent_tools.join(", ")
            );

            let resolution = coordinator.request_stop_decision(&event.session_id, &label, pane_id, &text).await;

            if resolution.approved {
                return match &resolution.policy_text {
                    Some(policy_text) => StopResponse {
                        decision: Some("block"),
                        reason: Some(format!("The user answered your question: {policy_text}")),
                    },
                    None => StopResponse {
                        decision: Some("block"),
                        reason: Some("The user wants you to continue with the task.".to_owned()),
                    },
                };
            }
            return StopResponse::default();
        }
    }

    // Fallback: no coordinator configured.
    deps.clear_retry(&event.session_id);
    StopResponse::default()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
