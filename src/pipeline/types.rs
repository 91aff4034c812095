//! Request/response shapes shared by the hook pipelines — spec.md §6.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct PreToolEvent {
    pub tool_name: String,
    pub tool_input: Value,
    pub session_id: String,
    pub cwd: String,
    pub transcript_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookSpecificOutput {
    #[serde(rename = "hookEventName")]
    pub hook_event_name: &'static str,
    #[serde(rename = "permissionDecision")]
    pub permission_decision: &'static str,
    #[serde(rename = "permissionDecisionReason", skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreToolResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "hookSpecificOutput")]
    pub hook_specific_output: HookSpecificOutput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopEvent {
    pub session_id: String,
    pub cwd: String,
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub stop_hook_active: bool,
    pub last_assistant_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct StopResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleEvent {
    pub session_id: String,
    pub cwd: Option<String>,
    pub transcript_path: Option<String>,
    pub message: Option<String>,
    pub title: Option<String>,
}
