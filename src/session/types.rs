//! Data model for the session registry (C4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Idle,
    PermissionPending,
}

/// One entry in the session registry. See spec.md §3 for field invariants:
/// `label` is set once at first registration; `transcript_path` is set the
/// first time a hook provides it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub cwd: String,
    pub started_at: DateTime<Utc>,
    pub state: SessionState,
    pub last_tool_name: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub denial_count: u32,
    pub label: String,
    pub pane_id: Option<String>,
    pub transcript_path: Option<String>,
}

impl SessionInfo {
    pub fn is_synthetic(&self) -> bool {
        self.session_id.starts_with("tmux_")
    }
}

/// `sessionId` for a session synthesised from a multiplexer scan, before any
/// hook has arrived for it.
pub fn synthetic_session_id(pane_id: &str) -> String {
    format!("tmux_{pane_id}")
}
