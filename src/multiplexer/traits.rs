//! Terminal multiplexer adapter (capability) — spec.md §6.
//!
//! All operations are best-effort: any failure returns an empty list or
//! `None`; `send_keys` is the one exception — its errors propagate to the
//! caller, which surfaces the partial-success text to the human (spec.md §7
//! taxonomy item 2).

use async_trait::async_trait;

/// One pane discovered by `list_panes`, filtered to panes whose running
/// command is the agent CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneInfo {
    pub session_name: String,
    pub window_index: u32,
    pub window_name: String,
    pub pane_index: u32,
    pub pane_id: String,
    pub pane_cwd: String,
    pub command: String,
}

#[async_trait]
pub trait MultiplexerAdapter: Send + Sync {
    /// List panes whose running command matches the agent CLI. Best-effort:
    /// any failure yields an empty vector.
    async fn list_panes(&self) -> Vec<PaneInfo>;

    /// Find the pane id whose working directory equals `cwd` exactly.
    async fn find_pane_for_cwd(&self, cwd: &str) -> Option<String>;

    /// Append `text` followed by Enter to the given pane. Errors propagate.
    async fn send_keys(&self, pane_id: &str, text: &str) -> Result<(), String>;

    /// Resolve a session label (the window name of the pane at `cwd`).
    async fn resolve_label(&self, cwd: &str) -> Option<String>;
}
