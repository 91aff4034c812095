//! Data model for the approval coordinator (C7) — spec.md §4.7.

use tokio::sync::oneshot;

/// Resolution handed back to whichever pipeline requested the approval.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalResolution {
    pub approved: bool,
    pub reason: String,
    pub policy_text: Option<String>,
}

impl ApprovalResolution {
    pub fn approved(reason: impl Into<String>) -> Self {
        Self { approved: true, reason: reason.into(), policy_text: None }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self { approved: false, reason: reason.into(), policy_text: None }
    }

    pub fn with_policy_text(mut self, text: impl Into<String>) -> Self {
        self.policy_text = Some(text.into());
        self
    }
}

/// True for a stop-decision request, false for a tool-approval request —
/// governs both the keyboard copy and whether text replies bypass the
/// reply classifier (spec.md §4.7.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalKind {
    ToolPermission,
    StopDecision,
}

pub struct PendingApproval {
    pub kind: ApprovalKind,
    pub tool_name: Option<String>,
    pub session_id: String,
    pub pane_id: Option<String>,
    pub message_id: Option<String>,
    pub resolver: Option<oneshot::Sender<ApprovalResolution>>,
}

/// What a reply-to message id resolves back to.
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub approval_id: u64,
    pub is_stop: bool,
    pub tool_name: Option<String>,
    pub label: String,
}
