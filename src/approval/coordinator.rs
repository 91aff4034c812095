//! Approval coordinator (C7) — spec.md §4.7.
//!
//! A promise-per-request broker: every outgoing chat message that asks a
//! human for a decision gets a `oneshot` sender stashed in `pending`, keyed
//! by a monotonic `approvalId`; the matching inbound button press or text
//! reply fulfils it. No state survives process restart (spec.md §4.7.3).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;

use crate::channels::traits::{ButtonEvent, ChatAdapter, InlineButton, InlineKeyboard, TextEvent};
use crate::llm::reply_classifier::ReplyClassifier;
use crate::llm::types::ReplyIntent;
use crate::multiplexer::traits::MultiplexerAdapter;
use crate::session::SessionRegistry;
use crate::transcript::{extract_recent_tools, format_recent_activity, read_transcript, TranscriptSummarizer};

use super::types::{ApprovalKind, ApprovalResolution, MessageContext, PendingApproval};

const DETAILS_TAIL: usize = 15;

pub struct ApprovalCoordinator {
    chat: Arc<dyn ChatAdapter>,
    sessions: Arc<SessionRegistry>,
    multiplexer: Option<Arc<dyn MultiplexerAdapter>>,
    reply_classifier: Arc<ReplyClassifier>,
    summarizer: Arc<TranscriptSummarizer>,
    rules_path: PathBuf,
    timeout_ms: u64,
    next_id: Mutex<u64>,
    pending: Mutex<HashMap<u64, PendingApproval>>,
    message_context: Mutex<HashMap<String, MessageContext>>,
}

impl ApprovalCoordinator {
    pub fn new(
        chat: Arc<dyn ChatAdapter>,
        sessions: Arc<SessionRegistry>,
        multiplexer: Option<Arc<dyn MultiplexerAdapter>>,
        reply_classifier: Arc<ReplyClassifier>,
        summarizer: Arc<TranscriptSummarizer>,
        rules_path: PathBuf,
        timeout_ms: u64,
    ) -> Self {
        Self {
            chat,
            sessions,
            multiplexer,
            reply_classifier,
            summarizer,
            rules_path,
            timeout_ms,
            next_id: Mutex::new(0),
            pending: Mutex::new(HashMap::new()),
            message_context: Mutex::new(HashMap::new()),
        }
    }

    fn pending_lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, PendingApproval>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn context_lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MessageContext>> {
        self.message_context.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn allocate_id(&self) -> u64 {
        let mut next_id = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
        let id = *next_id;
        *next_id += 1;
        id
    }

    /// Request a tool-permission decision. Returns once a human responds, an
    /// `add_rule`/`add_policy` side effect completes, or the timeout fires.
    pub async fn request_approval(
        &self,
        tool_name: &str,
        session_id: &str,
        label: &str,
        pane_id: Option<String>,
        text: &str,
    ) -> ApprovalResolution {
        let keyboard = vec![vec![
            InlineButton { label: "Approve".to_owned(), data: String::new() },
            InlineButton { label: "Deny".to_owned(), data: String::new() },
            InlineButton { label: "Details".to_owned(), data: String::new() },
        ]];
        self.send_and_await(
            ApprovalKind::ToolPermission,
            Some(tool_name.to_owned()),
            session_id,
            label,
            pane_id,
            text,
            keyboard,
            "approve",
            "deny",
        )
        .await
    }

    /// Request a stop decision. Shape mirrors `request_approval`; button
    /// copy is Continue/Let stop instead of Approve/Deny.
    pub async fn request_stop_decision(
        &self,
        session_id: &str,
        label: &str,
        pane_id: Option<String>,
        text: &str,
    ) -> ApprovalResolution {
        let keyboard = vec![vec![
            InlineButton { label: "Continue".to_owned(), data: String::new() },
            InlineButton { label: "Let stop".to_owned(), data: String::new() },
        ]];
        self.send_and_await(
            ApprovalKind::StopDecision,
            None,
            session_id,
            label,
            pane_id,
            text,
            keyboard,
            "continue",
            "let-stop",
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_and_await(
        &self,
        kind: ApprovalKind,
        tool_name: Option<String>,
        session_id: &str,
        label: &str,
        pane_id: Option<String>,
        text: &str,
        mut keyboard: InlineKeyboard,
        approve_action: &str,
        deny_action: &str,
    ) -> ApprovalResolution {
        let id = self.allocate_id();
        for button in keyboard[0].iter_mut() {
            let action = if button.label == "Approve" || button.label == "Continue" {
                approve_action
            } else if button.label == "Deny" || button.label == "Let stop" {
                deny_action
            } else {
                "details"
            };
            button.data = format!("{action}:{id}");
        }

        let (tx, rx) = oneshot::channel();
        self.pending_lock().insert(
            id,
            PendingApproval {
                kind,
                tool_name: tool_name.clone(),
                session_id: session_id.to_owned(),
                pane_id,
                message_id: None,
                resolver: Some(tx),
            },
        );

        let message_id = match self.chat.send_message(text, Some(keyboard)).await {
            Ok(id) => id,
            Err(e) => {
                self.pending_lock().remove(&id);
                return ApprovalResolution::denied(format!("Telegram send failed: {e}"));
            }
        };

        if let Some(entry) = self.pending_lock().get_mut(&id) {
            entry.message_id = Some(message_id.clone());
        }
        self.context_lock().insert(
            message_id,
            MessageContext {
                approval_id: id,
                is_stop: kind == ApprovalKind::StopDecision,
                tool_name,
                label: label.to_owned(),
            },
        );

        match tokio::time::timeout(Duration::from_millis(self.timeout_ms), rx).await {
            Ok(Ok(resolution)) => resolution,
            _ => self.expire(id).await,
        }
    }

    async fn expire(&self, id: u64) -> ApprovalResolution {
        let entry = self.pending_lock().remove(&id);
        if let Some(entry) = &entry {
            if let Some(message_id) = &entry.message_id {
                self.context_lock().remove(message_id);
            }
            let _ = self.chat.send_message("⏰ timed out (denied)", None).await;
        }
        ApprovalResolution::denied("Telegram approval timed out")
    }

    fn resolve(&self, id: u64, resolution: ApprovalResolution) {
        let entry = self.pending_lock().remove(&id);
        if let Some(entry) = entry {
            if let Some(message_id) = &entry.message_id {
                self.context_lock().remove(message_id);
            }
            if let Some(resolver) = entry.resolver {
                let _ = resolver.send(resolution);
            }
        }
    }

    /// Dispatch an inbound button press.
    pub async fn handle_button(&self, event: ButtonEvent) {
        let Some((action, id)) = event.callback_data.rsplit_once(':').and_then(|(a, i)| {
            i.parse::<u64>().ok().map(|id| (a.to_owned(), id))
        }) else {
            return;
        };

        let exists = self.pending_lock().contains_key(&id);
        if !exists {
            let _ = self.chat.answer_button(&event.callback_query_id, "expired").await;
            return;
        }

        match action.as_str() {
            "approve" | "continue" => {
                let _ = self.chat.answer_button(&event.callback_query_id, "").await;
                let now = Utc::now().format("%H:%M:%S");
                let _ = self.chat.edit_message(&event.message_id, &format!("✅ Approved at {now}")).await;
                self.resolve(id, ApprovalResolution::approved("Approved via Telegram"));
            }
            "deny" | "let-stop" => {
                let _ = self.chat.answer_button(&event.callback_query_id, "").await;
                let now = Utc::now().format("%H:%M:%S");
                let _ = self.chat.edit_message(&event.message_id, &format!("❌ Denied at {now}")).await;
                self.resolve(id, ApprovalResolution::denied("Denied via Telegram"));
            }
            "details" => {
                let _ = self.chat.answer_button(&event.callback_query_id, "").await;
                self.send_details(id).await;
            }
            _ => {}
        }
    }

    /// Non-resolving: send a transcript summary as a reply to the original
    /// message. The pending approval stays open (spec.md §4.7.2).
    async fn send_details(&self, id: u64) {
        let session_id = match self.pending_lock().get(&id) {
            Some(entry) => entry.session_id.clone(),
            None => return,
        };
        let transcript_path = self.sessions.get_transcript_path(&session_id);
        let excerpt = match transcript_path {
            Some(path) => read_transcript(&path, Some(DETAILS_TAIL)),
            None => Default::default(),
        };
        let summary = self
            .summarizer
            .summarize(&excerpt)
            .await
            .unwrap_or_else(|e| format!("(summary unavailable: {e})"));
        let activity = format_recent_activity(&excerpt, 5);
        let _ = self
            .chat
            .send_message(&format!("{summary}\n\n{activity}"), None)
            .await;
    }

    /// Dispatch an inbound text reply. Ignored unless it replies to a
    /// message we're tracking in `messageContext`.
    pub async fn handle_text(&self, event: TextEvent) {
        let Some(reply_to) = &event.reply_to_message_id else { return };
        let ctx = match self.context_lock().get(reply_to).cloned() {
            Some(ctx) => ctx,
            None => return,
        };

        if ctx.is_stop {
            self.inject_into_pane(ctx.approval_id, &event.text).await;
            self.resolve(
                ctx.approval_id,
                ApprovalResolution::approved("User replied to agent question")
                    .with_policy_text(event.text.clone()),
            );
            return;
        }

        let tool_name = ctx.tool_name.clone().unwrap_or_default();
        let evaluation = self.reply_classifier.classify(&event.text, &tool_name, &ctx.label).await;

        match evaluation.intent {
            Some(ReplyIntent::Approve) | None => {
                self.resolve(ctx.approval_id, ApprovalResolution::approved("Approved via Telegram"));
            }
            Some(ReplyIntent::Deny) => {
                self.resolve(
                    ctx.approval_id,
                    ApprovalResolution::denied(format!("Denied via Telegram: {}", event.text)),
                );
            }
            Some(ReplyIntent::Forward) => {
                let forward_text = evaluation.forward_text.unwrap_or_else(|| event.text.clone());
                self.inject_into_pane(ctx.approval_id, &forward_text).await;
                self.resolve(ctx.approval_id, ApprovalResolution::approved("Approved via Telegram"));
            }
            Some(ReplyIntent::AddPolicy) => {
                let policy_text = evaluation.policy_text.unwrap_or_else(|| event.text.clone());
                self.resolve(
                    ctx.approval_id,
                    ApprovalResolution::approved("Approved via Telegram").with_policy_text(policy_text),
                );
            }
            Some(ReplyIntent::AddRule) => {
                if let Some(yaml) = evaluation.rule_yaml {
                    let _ = self.append_rule(&yaml);
                }
                self.resolve(ctx.approval_id, ApprovalResolution::approved("Approved via Telegram"));
            }
        }
    }

    async fn inject_into_pane(&self, approval_id: u64, text: &str) {
        let pane_id = self.pending_lock().get(&approval_id).and_then(|e| e.pane_id.clone());
        if let (Some(mux), Some(pane_id)) = (&self.multiplexer, pane_id) {
            let _ = mux.send_keys(&pane_id, text).await;
        }
    }

    fn append_rule(&self, yaml_snippet: &str) -> Result<(), String> {
        let mut existing = std::fs::read_to_string(&self.rules_path).unwrap_or_default();
        if !existing.ends_with('\n') && !existing.is_empty() {
            existing.push('\n');
        }
        existing.push_str(yaml_snippet);
        if !existing.ends_with('\n') {
            existing.push('\n');
        }
        let tmp_path = self.rules_path.with_extension("yaml.tmp");
        std::fs::write(&tmp_path, existing).map_err(|e| e.to_string())?;
        std::fs::rename(&tmp_path, &self.rules_path).map_err(|e| e.to_string())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::{LlmClient, Usage};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FakeChat {
        sent: Mutex<Vec<String>>,
        fail_send: bool,
    }

    #[async_trait]
    impl ChatAdapter for FakeChat {
        async fn send_message(&self, text: &str, _keyboard: Option<InlineKeyboard>) -> Result<String, String> {
            if self.fail_send {
                return Err("network down".to_owned());
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(text.to_owned());
            Ok(format!("msg-{}", sent.len()))
        }

        async fn edit_message(&self, _message_id: &str, _text: &str) -> Result<(), String> {
            Ok(())
        }

        async fn answer_button(&self, _callback_query_id: &str, _text: &str) -> Result<(), String> {
            Ok(())
        }
    }

    struct FakeLlm;

    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn complete(&self, _s: &str, _u: &str, _m: u32) -> Result<(String, Usage), String> {
            Ok((r#"{"intent":"approve"}"#.to_owned(), Usage::default()))
        }
    }

    fn coordinator(chat: Arc<dyn ChatAdapter>, rules_path: PathBuf) -> ApprovalCoordinator {
        let sessions = Arc::new(SessionRegistry::new(None));
        let client: Arc<dyn LlmClient> = Arc::new(FakeLlm);
        ApprovalCoordinator::new(
            chat,
            sessions,
            None,
            Arc::new(ReplyClassifier::new(client.clone())),
            Arc::new(TranscriptSummarizer::new(client)),
            rules_path,
            50,
        )
    }

    #[tokio::test]
    async fn send_failure_resolves_denied_without_leaving_pending_state() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(FakeChat { sent: Mutex::new(vec![]), fail_send: true });
        let coord = coordinator(chat, dir.path().join("rules.yaml"));
        let resolution = coord.request_approval("Bash", "s1", "w", None, "approve?").await;
        assert!(!resolution.approved);
        assert!(resolution.reason.contains("Telegram send failed"));
        assert_eq!(coord.pending_lock().len(), 0);
    }

    #[tokio::test]
    async fn timeout_resolves_denied_and_cleans_both_maps() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(FakeChat { sent: Mutex::new(vec![]), fail_send: false });
        let coord = coordinator(chat, dir.path().join("rules.yaml"));
        let resolution = coord.request_approval("Bash", "s1", "w", None, "approve?").await;
        assert!(!resolution.approved);
        assert!(resolution.reason.contains("timed out"));
        assert_eq!(coord.pending_lock().len(), 0);
        assert_eq!(coord.context_lock().len(), 0);
    }

    #[tokio::test]
    async fn button_approve_resolves_the_matching_pending_request() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(FakeChat { sent: Mutex::new(vec![]), fail_send: false });
        let coord = Arc::new(coordinator(chat, dir.path().join("rules.yaml")));

        let coord2 = coord.clone();
        let handle = tokio::spawn(async move { coord2.request_approval("Bash", "s1", "w", None, "approve?").await });

        // Give `send_and_await` a moment to register before the button fires.
        tokio::time::sleep(Duration::from_millis(5)).await;
        coord
            .handle_button(ButtonEvent {
                callback_query_id: "cb1".to_owned(),
                callback_data: "approve:0".to_owned(),
                message_id: "msg-1".to_owned(),
            })
            .await;

        let resolution = handle.await.unwrap();
        assert!(resolution.approved);
        assert_eq!(resolution.reason, "Approved via Telegram");
    }

    // ── P6/P10: exactly-once resolution, non-resolving Details ────────────

    #[tokio::test]
    async fn second_button_press_on_resolved_id_is_a_noop_expired_ack() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(FakeChat { sent: Mutex::new(vec![]), fail_send: false });
        let coord = Arc::new(coordinator(chat, dir.path().join("rules.yaml")));

        let coord2 = coord.clone();
        let handle = tokio::spawn(async move { coord2.request_approval("Bash", "s1", "w", None, "approve?").await });
        tokio::time::sleep(Duration::from_millis(5)).await;

        let press = ButtonEvent {
            callback_query_id: "cb1".to_owned(),
            callback_data: "approve:0".to_owned(),
            message_id: "msg-1".to_owned(),
        };
        coord.handle_button(press.clone()).await;
        handle.await.unwrap();

        // Pending is already gone; a repeat press must not panic or double-resolve.
        coord.handle_button(press).await;
        assert_eq!(coord.pending_lock().len(), 0);
    }
}
