//! Session registry (C4): in-memory session table, label resolution,
//! synthetic-session merge.
//!
//! One coarse lock per table — spec.md §5 explicitly accepts this for a
//! low-QPS service; no lock is held across I/O (the multiplexer query in
//! `register` happens only while resolving a label, and is itself
//! best-effort/non-blocking per spec.md §6).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::multiplexer::traits::MultiplexerAdapter;

use super::types::{synthetic_session_id, SessionInfo, SessionState};

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionInfo>>,
    multiplexer: Option<Arc<dyn MultiplexerAdapter>>,
}

impl SessionRegistry {
    pub fn new(multiplexer: Option<Arc<dyn MultiplexerAdapter>>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            multiplexer,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionInfo>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolve a session label: the multiplexer window name for an
    /// exact-string `cwd` match, falling back to the first 12 chars of
    /// `session_id` (spec.md §4.4).
    pub async fn resolve_label(&self, session_id: &str, cwd: &str) -> String {
        if let Some(mux) = &self.multiplexer {
            if let Some(label) = mux.resolve_label(cwd).await {
                return label;
            }
        }
        session_id.chars().take(12).collect()
    }

    /// Register a brand-new session.
    pub async fn register(
        &self,
        session_id: &str,
        cwd: &str,
        transcript_path: Option<String>,
    ) -> SessionInfo {
        let label = self.resolve_label(session_id, cwd).await;
        let pane_id = match &self.multiplexer {
            Some(mux) => mux.find_pane_for_cwd(cwd).await,
            None => None,
        };
        let now = Utc::now();
        let info = SessionInfo {
            session_id: session_id.to_owned(),
            cwd: cwd.to_owned(),
            started_at: now,
            state: SessionState::Active,
            last_tool_name: None,
            last_activity: now,
            denial_count: 0,
            label,
            pane_id,
            transcript_path,
        };
        self.lock().insert(session_id.to_owned(), info.clone());
        info
    }

    pub fn deregister(&self, session_id: &str) {
        self.lock().remove(session_id);
    }

    /// `ensureRegistered` (spec.md §4.4): no-op if present (filling in a
    /// previously-null transcript path); merges a same-`cwd` synthetic
    /// session if one exists; else registers fresh.
    pub async fn ensure_registered(
        &self,
        session_id: &str,
        cwd: &str,
        transcript_path: Option<String>,
    ) {
        {
            let mut sessions = self.lock();
            if let Some(existing) = sessions.get_mut(session_id) {
                if existing.transcript_path.is_none() {
                    existing.transcript_path = transcript_path;
                }
                return;
            }

            let synthetic_id = sessions
                .values()
                .find(|s| s.is_synthetic() && s.cwd == cwd)
                .map(|s| s.session_id.clone());

            if let Some(synthetic_id) = synthetic_id {
                if let Some(mut synthetic) = sessions.remove(&synthetic_id) {
                    synthetic.session_id = session_id.to_owned();
                    if transcript_path.is_some() {
                        synthetic.transcript_path = transcript_path;
                    }
                    sessions.insert(session_id.to_owned(), synthetic);
                    return;
                }
            }
        }

        self.register(session_id, cwd, transcript_path).await;
    }

    /// Scan the multiplexer at startup and create synthetic sessions for
    /// every pane running the agent CLI that isn't already a real session
    /// for that cwd.
    pub async fn register_from_tmux(&self) {
        let Some(mux) = &self.multiplexer else {
            return;
        };
        for pane in mux.list_panes().await {
            let already_known = self.lock().values().any(|s| s.cwd == pane.pane_cwd);
            if already_known {
                continue;
            }
            let id = synthetic_session_id(&pane.pane_id);
            let now = Utc::now();
            let info = SessionInfo {
                session_id: id.clone(),
                cwd: pane.pane_cwd.clone(),
                started_at: now,
                state: SessionState::Idle,
                last_tool_name: None,
                last_activity: now,
                denial_count: 0,
                label: pane.window_name.clone(),
                pane_id: Some(pane.pane_id.clone()),
                transcript_path: None,
            };
            self.lock().insert(id, info);
        }
    }

    pub fn update_state(&self, session_id: &str, state: SessionState) {
        if let Some(s) = self.lock().get_mut(session_id) {
            s.state = state;
            s.last_activity = Utc::now();
        }
    }

    pub fn update_tool_use(&self, session_id: &str, tool_name: &str) {
        if let Some(s) = self.lock().get_mut(session_id) {
            s.last_tool_name = Some(tool_name.to_owned());
            s.last_activity = Utc::now();
        }
    }

    pub fn record_denial(&self, session_id: &str) -> u32 {
        if let Some(s) = self.lock().get_mut(session_id) {
            s.denial_count += 1;
            return s.denial_count;
        }
        0
    }

    pub fn get_label(&self, session_id: &str) -> Option<String> {
        self.lock().get(session_id).map(|s| s.label.clone())
    }

    pub fn get_pane_id(&self, session_id: &str) -> Option<String> {
        self.lock().get(session_id).and_then(|s| s.pane_id.clone())
    }

    pub fn get_transcript_path(&self, session_id: &str) -> Option<String> {
        self.lock()
            .get(session_id)
            .and_then(|s| s.transcript_path.clone())
    }

    pub fn get_all(&self) -> Vec<SessionInfo> {
        self.lock().values().cloned().collect()
    }

    pub fn find_by_cwd(&self, cwd: &str) -> Option<SessionInfo> {
        self.lock().values().find(|s| s.cwd == cwd).cloned()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(None)
    }

    #[tokio::test]
    async fn register_falls_back_to_session_id_prefix_without_multiplexer() {
        let r = registry();
        let info = r.register("session-abcdefghijklmnop", "/proj", None).await;
        assert_eq!(info.label, "session-abcd");
    }

    #[tokio::test]
    async fn ensure_registered_is_noop_when_already_present() {
        let r = registry();
        r.register("s1", "/proj", None).await;
        r.ensure_registered("s1", "/proj", Some("/t.jsonl".into())).await;
        assert_eq!(r.get_transcript_path("s1"), Some("/t.jsonl".to_owned()));
        assert_eq!(r.len(), 1);
    }

    #[tokio::test]
    async fn ensure_registered_does_not_overwrite_existing_transcript_path() {
        let r = registry();
        r.register("s1", "/proj", Some("/first.jsonl".into())).await;
        r.ensure_registered("s1", "/proj", Some("/second.jsonl".into())).await;
        assert_eq!(r.get_transcript_path("s1"), Some("/first.jsonl".to_owned()));
    }

    // ── P9: merge idempotence ─────────────────────────────────────────────

    #[tokio::test]
    async fn merges_synthetic_session_into_real_one() {
        let r = registry();
        {
            let mut sessions = r.lock();
            sessions.insert(
                "tmux_pane1".to_owned(),
                SessionInfo {
                    session_id: "tmux_pane1".to_owned(),
                    cwd: "/proj".to_owned(),
                    started_at: Utc::now(),
                    state: SessionState::Idle,
                    last_tool_name: None,
                    last_activity: Utc::now(),
                    denial_count: 3,
                    label: "my-window".to_owned(),
                    pane_id: Some("pane1".to_owned()),
                    transcript_path: None,
                },
            );
        }

        r.ensure_registered("real-session", "/proj", Some("/t.jsonl".into())).await;

        assert_eq!(r.len(), 1, "exactly one entry should remain for the cwd");
        let merged = r.lock().get("real-session").cloned().unwrap();
        assert_eq!(merged.label, "my-window");
        assert_eq!(merged.denial_count, 3);
        assert_eq!(merged.transcript_path, Some("/t.jsonl".to_owned()));
        assert!(!r.lock().contains_key("tmux_pane1"));
    }

    #[tokio::test]
    async fn update_and_denial_are_noops_for_unknown_session() {
        let r = registry();
        r.update_state("missing", SessionState::Active);
        r.update_tool_use("missing", "Bash");
        assert_eq!(r.record_denial("missing"), 0);
    }

    #[tokio::test]
    async fn record_denial_increments_counter() {
        let r = registry();
        r.register("s1", "/proj", None).await;
        assert_eq!(r.record_denial("s1"), 1);
        assert_eq!(r.record_denial("s1"), 2);
    }

    #[tokio::test]
    async fn find_by_cwd_returns_matching_session() {
        let r = registry();
        r.register("s1", "/proj", None).await;
        let found = r.find_by_cwd("/proj");
        assert!(found.is_some());
        assert_eq!(r.find_by_cwd("/nope"), None);
    }
}
