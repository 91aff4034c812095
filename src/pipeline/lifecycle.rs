//! Lifecycle handlers — spec.md §4.8.3.
//!
//! `SessionStart`, `SessionEnd`, and `Notification` all return `{}` and
//! never influence control flow.

use serde_json::{json, Value};

use crate::session::SessionState;

use super::types::LifecycleEvent;
use super::PipelineDeps;

pub async fn session_start(deps: &PipelineDeps, event: LifecycleEvent) -> Value {
    let cwd = event.cwd.unwrap_or_default();
    deps.sessions.ensure_registered(&event.session_id, &cwd, event.transcript_path).await;
    json!({})
}

pub async fn session_end(deps: &PipelineDeps, event: LifecycleEvent) -> Value {
    deps.sessions.deregister(&event.session_id);
    json!({})
}

pub async fn notification(deps: &PipelineDeps, event: LifecycleEvent) -> Value {
    deps.sessions.update_state(&event.session_id, SessionState::Active);
    json!({})
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditSink;
    use crate::llm::client::{LlmClient, Usage};
    use crate::llm::ToolCallEvaluator;
    use crate::policy::PolicyStore;
    use crate::rules::{RuleEngine, RulesConfig, RulesHandle};
    use crate::session::SessionRegistry;
    use crate::transcript::TranscriptSummarizer;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct FakeLlm;

    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn complete(&self, _s: &str, _u: &str, _m: u32) -> Result<(String, Usage), String> {
            Ok(("{}".to_owned(), Usage::default()))
        }
    }

    fn deps(dir: &TempDir) -> PipelineDeps {
        let handle = RulesHandle::new(RuleEngine::build(&RulesConfig::default_shipped()).unwrap());
        let client: Arc<dyn LlmClient> = Arc::new(FakeLlm);
        PipelineDeps::new(
            handle,
            Arc::new(SessionRegistry::new(None)),
            Arc::new(ToolCallEvaluator::new(client.clone(), "m".to_owned(), None)),
            Arc::new(PolicyStore::load(dir.path().join("policies.yaml"))),
            None,
            Arc::new(TranscriptSummarizer::new(client)),
            Arc::new(AuditSink::new(dir.path().join("audit"))),
            Default::default(),
        )
    }

    fn event(session_id: &str) -> LifecycleEvent {
        LifecycleEvent {
            session_id: session_id.to_owned(),
            cwd: Some("/p".to_owned()),
            transcript_path: None,
            message: None,
            title: None,
        }
    }

    #[tokio::test]
    async fn session_start_registers_and_returns_empty_object() {
        let dir = TempDir::new().unwrap();
        let d = deps(&dir);
        let response = session_start(&d, event("s1")).await;
        assert_eq!(response, json!({}));
        assert!(d.sessions.find_by_cwd("/p").is_some());
    }

    #[tokio::test]
    async fn session_end_deregisters() {
        let dir = TempDir::new().unwrap();
        let d = deps(&dir);
        session_start(&d, event("s1")).await;
        session_end(&d, event("s1")).await;
        assert!(d.sessions.find_by_cwd("/p").is_none());
    }

    #[tokio::test]
    async fn notification_is_a_noop_for_unknown_session() {
        let dir = TempDir::new().unwrap();
        let d = deps(&dir);
        let response = notification(&d, event("missing")).await;
        assert_eq!(response, json!({}));
    }
}
