pub mod escalation;
pub mod lifecycle;
pub mod pretool;
pub mod stop;
pub mod types;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::approval::ApprovalCoordinator;
use crate::audit::AuditSink;
use crate::config::schema::StopConfig;
use crate::llm::ToolCallEvaluator;
use crate::policy::PolicyStore;
use crate::rules::RulesHandle;
use crate::session::SessionRegistry;
use crate::transcript::TranscriptSummarizer;

/// Everything the hook pipelines need, bundled for axum `State` sharing.
pub struct PipelineDeps {
    pub rules: RulesHandle,
    pub sessions: Arc<SessionRegistry>,
    pub evaluator: Arc<ToolCallEvaluator>,
    pub policies: Arc<PolicyStore>,
    pub coordinator: Option<Arc<ApprovalCoordinator>>,
    pub summarizer: Arc<TranscriptSummarizer>,
    pub audit: Arc<AuditSink>,
    pub stop_config: StopConfig,
    retry_counters: Mutex<HashMap<String, u32>>,
}

impl PipelineDeps {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules: RulesHandle,
        sessions: Arc<SessionRegistry>,
        evaluator: Arc<ToolCallEvaluator>,
        policies: Arc<PolicyStore>,
        coordinator: Option<Arc<ApprovalCoordinator>>,
        summarizer: Arc<TranscriptSummarizer>,
        audit: Arc<AuditSink>,
        stop_config: StopConfig,
    ) -> Self {
        Self {
            rules,
            sessions,
            evaluator,
            policies,
            coordinator,
            summarizer,
            audit,
            stop_config,
            retry_counters: Mutex::new(HashMap::new()),
        }
    }

    fn retry_count(&self, session_id: &str) -> u32 {
        self.retry_counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(session_id)
            .copied()
            .unwrap_or(0)
    }

    fn increment_retry(&self, session_id: &str) -> u32 {
        let mut counters = self.retry_counters.lock().unwrap_or_else(|e| e.into_inner());
        let entry = counters.entry(session_id.to_owned()).or_insert(0);
        *entry += 1;
        *entry
    }

    fn clear_retry(&self, session_id: &str) {
        self.retry_counters.lock().unwrap_or_else(|e| e.into_inner()).remove(session_id);
    }
}
