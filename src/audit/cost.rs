//! Append-only cost sink — spec.md §4.6, §6.
//!
//! One JSONL file per calendar day: `.claudecube/audit/costs-YYYY-MM-DD.jsonl`.
//! Same never-blocks-a-decision discipline as [`super::sink::AuditSink`].

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;

use crate::llm::client::Usage;

pub struct CostSink {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl CostSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, lock: Mutex::new(()) }
    }

    /// Record one LLM call. `purpose` is `"tool-eval"` or `"reply-eval"`.
    pub fn record(&self, purpose: &str, model: &str, usage: &Usage) {
        let payload = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "purpose": purpose,
            "model": model,
            "inputTokens": usage.input_tokens,
            "outputTokens": usage.output_tokens,
        });
        if let Err(e) = self.append(&payload) {
            tracing::warn!("cost sink write failed: {e}");
        }
    }

    fn append(&self, payload: &serde_json::Value) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        fs::create_dir_all(&self.dir)?;
        let date = Utc::now().format("%Y-%m-%d");
        let path = self.dir.join(format!("costs-{date}.jsonl"));
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{payload}")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
