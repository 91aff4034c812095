//! Append-only audit sink — spec.md §6, §7 taxonomy item 5.
//!
//! One JSONL file per calendar day: `.claudecube/audit/audit-YYYY-MM-DD.jsonl`.
//! Write failures are logged and never propagate — audit logging must never
//! block a decision (spec.md §7).

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

pub struct AuditSink {
    dir: PathBuf,
    lock: Mutex<()>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub session_id: String,
    pub tool_name: Option<String>,
    pub action: String,
    pub decided_by: String,
    pub reason: String,
}

impl AuditSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, lock: Mutex::new(()) }
    }

    pub fn record(&self, entry: &AuditEntry) {
        let payload = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "sessionId": entry.session_id,
            "toolName": entry.tool_name,
            "action": entry.action,
            "decidedBy": entry.decided_by,
            "reason": entry.reason,
        });
        if let Err(e) = self.append(&payload) {
            tracing::warn!("audit sink write failed: {e}");
        }
    }

    fn append(&self, payload: &serde_json::Value) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        fs::create_dir_all(&self.dir)?;
        let date = Utc::now().format("%Y-%m-%d");
        let path = self.dir.join(format!("audit-{date}.jsonl"));
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{payload}")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
