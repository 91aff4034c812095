//! Data model for the policy store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A free-text human instruction, optionally scoped to one or more tools
/// (pipe-separated; absent ⇒ global). Not deduplicated (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Policy {
    pub fn applies_to(&self, tool_name: &str) -> bool {
        match &self.tool {
            None => true,
            Some(selector) => selector.split('|').any(|t| t == tool_name),
        }
    }
}
