//! Policy store: a tagged list with atomic file persistence, formatted for
//! inclusion in LLM evaluator prompts (spec.md §3, §6).
//!
//! Single lock, persisted to `policies.yaml` on every mutation — spec.md §5
//! resource table.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;

use super::types::Policy;

pub struct PolicyStore {
    path: PathBuf,
    policies: Mutex<Vec<Policy>>,
    next_id: Mutex<u64>,
}

impl PolicyStore {
    /// Load `path` if it exists; the id counter is set past the maximum
    /// observed numeric id (spec.md §3).
    pub fn load(path: PathBuf) -> Self {
        let policies = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_yaml::from_str::<Vec<Policy>>(&content).ok())
            .unwrap_or_default();

        let next_id = policies
            .iter()
            .filter_map(|p| p.id.strip_prefix("pol_"))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);

        Self {
            path,
            policies: Mutex::new(policies),
            next_id: Mutex::new(next_id),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Policy>> {
        self.policies.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a new policy and persist. Not deduplicated against existing
    /// entries, matching spec.md §3.
    pub fn add(&self, description: String, tool: Option<String>) -> Policy {
        let id = {
            let mut next_id = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            let id = format!("pol_{next_id}");
            *next_id += 1;
            id
        };
        let policy = Policy {
            id,
            description,
            tool,
            created_at: Utc::now(),
        };

        {
            let mut policies = self.lock();
            policies.push(policy.clone());
            let _ = self.persist(&policies);
        }

        policy
    }

    fn persist(&self, policies: &[Policy]) -> Result<(), String> {
        let yaml = serde_yaml::to_string(policies).map_err(|e| e.to_string())?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let tmp_path = self.path.with_extension("yaml.tmp");
        std::fs::write(&tmp_path, yaml).map_err(|e| e.to_string())?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| e.to_string())
    }

    pub fn all(&self) -> Vec<Policy> {
        self.lock().clone()
    }

    pub fn for_tool(&self, tool_name: &str) -> Vec<Policy> {
        self.lock()
            .iter()
            .filter(|p| p.applies_to(tool_name))
            .cloned()
            .collect()
    }

    /// Format policies relevant to `tool_name` for inclusion in the
    /// evaluator's user message — spec.md scenario 7's exact wording.
    pub fn format_for_prompt(&self, tool_name: &str) -> String {
        let relevant = self.for_tool(tool_name);
        if relevant.is_empty() {
            return String::new();
        }
        let mut lines = vec!["Human-defined policies:".to_owned()];
        for policy in relevant {
            let scope = policy.tool.as_deref().unwrap_or(tool_name);
            lines.push(format!("- [{}] {} (applies to: {})", policy.id, policy.description, scope));
        }
        lines.join("\n")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_missing_file_starts_empty_with_id_zero() {
        let dir = TempDir::new().unwrap();
        let store = PolicyStore::load(dir.path().join("policies.yaml"));
        assert!(store.all().is_empty());
        let first = store.add("desc".to_owned(), None);
        assert_eq!(first.id, "pol_0");
    }

    #[test]
    fn add_persists_to_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("policies.yaml");
        let store = PolicyStore::load(path.clone());
        store.add("always allow npm install".to_owned(), Some("Bash".to_owned()));

        let reloaded = PolicyStore::load(path);
        assert_eq!(reloaded.all().len(), 1);
        assert_eq!(reloaded.all()[0].description, "always allow npm install");
    }

    #[test]
    fn counter_resumes_past_max_observed_id_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("policies.yaml");
        std::fs::write(
            &path,
            serde_yaml::to_string(&vec![Policy {
                id: "pol_7".to_owned(),
                description: "x".to_owned(),
                tool: None,
                created_at: Utc::now(),
            }])
            .unwrap(),
        )
        .unwrap();

        let store = PolicyStore::load(path);
        let next = store.add("y".to_owned(), None);
        assert_eq!(next.id, "pol_8");
    }

    #[test]
    fn not_deduplicated() {
        let dir = TempDir::new().unwrap();
        let store = PolicyStore::load(dir.path().join("policies.yaml"));
        store.add("same text".to_owned(), None);
        store.add("same text".to_owned(), None);
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn for_tool_filters_by_pipe_separated_selector() {
        let dir = TempDir::new().unwrap();
        let store = PolicyStore::load(dir.path().join("policies.yaml"));
        store.add("global".to_owned(), None);
        store.add("bash only".to_owned(), Some("Bash".to_owned()));
        store.add("read or grep".to_owned(), Some("Read|Grep".to_owned()));

        let bash = store.for_tool("Bash");
        assert_eq!(bash.len(), 2);
        let grep = store.for_tool("Grep");
        assert_eq!(grep.len(), 2);
        let write = store.for_tool("Write");
        assert_eq!(write.len(), 1);
    }

    // ── scenario 7 exact wording ───────────────────────────────────────────

    #[test]
    fn format_for_prompt_matches_scenario_7_wording() {
        let dir = TempDir::new().unwrap();
        let store = PolicyStore::load(dir.path().join("policies.yaml"));
        store.add("always allow npm install".to_owned(), Some("Bash".to_owned()));

        let formatted = store.format_for_prompt("Bash");
        assert_eq!(
            formatted,
            "Human-defined policies:\n- [pol_0] always allow npm install (applies to: Bash)"
        );
    }

    #[test]
    fn format_for_prompt_is_empty_when_no_policies_apply() {
        let dir = TempDir::new().unwrap();
        let store = PolicyStore::load(dir.path().join("policies.yaml"));
        assert_eq!(store.format_for_prompt("Bash"), "");
    }
}
