//! Data model for the rule engine: [`Rule`], [`RulesConfig`], [`EvaluationResult`].
//!
//! Mirrors spec.md §3 verbatim. `match` is a reserved word in Rust, so the
//! struct field is named `match_fields` but serialises to/from the YAML key
//! `match`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ─── Action ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Deny,
    Allow,
    Escalate,
}

// ─── PatternKind ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Literal,
    Regex,
    Glob,
}

// ─── PatternSpec ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub pattern: String,
    pub kind: PatternKind,
}

// ─── Rule ────────────────────────────────────────────────────────────────────

/// One immutable entry in the rules file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub action: Action,
    #[serde(rename = "toolSelector")]
    pub tool_selector: String,
    /// Dotted-field path → ordered pattern list. Absent ⇒ the rule matches
    /// every use of the selected tool(s).
    #[serde(rename = "match", default)]
    pub match_fields: Option<HashMap<String, Vec<PatternSpec>>>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Rule {
    /// The set of tool names this rule applies to (pipe-separated in the
    /// source file).
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tool_selector.split('|').map(str::trim)
    }
}

// ─── Defaults ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    pub unmatched: Action,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            unmatched: Action::Escalate,
        }
    }
}

// ─── RulesConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn default_version() -> u32 {
    1
}

impl RulesConfig {
    /// The two rules shipped by default, matching spec.md's end-to-end
    /// scenarios 1 and 2.
    pub fn default_shipped() -> Self {
        Self {
            version: 1,
            defaults: Defaults {
                unmatched: Action::Escalate,
            },
            rules: vec![
                Rule {
                    name: "Allow read-only tools".to_owned(),
                    action: Action::Allow,
                    tool_selector: "Read|Glob|Grep".to_owned(),
                    match_fields: None,
                    reason: None,
                },
                Rule {
                    name: "Block destructive commands".to_owned(),
                    action: Action::Deny,
                    tool_selector: "Bash".to_owned(),
                    match_fields: Some(HashMap::from([(
                        "command".to_owned(),
                        vec![PatternSpec {
                            pattern: r"rm\s+-rf\s+/|:\(\)\{.*\}:|mkfs\.|dd\s+if=.*of=/dev/"
                                .to_owned(),
                            kind: PatternKind::Regex,
                        }],
                    )])),
                    reason: Some("Destructive filesystem command blocked".to_owned()),
                },
            ],
        }
    }
}

// ─── EvaluationResult ────────────────────────────────────────────────────────

/// Pure output of [`crate::rules::engine::RuleEngine::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    pub action: Action,
    pub rule: Option<String>,
    pub reason: String,
}
