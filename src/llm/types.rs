//! Data model for the two LLM call shapes (C6).

use serde::{Deserialize, Serialize};

/// Output of the tool-call evaluator (spec.md §4.6.1).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvaluatorVerdict {
    pub allowed: bool,
    pub confident: bool,
    pub reason: String,
}

impl EvaluatorVerdict {
    pub fn unparseable() -> Self {
        Self {
            allowed: false,
            confident: false,
            reason: "LLM response unparseable".to_owned(),
        }
    }

    pub fn error(e: impl std::fmt::Display) -> Self {
        Self {
            allowed: false,
            confident: false,
            reason: format!("LLM evaluation error: {e}"),
        }
    }
}

/// Intent classified from a human's free-text reply (spec.md §4.6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyIntent {
    Approve,
    Deny,
    Forward,
    AddPolicy,
    AddRule,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyEvaluation {
    pub intent: Option<ReplyIntent>,
    #[serde(rename = "forwardText")]
    pub forward_text: Option<String>,
    #[serde(rename = "policyText")]
    pub policy_text: Option<String>,
    #[serde(rename = "ruleYaml")]
    pub rule_yaml: Option<String>,
}

impl ReplyEvaluation {
    /// Fail-safe permissive fallback — spec.md §4.6.2, §7: the reply was
    /// already typed by the authorised human.
    pub fn permissive_fallback() -> Self {
        Self {
            intent: Some(ReplyIntent::Approve),
            ..Default::default()
        }
    }
}
