//! Rule engine (C2): deny-first partitioned evaluation over compiled rules.
//!
//! Stateless and pure once built — safe to share across concurrent
//! evaluations (spec.md §4.2 "Design properties").

use std::collections::HashMap;

use serde_json::Value;

use super::matcher::{extract_field, value_to_match_string, CompiledPattern};
use super::types::{Action, EvaluationResult, RulesConfig};

// ─── CompiledRule ────────────────────────────────────────────────────────────

struct CompiledRule {
    name: String,
    tool_names: Vec<String>,
    match_fields: Option<HashMap<String, Vec<CompiledPattern>>>,
    reason: Option<String>,
}

impl CompiledRule {
    fn compile(rule: &super::types::Rule) -> Result<Self, String> {
        let tool_names = rule.tool_names().map(str::to_owned).collect();
        let match_fields = match &rule.match_fields {
            None => None,
            Some(fields) => {
                let mut compiled = HashMap::with_capacity(fields.len());
                for (field, patterns) in fields {
                    let compiled_patterns: Result<Vec<_>, String> = patterns
                        .iter()
                        .map(CompiledPattern::compile)
                        .collect();
                    compiled.insert(field.clone(), compiled_patterns?);
                }
                Some(compiled)
            }
        };
        Ok(Self {
            name: rule.name.clone(),
            tool_names,
            match_fields,
            reason: rule.reason.clone(),
        })
    }

    fn applies_to(&self, tool_name: &str) -> bool {
        self.tool_names.iter().any(|t| t == tool_name)
    }

    /// AND on tool name, OR across fields, OR within a field (spec.md §4.2).
    fn matches(&self, tool_name: &str, tool_input: &Value) -> bool {
        if !self.applies_to(tool_name) {
            return false;
        }
        let Some(fields) = &self.match_fields else {
            return true;
        };
        fields.iter().any(|(field, patterns)| {
            let Some(extracted) = extract_field(tool_input, field) else {
                return false;
            };
            let Some(as_str) = value_to_match_string(extracted) else {
                return false;
            };
            patterns.iter().any(|p| p.matches(&as_str))
        })
    }

    fn default_reason(&self, action: Action) -> String {
        self.reason.clone().unwrap_or_else(|| {
            let verb = match action {
                Action::Deny => "Denied",
                Action::Allow => "Allowed",
                Action::Escalate => "Escalated",
            };
            format!("{verb} by rule: {}", self.name)
        })
    }
}

// ─── RuleEngine ──────────────────────────────────────────────────────────────

pub struct RuleEngine {
    deny: Vec<CompiledRule>,
    allow: Vec<CompiledRule>,
    escalate: Vec<CompiledRule>,
    unmatched_default: Action,
}

impl RuleEngine {
    /// Build an engine from a [`RulesConfig`]. Fails if any regex fails to
    /// compile (spec.md §3: "Regex patterns MUST be validated at load time").
    pub fn build(config: &RulesConfig) -> Result<Self, String> {
        let mut deny = Vec::new();
        let mut allow = Vec::new();
        let mut escalate = Vec::new();

        for rule in &config.rules {
            let compiled = CompiledRule::compile(rule)?;
            match rule.action {
                Action::Deny => deny.push(compiled),
                Action::Allow => allow.push(compiled),
                Action::Escalate => escalate.push(compiled),
            }
        }

        Ok(Self {
            deny,
            allow,
            escalate,
            unmatched_default: config.defaults.unmatched,
        })
    }

    /// Evaluate `(toolName, toolInput)`, scanning `deny → allow → escalate`
    /// in partition order, first match wins within each partition.
    pub fn evaluate(&self, tool_name: &str, tool_input: &Value) -> EvaluationResult {
        for rule in &self.deny {
            if rule.matches(tool_name, tool_input) {
                return EvaluationResult {
                    action: Action::Deny,
                    reason: rule.default_reason(Action::Deny),
                    rule: Some(rule.name.clone()),
                };
            }
        }
        for rule in &self.allow {
            if rule.matches(tool_name, tool_input) {
                return EvaluationResult {
                    action: Action::Allow,
                    reason: rule.default_reason(Action::Allow),
                    rule: Some(rule.name.clone()),
                };
            }
        }
        for rule in &self.escalate {
            if rule.matches(tool_name, tool_input) {
                return EvaluationResult {
                    action: Action::Escalate,
                    reason: rule.default_reason(Action::Escalate),
                    rule: Some(rule.name.clone()),
                };
            }
        }

        EvaluationResult {
            action: self.unmatched_default,
            rule: None,
            reason: format!(
                "No matching rule; default action is {:?}",
                self.unmatched_default
            ),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
