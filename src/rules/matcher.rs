//! Pattern matcher (C1): compile and test literal/regex/glob patterns over
//! fields extracted from an untyped tool-input JSON tree.
//!
//! `toolInput` is modelled as `serde_json::Value` and traversed by dotted
//! path; unknown fields and wrong types are treated as "absent" rather than
//! erroring, per spec.md §9's design note on dynamic field extraction.

use regex::Regex;
use serde_json::Value;

use super::types::{PatternKind, PatternSpec};

// ─── CompiledPattern ─────────────────────────────────────────────────────────

/// A [`PatternSpec`] compiled once when the rule engine is built, so the hot
/// path (per-request evaluation) never re-parses a regex or glob.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    Literal(String),
    Regex(Box<Regex>),
    Glob(glob::Pattern),
}

impl CompiledPattern {
    /// Compile a pattern spec. Regex patterns are compiled case-insensitive
    /// to match ECMAScript-flavour default `test()` semantics (spec.md §4.1).
    pub fn compile(spec: &PatternSpec) -> Result<Self, String> {
        match spec.kind {
            PatternKind::Literal => Ok(CompiledPattern::Literal(spec.pattern.clone())),
            PatternKind::Regex => {
                let pattern = format!("(?i){}", spec.pattern);
                Regex::new(&pattern)
                    .map(|r| CompiledPattern::Regex(Box::new(r)))
                    .map_err(|e| format!("invalid regex '{}': {e}", spec.pattern))
            }
            PatternKind::Glob => glob::Pattern::new(&spec.pattern)
                .map(CompiledPattern::Glob)
                .map_err(|e| format!("invalid glob '{}': {e}", spec.pattern)),
        }
    }

    /// Test `value` against this pattern.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            CompiledPattern::Literal(lit) => lit == value,
            CompiledPattern::Regex(re) => re.is_match(value),
            CompiledPattern::Glob(pat) => pat.matches(value),
        }
    }
}

// ─── Field extraction ────────────────────────────────────────────────────────

/// Resolve a dotted path (`"a.b"`) against `input`. Any intermediate
/// non-object, or a missing key, yields `None` (field absent) rather than an
/// error.
pub fn extract_field<'a>(input: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = input;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Render a JSON value as the string a pattern is tested against. Arrays,
/// objects and null are not representable as match targets and are treated
/// as absent.
pub fn value_to_match_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
