pub mod engine;
pub mod matcher;
pub mod types;
pub mod watcher;

pub use engine::RuleEngine;
pub use types::{Action, EvaluationResult, Rule, RulesConfig};
pub use watcher::{RulesHandle, RulesWatcher};
