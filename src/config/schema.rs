//! YAML configuration schema for ClaudeCube.
//!
//! All fields have `#[serde(default)]` so a partially-filled `config.yaml`
//! works correctly — spec.md §6: "all fields have defaults — omitted is
//! valid."
//!
//! Example `~/.claudecube/config.yaml`:
//! ```yaml
//! server:
//!   port: 7080
//! escalation:
//!   evaluatorModel: claude-haiku-4-5-20251001
//!   confidenceThreshold: 0.8
//!   telegramTimeoutSeconds: 300
//! telegram:
//!   enabled: true
//!   notifyOnStart: true
//!   notifyOnComplete: true
//!   notifyOnError: false
//!   denialAlertThreshold: 3
//! stop:
//!   retryOnError: true
//!   maxRetries: 2
//!   escalateToTelegram: true
//! ```

use serde::{Deserialize, Serialize};

// ─── ServerConfig ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 7080 }
    }
}

// ─── EscalationConfig ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EscalationConfig {
    pub evaluator_model: String,
    /// Parsed but unused — spec.md §6: "vestigial". The LLM's own
    /// `confident` boolean is authoritative; kept only for schema fidelity.
    pub confidence_threshold: f64,
    pub telegram_timeout_seconds: u64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            evaluator_model: "claude-haiku-4-5-20251001".to_owned(),
            confidence_threshold: 0.8,
            telegram_timeout_seconds: 300,
        }
    }
}

// ─── TelegramConfig ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TelegramConfig {
    pub enabled: bool,
    pub notify_on_start: bool,
    pub notify_on_complete: bool,
    /// Accepted but not wired to any send site — spec.md §9 Open Questions.
    pub notify_on_error: bool,
    pub denial_alert_threshold: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            notify_on_start: true,
            notify_on_complete: true,
            notify_on_error: false,
            denial_alert_threshold: 3,
        }
    }
}

// ─── StopConfig ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StopConfig {
    pub retry_on_error: bool,
    pub max_retries: u32,
    pub escalate_to_telegram: bool,
}

impl Default for StopConfig {
    fn default() -> Self {
        Self {
            retry_on_error: true,
            max_retries: 2,
            escalate_to_telegram: true,
        }
    }
}

// ─── AppConfig ───────────────────────────────────────────────────────────────

/// Top-level orchestrator configuration.
///
/// Loaded from `~/.claudecube/config.yaml`, falling back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub escalation: EscalationConfig,
    pub telegram: TelegramConfig,
    pub stop: StopConfig,
}
