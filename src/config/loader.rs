//! YAML configuration loading, env-var overrides, and atomic saves.
//!
//! # Loading order
//! 1. Parse `~/.claudecube/config.yaml` (or the path in `CLAUDECUBE_CONFIG`)
//! 2. Apply `CLAUDECUBE_*` environment variable overrides
//! 3. Fall back to [`AppConfig::default()`] if the file is missing
//!
//! # Atomic save
//! Writes to `<path>.tmp`, backs up the existing file to `<path>.bak`, then
//! renames the temp file onto `<path>` to avoid partial writes corrupting
//! the config file.

use std::{
    env,
    fs,
    path::{Path, PathBuf},
};

use super::schema::AppConfig;

// ─── default_config_path ─────────────────────────────────────────────────────

/// Return the default config file path: `~/.claudecube/config.yaml`.
pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::home_dir()
        .map(|h| h.join(".claudecube").join("config.yaml"))
        .ok_or_else(|| "could not determine home directory".to_string())
}

/// Return the default ClaudeCube data directory: `~/.claudecube`.
pub fn default_data_dir() -> Result<PathBuf, String> {
    dirs::home_dir()
        .map(|h| h.join(".claudecube"))
        .ok_or_else(|| "could not determine home directory".to_string())
}

// ─── load_config ─────────────────────────────────────────────────────────────

/// Load [`AppConfig`] from the given path, falling back to defaults if the
/// file does not exist, then applying environment variable overrides.
pub fn load_config(path: &Path) -> Result<AppConfig, String> {
    let mut config = match fs::read_to_string(path) {
        Ok(content) => serde_yaml::from_str::<AppConfig>(&content)
            .map_err(|e| format!("failed to parse config at {path:?}: {e}"))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(e) => return Err(format!("failed to read config at {path:?}: {e}")),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load config from the path resolved via `CLAUDECUBE_CONFIG` or the default
/// path, falling back to defaults on any error.
pub fn load_default_config() -> AppConfig {
    let path = env::var("CLAUDECUBE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            default_config_path().unwrap_or_else(|_| PathBuf::from("config.yaml"))
        });

    load_config(&path).unwrap_or_default()
}

// ─── apply_env_overrides ─────────────────────────────────────────────────────

/// Apply `CLAUDECUBE_*` environment variable overrides to `config`.
///
/// Supported overrides:
/// - `CLAUDECUBE_PORT`              → `server.port`
/// - `CLAUDECUBE_EVALUATOR_MODEL`   → `escalation.evaluator_model`
fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(v) = env::var("CLAUDECUBE_PORT") {
        if let Ok(port) = v.parse::<u16>() {
            config.server.port = port;
        }
    }
    if let Ok(v) = env::var("CLAUDECUBE_EVALUATOR_MODEL") {
        config.escalation.evaluator_model = v;
    }
}

// ─── save_config ─────────────────────────────────────────────────────────────

/// Atomically save `config` to `path`.
///
/// Writes to `<path>.tmp`, creates a backup of the existing file as
/// `<path>.bak`, then renames the temp file to `<path>`.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    let content = serde_yaml::to_string(config)
        .map_err(|e| format!("failed to serialise config: {e}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("failed to create config dir: {e}"))?;
    }

    let tmp_path = path.with_extension("yaml.tmp");

    fs::write(&tmp_path, &content).map_err(|e| format!("failed to write temp config: {e}"))?;

    if path.exists() {
        let bak_path = path.with_extension("yaml.bak");
        fs::copy(path, &bak_path).map_err(|e| format!("failed to backup config: {e}"))?;
    }

    fs::rename(&tmp_path, path).map_err(|e| format!("failed to replace config file: {e}"))?;

    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unsafe_code)] // env::set_var / remove_var are unsafe in Rust 2024; tests are single-threaded.
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nonexistent.yaml");
        let config = load_config(&path).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_partial_config_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "server:\n  port: 9090\n",
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.stop.max_retries, 2);
        assert!(config.stop.retry_on_error);
    }

    #[test]
    fn load_full_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
server:
  port: 8080
escalation:
  evaluatorModel: claude-haiku-4-5-20251001
  confidenceThreshold: 0.5
  telegramTimeoutSeconds: 120
telegram:
  enabled: false
  notifyOnStart: false
  notifyOnComplete: true
  notifyOnError: true
  denialAlertThreshold: 5
stop:
  retryOnError: false
  maxRetries: 5
  escalateToTelegram: false
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.escalation.telegram_timeout_seconds, 120);
        assert!(!config.telegram.enabled);
        assert_eq!(config.telegram.denial_alert_threshold, 5);
        assert_eq!(config.stop.max_retries, 5);
        assert!(!config.stop.escalate_to_telegram);
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let mut original = AppConfig::default();
        original.server.port = 1234;
        original.stop.max_retries = 9;

        save_config(&path, &original).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, original, "config should round-trip through save/load");
    }

    #[test]
    fn save_creates_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        save_config(&path, &AppConfig::default()).unwrap();
        save_config(&path, &AppConfig::default()).unwrap();

        let bak = path.with_extension("yaml.bak");
        assert!(bak.exists(), "backup file should exist after second save");
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let nested_path = dir.path().join("a").join("b").join("config.yaml");
        save_config(&nested_path, &AppConfig::default()).unwrap();
        assert!(nested_path.exists());
    }

    #[test]
    fn env_override_port() {
        let key = "CLAUDECUBE_PORT";
        // SAFETY: single-threaded test context; no other threads read this var.
        unsafe { env::set_var(key, "9999") };
        let config = load_default_config();
        // SAFETY: same as set_var above.
        unsafe { env::remove_var(key) };
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn load_invalid_yaml_returns_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "this: [is not, valid");
        let result = load_config(&path);
        assert!(result.is_err(), "invalid YAML should return an error");
    }
}
