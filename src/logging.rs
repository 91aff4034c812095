//! Tracing setup: a daily-rolling log file under `~/.claudecube/logs/` plus
//! stderr, both governed by `RUST_LOG` (default `info`) — SPEC_FULL.md §6.

use std::path::PathBuf;
use std::sync::OnceLock;

static GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

pub fn init(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_dir = resolve_log_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, "claudecube.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = GUARD.set(guard);

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()
        .ok();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "claudecube started");
}

fn resolve_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".claudecube").join("logs"))
        .unwrap_or_else(std::env::temp_dir)
}
