//! Crate-level error type.
//!
//! Used at the edges — config loading, the CLI, adapter construction — where
//! a typed error is useful. Pipeline decision logic does not use this type:
//! every branch of the decision pipeline returns a well-typed domain value
//! (see `pipeline/`), never a bare error, matching the "never throws to the
//! HTTP layer" rule in spec.md §7.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaudeCubeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("chat transport error: {0}")]
    Chat(String),

    #[error("multiplexer error: {0}")]
    Multiplexer(String),
}

pub type Result<T> = std::result::Result<T, ClaudeCubeError>;
