// src/error.rs
//! Error types for the NMEA monitor

use thiserror::Error;

pub use crate::location::ValidationError;
pub use crate::nmea::ParseError;
pub use crate::server::RequestError;

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Process-level failures. Per-sentence and per-request errors have their own
/// types and never end up here.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}
