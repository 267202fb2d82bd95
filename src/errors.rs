//! Error types for chainprobe
//!
//! Only load-time problems (unreadable suite, bad config, report I/O) surface
//! through [`ChainprobeError`]. Per-step problems have their own error types
//! next to the code that produces them and are recorded on the step instead.

use thiserror::Error;

/// Main error type for chainprobe
#[derive(Error, Debug)]
pub enum ChainprobeError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Suite error: {0}")]
    Suite(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Invalid argument: {0}")]
    Argument(String),
}

pub type Result<T> = std::result::Result<T, ChainprobeError>;
