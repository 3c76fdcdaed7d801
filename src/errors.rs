//! Error types for the ingestion pipeline.
//!
//! Only [`IngestError::Config`] (and the YAML error that produces it) is
//! allowed to abort a pass. Transport and parse failures are recovered at the
//! adapter boundary, store failures inside the coordinator.

use thiserror::Error;

/// Errors raised anywhere in the pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Timeout, connection failure, or non-2xx status.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// A page did not contain what a selector expected.
    #[error("parse error: {0}")]
    Parse(String),

    /// Reading or writing the persisted record set failed.
    #[error("store error: {0}")]
    Store(String),

    /// Unrecoverable configuration problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local file system failure outside the store, e.g. preparing its directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl IngestError {
    pub fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        IngestError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether this error must abort the whole pass.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::Config(_) | IngestError::Yaml(_))
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
