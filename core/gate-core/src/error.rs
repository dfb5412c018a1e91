//! Error types for gate-core operations.
//!
//! The gate itself never fails: unrecognized providers, missing deep-link
//! context and hidden sessions all resolve to a value. Errors only exist at
//! the edges (configuration, session delivery, chain reads).

use std::path::PathBuf;

/// All errors that can occur in gate-core operations.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Invalid configuration value: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    // ─────────────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Session source closed; trigger {trigger} dropped")]
    SessionClosed { trigger: session_protocol::Trigger },

    // ─────────────────────────────────────────────────────────────────────
    // Chain Read Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Chain read failed: {call}: {details}")]
    ChainRead { call: &'static str, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results using GateError.
pub type Result<T> = std::result::Result<T, GateError>;

impl From<GateError> for String {
    fn from(err: GateError) -> String {
        err.to_string()
    }
}
