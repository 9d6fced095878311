//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Signal handling error: {message}")]
    Signal { message: String },

    // ─────────────────────────────────────────────────────────────
    // Session Construction Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid session parameters: {message}")]
    InvalidParameters { message: String },

    #[error("No owner context to deliver session events to")]
    NoCaptureContext,

    // ─────────────────────────────────────────────────────────────
    // Source Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Result source not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Failed to decode result {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Session initialization was cancelled")]
    Cancelled,

    // ─────────────────────────────────────────────────────────────
    // Subscription Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Session '{name}' does not support subscriptions")]
    SubscribeUnsupported { name: String },

    #[error("No active session")]
    NoActiveSession,

    #[error("File watcher error: {message}")]
    Watcher { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Owner context closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn signal(message: impl Into<String>) -> Self {
        Self::Signal {
            message: message.into(),
        }
    }

    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    pub fn source_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SourceNotFound { path: path.into() }
    }

    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn subscribe_unsupported(name: impl Into<String>) -> Self {
        Self::SubscribeUnsupported { name: name.into() }
    }

    pub fn watcher(message: impl Into<String>) -> Self {
        Self::Watcher {
            message: message.into(),
        }
    }
}
