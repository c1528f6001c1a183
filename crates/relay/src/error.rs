use std::path::PathBuf;

use reqwest::StatusCode;

/// Result alias used throughout the relay engine.
pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay cancelled")]
    Cancelled,

    #[error("failed to initialize playback subsystem: {reason}")]
    Init { reason: String },

    #[error("failed to start session, buffer `{}` unavailable: {source}", .path.display())]
    Start {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("controller has been cleaned up")]
    Terminated,

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} during {operation} for {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl RelayError {
    pub fn init(reason: impl Into<String>) -> Self {
        Self::Init {
            reason: reason.into(),
        }
    }

    pub fn start(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Start {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(
        status: StatusCode,
        url: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            operation,
        }
    }

    /// Errors raised while a session is running; these are logged and retried, never surfaced.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::HttpStatus { .. } | Self::Io { .. } => true,
            Self::Cancelled
            | Self::Init { .. }
            | Self::Start { .. }
            | Self::InvalidUrl { .. }
            | Self::Terminated
            | Self::Spawn { .. } => false,
        }
    }
}
