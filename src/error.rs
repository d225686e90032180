use std::time::Duration;

use thiserror::Error;

/// Failure of a single backend request.
///
/// Every variant is handled at the call site in the controller; none of them
/// are fatal to the UI.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{message}")]
    Transport { message: String },
    #[error("API Error (HTTP {status})")]
    Status { status: u16 },
    #[error("invalid response payload: {message}")]
    Decode { message: String },
    #[error("request body could not be encoded: {message}")]
    Encode { message: String },
    #[error("request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }

    /// The server answered with a non-2xx status.
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

/// Rejected form input, reported before anything is sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Port must be a number between 1 and 65535 (got \"{0}\")")]
    InvalidPort(String),
}
