//! Error taxonomy for collaborator API calls.
//!
//! None of these are fatal. Periodic polls route every variant to the
//! [`FallbackGenerator`](crate::fallback::FallbackGenerator); the only place an
//! error reaches the user is the initial model-metrics load when no cached
//! fallback exists (see [`MetricsView`](crate::metrics::MetricsView)).

use std::time::Duration;

use thiserror::Error;

/// A failed fetch against the forecasting API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("schema mismatch: {0}")]
    Schema(String),
}

/// Coarse two-way split of [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure, timeout or non-success status.
    Transport,
    /// Payload did not have the expected shape or values.
    Schema,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::Status(_) => ErrorKind::Transport,
            Self::Schema(_) => ErrorKind::Schema,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Schema(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
