//! Failure taxonomy for one screening run.
//!
//! Every variant is scoped to the address being processed: the poller logs
//! it, abandons that address for the current cycle and moves on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenError {
    /// Non-success response or network error from a remote collaborator.
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// The market-data payload lacked the structure we need.
    #[error("payload for {address} could not be normalized: {reason}")]
    Normalization { address: String, reason: String },

    /// Metrics store or blacklist registry read/write failure.
    #[error("store failure: {0}")]
    Store(String),
}

impl ScreenError {
    pub fn transport(service: &'static str, err: impl std::fmt::Display) -> Self {
        ScreenError::Transport {
            service,
            message: err.to_string(),
        }
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        ScreenError::Store(err.to_string())
    }
}

impl From<sqlx::Error> for ScreenError {
    fn from(err: sqlx::Error) -> Self {
        ScreenError::Store(err.to_string())
    }
}
