use std::time::Duration;

use thiserror::Error;

use crate::sync::{StreamKind, round::RoundId};

/// Failure reported by a remote service implementation, either on a call or
/// mid-stream through a receiver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("service error: {0}")]
    Application(String),
}

impl ServiceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn application(message: impl Into<String>) -> Self {
        Self::Application(message.into())
    }
}

/// Why a round produced no snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("remote call failed: {0}")]
    Transport(String),

    #[error("{stream} stream timed out after {deadline:?}")]
    Timeout {
        stream: StreamKind,
        deadline: Duration,
    },

    #[error("remote service reported an error: {0}")]
    RemoteApplication(String),

    #[error("round {round} was superseded by a newer round")]
    Superseded { round: RoundId },
}

impl From<ServiceError> for SyncError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Transport(message) => Self::Transport(message),
            ServiceError::Application(message) => Self::RemoteApplication(message),
        }
    }
}
