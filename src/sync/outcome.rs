use crate::sync::{error::SyncError, round::RoundId};
use crate::types::snapshot::Snapshot;

/// Result of one round: a complete snapshot or the reason there is none.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    Success(Snapshot),
    Failure(SyncError),
}

impl RoundOutcome {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Self::Success(snapshot) => Some(snapshot),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<Snapshot, SyncError> {
        match self {
            Self::Success(snapshot) => Ok(snapshot),
            Self::Failure(error) => Err(error),
        }
    }
}

/// What a session hands to its consumer: the outcome of the newest round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round: RoundId,
    pub outcome: RoundOutcome,
}
