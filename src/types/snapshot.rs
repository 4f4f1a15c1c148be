use chrono::{DateTime, Utc};

use crate::sync::round::RoundId;
use crate::types::{app_entry::AppEntry, hook::Hook};

/// Both collections of one completed round. Only ever built from fully
/// terminated streams.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    round: RoundId,
    hooks: Vec<Hook>,
    apps: Vec<AppEntry>,
    completed_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(round: RoundId, hooks: Vec<Hook>, apps: Vec<AppEntry>) -> Self {
        Self {
            round,
            hooks,
            apps,
            completed_at: Utc::now(),
        }
    }

    pub fn round(&self) -> RoundId {
        self.round
    }

    pub fn hooks(&self) -> &[Hook] {
        &self.hooks
    }

    pub fn apps(&self) -> &[AppEntry] {
        &self.apps
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}
