use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::remote::RemoteInventoryService;
use crate::sync::{
    StreamKind,
    collector::BatchCollector,
    error::{ServiceError, SyncError},
    outcome::RoundOutcome,
    round::{RoundCounter, RoundId, RoundToken},
};
use crate::types::{app_entry::AppEntry, hook::Hook, snapshot::Snapshot};

/// Per-stream budget used when the consumer does not configure one.
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Pulls hooks, then applications, from the remote service and assembles
/// them into a snapshot. Each round gets fresh collectors; starting a round
/// supersedes every earlier one.
#[derive(Debug, Default)]
pub struct InventorySyncClient {
    rounds: RoundCounter,
    debug_hooks: Option<PathBuf>,
}

impl InventorySyncClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the hook definitions at `source` to the service before every
    /// round. Only meant for debug builds.
    pub fn with_debug_hooks(mut self, source: impl Into<PathBuf>) -> Self {
        self.debug_hooks = Some(source.into());
        self
    }

    pub fn begin_round(&self) -> RoundToken {
        self.rounds.begin()
    }

    /// Invalidates every outstanding round without starting a new one.
    pub fn supersede(&self) -> RoundId {
        self.rounds.begin().id()
    }

    pub fn current_round(&self) -> RoundId {
        self.rounds.current()
    }

    pub async fn synchronize(
        &self,
        remote: &dyn RemoteInventoryService,
        deadline: Duration,
    ) -> RoundOutcome {
        let round = self.begin_round();
        self.run_round(&round, remote, deadline).await
    }

    pub async fn run_round(
        &self,
        round: &RoundToken,
        remote: &dyn RemoteInventoryService,
        deadline: Duration,
    ) -> RoundOutcome {
        info!(%round, ?deadline, "inventory round started");

        let hooks = Arc::new(BatchCollector::new(StreamKind::Hooks, round.clone()));
        let apps = Arc::new(BatchCollector::new(StreamKind::Applications, round.clone()));

        let result = tokio::select! {
            result = self.collect(remote, &hooks, &apps, deadline) => result,
            _ = round.superseded() => Err(SyncError::Superseded { round: round.id() }),
        };

        match result {
            Ok((hooks, apps)) => {
                info!(%round, hooks = hooks.len(), apps = apps.len(), "inventory round finished");
                RoundOutcome::Success(Snapshot::new(round.id(), hooks, apps))
            }
            Err(error) => {
                hooks.discard();
                apps.discard();

                warn!(%round, %error, "inventory round failed");
                RoundOutcome::Failure(error)
            }
        }
    }

    async fn collect(
        &self,
        remote: &dyn RemoteInventoryService,
        hooks: &Arc<BatchCollector<Hook>>,
        apps: &Arc<BatchCollector<AppEntry>>,
        deadline: Duration,
    ) -> Result<(Vec<Hook>, Vec<AppEntry>), SyncError> {
        if let Some(source) = &self.debug_hooks {
            info!(source = %source.display(), "pushing debug hooks");
            remote.push_debug_hooks(source).await?;
        }

        let hook_items = pull(hooks, remote.stream_hooks(hooks.clone()), deadline).await?;

        /* NOTE: apps are requested only after hooks loaded */
        let app_items = pull(apps, remote.stream_apps(apps.clone()), deadline).await?;

        Ok((hook_items, app_items))
    }
}

/// Opens one stream and waits for its terminal batch. The window covers the
/// remote call and the wait.
async fn pull<T>(
    collector: &BatchCollector<T>,
    open: impl Future<Output = Result<(), ServiceError>>,
    deadline: Duration,
) -> Result<Vec<T>, SyncError> {
    let stream = collector.stream();
    let opened_at = Instant::now();

    match tokio::time::timeout(deadline, open).await {
        Ok(result) => result?,
        Err(_) => return Err(SyncError::Timeout { stream, deadline }),
    }

    let remaining = deadline.saturating_sub(opened_at.elapsed());
    if !collector.barrier().wait(remaining).await {
        warn!(%stream, received = collector.len(), "stream did not terminate in time");
        return Err(SyncError::Timeout { stream, deadline });
    }

    Ok(collector.finish()?)
}
