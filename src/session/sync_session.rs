use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::listener::{
    ChangeListener,
    restart::{RestartOnChange, RestartReason, RestartSender, restart_channel},
};
use crate::remote::DynamicRemote;
use crate::sync::{
    client::InventorySyncClient,
    outcome::{RoundOutcome, RoundReport},
    round::RoundToken,
};

pub type ReportReceiver = watch::Receiver<Option<RoundReport>>;

/// One active period of a consumer: the remote handle and change listener are
/// held for its lifetime, and only the newest round's outcome is published.
pub struct SyncSession {
    remote: DynamicRemote,
    client: Arc<InventorySyncClient>,
    listener: Arc<RestartOnChange>,
    restarts: RestartSender,
    reports: watch::Receiver<Option<RoundReport>>,
    driver: JoinHandle<()>,
}

impl SyncSession {
    pub async fn activate(
        remote: DynamicRemote,
        client: Arc<InventorySyncClient>,
        deadline: Duration,
    ) -> Self {
        let (restarts, restart_rx) = restart_channel();
        let listener = Arc::new(RestartOnChange::new(restarts.clone()));

        if let Err(error) = remote
            .register_change_listener(listener.clone() as Arc<dyn ChangeListener>)
            .await
        {
            error!(%error, "failed to register change listener");
        }

        let (report_tx, reports) = watch::channel(None);

        info!("starting data loader");
        restarts.request(RestartReason::Activated);

        let driver = tokio::spawn(drive(
            remote.clone(),
            client.clone(),
            deadline,
            restart_rx,
            report_tx,
        ));

        Self {
            remote,
            client,
            listener,
            restarts,
            reports,
            driver,
        }
    }

    pub fn subscribe(&self) -> ReportReceiver {
        self.reports.clone()
    }

    pub fn restart(&self) -> bool {
        self.restarts.request(RestartReason::Requested)
    }

    pub async fn deactivate(self) {
        if let Err(error) = self
            .remote
            .unregister_change_listener(self.listener.id())
            .await
        {
            error!(%error, "failed to unregister change listener");
        }

        let superseded_by = self.client.supersede();
        debug!(round = %superseded_by, "session deactivated");

        self.driver.abort();
    }
}

async fn drive(
    remote: DynamicRemote,
    client: Arc<InventorySyncClient>,
    deadline: Duration,
    mut restarts: mpsc::Receiver<RestartReason>,
    reports: watch::Sender<Option<RoundReport>>,
) {
    let mut in_flight: Option<JoinHandle<()>> = None;

    while let Some(reason) = restarts.recv().await {
        let round = begin_round(&client, &reports);
        info!(%round, %reason, "restarting data loader");

        if let Some(previous) = in_flight.take() {
            previous.abort();
        }

        in_flight = Some(tokio::spawn(run(
            round,
            remote.clone(),
            client.clone(),
            deadline,
            reports.clone(),
        )));
    }

    if let Some(previous) = in_flight.take() {
        previous.abort();
    }
}

/// Starts a round while holding the report slot, so no older round can
/// publish once it has begun.
fn begin_round(
    client: &InventorySyncClient,
    reports: &watch::Sender<Option<RoundReport>>,
) -> RoundToken {
    let _slot = reports.borrow();
    client.begin_round()
}

async fn run(
    round: RoundToken,
    remote: DynamicRemote,
    client: Arc<InventorySyncClient>,
    deadline: Duration,
    reports: watch::Sender<Option<RoundReport>>,
) {
    let outcome = client.run_round(&round, remote.as_ref(), deadline).await;
    publish(&reports, &round, outcome);
}

/// Publishes the outcome if `round` is still the newest one. The check and
/// the write happen under the report slot's lock. Returns whether the report
/// became visible.
fn publish(
    reports: &watch::Sender<Option<RoundReport>>,
    round: &RoundToken,
    outcome: RoundOutcome,
) -> bool {
    reports.send_if_modified(|latest| {
        if !round.is_current() {
            debug!(%round, "discarding outcome of superseded round");
            return false;
        }

        if let Some(snapshot) = outcome.snapshot() {
            info!(
                %round,
                hooks = snapshot.hooks().len(),
                apps = snapshot.apps().len(),
                "publishing snapshot"
            );
        }
        if let Some(error) = outcome.error() {
            debug!(%round, %error, "publishing failure");
        }

        *latest = Some(RoundReport {
            round: round.id(),
            outcome,
        });
        true
    })
}
