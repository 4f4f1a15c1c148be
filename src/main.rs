mod config;
mod listener;
mod remote;
mod scenario;
mod session;
mod sync;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::settings::SyncSettings;
use crate::scenario::scenario::Scenario;
use crate::scenario::services::ServiceKind;
use crate::session::sync_session::SyncSession;
use crate::sync::outcome::{RoundOutcome, RoundReport};

#[derive(Debug, Clone, Parser)]
struct Args {
    #[arg(long, value_enum, default_value = "simulated")]
    pub service: ServiceKind,

    /// Overrides batch_timeout_secs from the settings file.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Stop after this many published reports; 0 runs until Ctrl-C.
    #[arg(long, default_value_t = 0)]
    pub rounds: usize,

    /// Requests a fresh round every N seconds on top of change notifications.
    #[arg(long)]
    pub refresh_secs: Option<u64>,

    /// Run a single round without listening for changes.
    #[arg(long)]
    pub once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("hooksync=info".parse()?)
                .add_directive("tokio_tungstenite=warn".parse()?),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let settings = SyncSettings::load()?;

    let deadline = match args.timeout_secs {
        Some(0) => anyhow::bail!("--timeout-secs must be > 0"),
        Some(secs) => Duration::from_secs(secs),
        None => settings.batch_timeout(),
    };

    let mut refresh = match args.refresh_secs {
        Some(0) => anyhow::bail!("--refresh-secs must be > 0"),
        Some(secs) => {
            let period = Duration::from_secs(secs);
            Some(tokio::time::interval_at(tokio::time::Instant::now() + period, period))
        }
        None => None,
    };

    let remote = Scenario::remote(args.service, settings)?;
    let client = Arc::new(Scenario::client(settings));

    if args.once {
        let outcome = client.synchronize(remote.as_ref(), deadline).await;
        render(&RoundReport {
            round: client.current_round(),
            outcome: outcome.clone(),
        });

        outcome
            .into_result()
            .context("inventory synchronization failed")?;
        return Ok(());
    }

    let session = SyncSession::activate(remote, client, deadline).await;
    let mut reports = session.subscribe();
    let mut published = 0usize;

    loop {
        tokio::select! {
            changed = reports.changed() => {
                if changed.is_err() {
                    error!("session stopped publishing reports");
                    break;
                }

                let Some(report) = reports.borrow_and_update().clone() else {
                    continue;
                };
                render(&report);

                published += 1;
                if args.rounds > 0 && published >= args.rounds {
                    break;
                }
            }

            Some(_) = async { Some(refresh.as_mut()?.tick().await) }, if refresh.is_some() => {
                if !session.restart() {
                    debug!("refresh skipped, a restart is already pending");
                }
            }

            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted");
                break;
            }
        }
    }

    session.deactivate().await;

    Ok(())
}

fn render(report: &RoundReport) {
    match &report.outcome {
        RoundOutcome::Success(snapshot) => {
            info!(
                round = %report.round,
                hooks = snapshot.hooks().len(),
                apps = snapshot.apps().len(),
                completed_at = %snapshot.completed_at(),
                "inventory loaded"
            );

            for app in snapshot.apps() {
                info!(package = %app.package_name, uid = app.uid, label = %app.label);
            }
        }
        RoundOutcome::Failure(cause) => {
            error!(round = %report.round, %cause, "inventory load failed");
        }
    }
}
