use std::fmt;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::listener::ChangeListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    Activated,
    DataChanged,
    PackageChanged,
    Requested,
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activated => write!(f, "activated"),
            Self::DataChanged => write!(f, "data changed"),
            Self::PackageChanged => write!(f, "package changed"),
            Self::Requested => write!(f, "requested"),
        }
    }
}

/// Restart requests share a single slot; while one is pending, further
/// requests collapse into it.
pub fn restart_channel() -> (RestartSender, mpsc::Receiver<RestartReason>) {
    let (tx, rx) = mpsc::channel(1);
    (RestartSender { tx }, rx)
}

#[derive(Debug, Clone)]
pub struct RestartSender {
    tx: mpsc::Sender<RestartReason>,
}

impl RestartSender {
    /// Returns false if the request was coalesced or nobody is listening.
    pub fn request(&self, reason: RestartReason) -> bool {
        match self.tx.try_send(reason) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(%reason, "restart already pending; coalescing");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(%reason, "restart requested after session ended");
                false
            }
        }
    }
}

/// Listener that turns either notification into a fresh round.
#[derive(Debug)]
pub struct RestartOnChange {
    id: Uuid,
    restarts: RestartSender,
}

impl RestartOnChange {
    pub fn new(restarts: RestartSender) -> Self {
        Self {
            id: Uuid::new_v4(),
            restarts,
        }
    }
}

impl ChangeListener for RestartOnChange {
    fn id(&self) -> Uuid {
        self.id
    }

    fn on_data_changed(&self) {
        info!("data changed");
        self.restarts.request(RestartReason::DataChanged);
    }

    fn on_package_changed(&self) {
        info!("package changed");
        self.restarts.request(RestartReason::PackageChanged);
    }
}
