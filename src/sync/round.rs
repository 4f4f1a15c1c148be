use std::fmt;
use std::future;

use tokio::sync::watch;

/// Generation number of a synchronization round. Later rounds compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RoundId(u64);

impl RoundId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Hands out round tokens. Beginning a round invalidates every token issued
/// before it.
#[derive(Debug)]
pub struct RoundCounter {
    current: watch::Sender<RoundId>,
}

impl Default for RoundCounter {
    fn default() -> Self {
        let (current, _) = watch::channel(RoundId::default());
        Self { current }
    }
}

impl RoundCounter {
    pub fn begin(&self) -> RoundToken {
        let mut id = RoundId::default();
        self.current.send_modify(|current| {
            *current = current.next();
            id = *current;
        });

        RoundToken {
            id,
            current: self.current.subscribe(),
        }
    }

    pub fn current(&self) -> RoundId {
        *self.current.borrow()
    }
}

/// Identity of one round, checked by everything that mutates round state.
#[derive(Debug, Clone)]
pub struct RoundToken {
    id: RoundId,
    current: watch::Receiver<RoundId>,
}

impl RoundToken {
    pub fn id(&self) -> RoundId {
        self.id
    }

    pub fn is_current(&self) -> bool {
        *self.current.borrow() == self.id
    }

    /// Resolves once a newer round has begun. Never resolves if the counter
    /// is gone, since nothing can supersede the round anymore.
    pub async fn superseded(&self) {
        let mut current = self.current.clone();
        if current.wait_for(|id| *id != self.id).await.is_err() {
            future::pending::<()>().await;
        }
    }
}

impl fmt::Display for RoundToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, formatter)
    }
}
