use std::mem;
use std::sync::{Mutex, MutexGuard};

use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::sync::{
    StreamKind, StreamReceiver, barrier::SyncBarrier, error::ServiceError, round::RoundToken,
};
use crate::types::batch::Batch;

/// Accumulates one stream of one round and releases the stream's barrier on
/// the terminal batch. Tagged with the round it belongs to; callbacks from a
/// superseded round never touch it.
#[derive(Debug)]
pub struct BatchCollector<T> {
    stream: StreamKind,
    round: RoundToken,
    barrier: SyncBarrier,
    closed: watch::Sender<bool>,
    state: Mutex<CollectorState<T>>,
}

#[derive(Debug)]
struct CollectorState<T> {
    items: Vec<T>,
    batches: usize,
    error: Option<ServiceError>,
    phase: Phase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Terminated,
    Closed,
}

impl<T> BatchCollector<T> {
    pub fn new(stream: StreamKind, round: RoundToken) -> Self {
        Self {
            stream,
            round,
            barrier: SyncBarrier::new(),
            closed: watch::channel(false).0,
            state: Mutex::new(CollectorState {
                items: Vec::new(),
                batches: 0,
                error: None,
                phase: Phase::Open,
            }),
        }
    }

    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    pub fn barrier(&self) -> &SyncBarrier {
        &self.barrier
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Takes the accumulated items, or the error the stream ended with, and
    /// closes the collector against further callbacks.
    pub fn finish(&self) -> Result<Vec<T>, ServiceError> {
        let mut state = self.lock();
        state.phase = Phase::Closed;
        self.closed.send_replace(true);

        match state.error.take() {
            Some(error) => {
                state.items.clear();
                Err(error)
            }
            None => Ok(mem::take(&mut state.items)),
        }
    }

    /// Drops everything received so far and closes the collector.
    pub fn discard(&self) {
        let mut state = self.lock();
        state.phase = Phase::Closed;
        state.items.clear();
        state.error = None;
        self.closed.send_replace(true);
    }

    fn lock(&self) -> MutexGuard<'_, CollectorState<T>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn accepts(&self, state: &CollectorState<T>, what: &str) -> bool {
        if !self.round.is_current() {
            debug!(round = %self.round, stream = %self.stream, "ignoring {what} from superseded round");
            return false;
        }

        match state.phase {
            Phase::Open => true,
            Phase::Terminated => {
                warn!(round = %self.round, stream = %self.stream, "ignoring {what} after terminal batch");
                false
            }
            Phase::Closed => {
                debug!(round = %self.round, stream = %self.stream, "ignoring {what} after round ended");
                false
            }
        }
    }
}

impl<T: Send> StreamReceiver<T> for BatchCollector<T> {
    fn transfer(&self, batch: Batch<T>) {
        let mut state = self.lock();
        if !self.accepts(&state, "batch") {
            return;
        }

        let received = batch.items.len();
        state.items.extend(batch.items);
        state.batches += 1;

        info!(
            round = %self.round,
            stream = %self.stream,
            received,
            total = state.items.len(),
            last = batch.last,
            "received batch"
        );

        if batch.last {
            state.phase = Phase::Terminated;
            drop(state);
            self.barrier.release();
        }
    }

    fn fail(&self, error: ServiceError) {
        let mut state = self.lock();
        if !self.accepts(&state, "error") {
            return;
        }

        warn!(round = %self.round, stream = %self.stream, %error, "stream failed");

        state.items.clear();
        state.error = Some(error);
        state.phase = Phase::Terminated;
        drop(state);
        self.barrier.release();
    }

    fn closed(&self) -> BoxFuture<'static, ()> {
        let mut closed = self.closed.subscribe();
        let round = self.round.clone();

        Box::pin(async move {
            tokio::select! {
                _ = closed.wait_for(|closed| *closed) => {}
                _ = round.superseded() => {}
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::sync::round::RoundCounter;

    fn collector(counter: &RoundCounter) -> BatchCollector<u32> {
        BatchCollector::new(StreamKind::Hooks, counter.begin())
    }

    #[test]
    fn concatenates_batches_in_delivery_order() {
        let counter = RoundCounter::default();
        let collector = collector(&counter);

        collector.transfer(Batch::partial(vec![3, 1]));
        collector.transfer(Batch::partial(vec![]));
        collector.transfer(Batch::partial(vec![4]));
        assert!(!collector.barrier().is_released());

        collector.transfer(Batch::last(vec![1, 5]));
        assert!(collector.barrier().is_released());
        assert_eq!(collector.finish(), Ok(vec![3, 1, 4, 1, 5]));
    }

    #[test]
    fn batches_after_the_terminal_one_are_ignored() {
        let counter = RoundCounter::default();
        let collector = collector(&counter);

        collector.transfer(Batch::last(vec![1]));
        collector.transfer(Batch::last(vec![2]));

        assert_eq!(collector.finish(), Ok(vec![1]));
    }

    #[test]
    fn superseded_round_callbacks_do_not_mutate_state() {
        let counter = RoundCounter::default();
        let stale = collector(&counter);
        counter.begin();

        stale.transfer(Batch::last(vec![7]));

        assert_eq!(stale.len(), 0);
        assert!(!stale.barrier().is_released());
    }

    #[test]
    fn failure_releases_the_barrier_and_drops_items() {
        let counter = RoundCounter::default();
        let collector = collector(&counter);

        collector.transfer(Batch::partial(vec![1, 2]));
        collector.fail(ServiceError::application("package manager unavailable"));

        assert!(collector.barrier().is_released());
        assert_eq!(
            collector.finish(),
            Err(ServiceError::application("package manager unavailable"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn closed_resolves_when_the_round_ends() {
        let counter = RoundCounter::default();
        let collector = collector(&counter);
        let closed = collector.closed();

        assert!(timeout(Duration::from_secs(1), collector.closed()).await.is_err());

        collector.discard();
        assert!(timeout(Duration::from_secs(1), closed).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_resolves_when_the_round_is_superseded() {
        let counter = RoundCounter::default();
        let stale = collector(&counter);
        let closed = stale.closed();

        counter.begin();
        assert!(timeout(Duration::from_secs(1), closed).await.is_ok());
    }

    #[test]
    fn callbacks_after_finish_are_ignored() {
        let counter = RoundCounter::default();
        let collector = collector(&counter);

        collector.discard();
        collector.transfer(Batch::last(vec![9]));

        assert_eq!(collector.len(), 0);
        assert!(!collector.barrier().is_released());
    }
}
