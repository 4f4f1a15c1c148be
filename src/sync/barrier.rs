use std::time::Duration;

use tokio::sync::watch;

/// Single-use gate with a bounded wait. Released once the terminal batch of a
/// stream arrives; `reset` re-arms it.
#[derive(Debug)]
pub struct SyncBarrier {
    released: watch::Sender<bool>,
}

impl Default for SyncBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncBarrier {
    pub fn new() -> Self {
        let (released, _) = watch::channel(false);
        Self { released }
    }

    /// Returns true only for the call that actually opened the gate.
    pub fn release(&self) -> bool {
        self.released.send_if_modified(|released| {
            if *released {
                return false;
            }

            *released = true;
            true
        })
    }

    pub fn is_released(&self) -> bool {
        *self.released.borrow()
    }

    pub fn reset(&self) {
        self.released.send_replace(false);
    }

    /// Waits until released or until `deadline` elapses. Returns whether the
    /// barrier was released in time.
    pub async fn wait(&self, deadline: Duration) -> bool {
        let mut released = self.released.subscribe();

        matches!(
            tokio::time::timeout(deadline, released.wait_for(|released| *released)).await,
            Ok(Ok(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn release_before_wait_returns_immediately() {
        let barrier = SyncBarrier::new();
        barrier.release();

        let started = Instant::now();
        assert!(barrier.wait(Duration::from_secs(5)).await);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gives_up_exactly_at_the_deadline() {
        let barrier = SyncBarrier::new();

        let started = Instant::now();
        assert!(!barrier.wait(Duration::from_secs(5)).await);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn release_from_another_task_wakes_the_waiter() {
        let barrier = Arc::new(SyncBarrier::new());

        tokio::spawn({
            let barrier = barrier.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                barrier.release();
            }
        });

        let started = Instant::now();
        assert!(barrier.wait(Duration::from_secs(5)).await);
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn release_is_idempotent() {
        let barrier = SyncBarrier::new();

        assert!(barrier.release());
        assert!(!barrier.release());
        assert!(barrier.is_released());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_rearms_the_barrier() {
        let barrier = SyncBarrier::new();
        barrier.release();
        barrier.reset();

        assert!(!barrier.is_released());
        assert!(!barrier.wait(Duration::from_millis(10)).await);
        assert!(barrier.release());
    }
}
