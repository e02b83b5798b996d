use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Quiet period before a search keystroke turns into a request.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Emits a pushed value only once no newer value arrived for `delay`.
///
/// Each push cancels the emission still pending from the previous one.
pub struct Debouncer<T> {
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            delay,
            tx,
            pending: None,
        };
        (debouncer, rx)
    }

    pub fn push(&mut self, value: T) {
        self.cancel();
        let tx = self.tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(value);
        }));
    }

    /// Drops the pending value, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Duration};

    async fn settle() {
        // Lets spawned timer tasks observe the advanced clock.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_pushes_emit_only_the_last_value() {
        let (mut debouncer, mut rx) = Debouncer::new(SEARCH_DEBOUNCE);

        debouncer.push("b");
        advance(Duration::from_millis(100)).await;
        debouncer.push("bo");
        advance(Duration::from_millis(100)).await;
        debouncer.push("bob");
        settle().await;

        advance(Duration::from_millis(299)).await;
        settle().await;
        assert!(rx.try_recv().is_err());

        advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(rx.try_recv().unwrap(), "bob");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_pushes_each_emit() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(50));

        debouncer.push(1);
        assert_eq!(rx.recv().await, Some(1));
        debouncer.push(2);
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_value() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(50));

        debouncer.push(1);
        debouncer.cancel();
        advance(Duration::from_millis(100)).await;
        settle().await;
        assert!(rx.try_recv().is_err());
    }
}
