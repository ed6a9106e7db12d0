use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::warn;

use crate::error::AppResult;
use crate::event::TripEvent;

/// Handle for a change-feed watcher. The feed is a scoped resource: acquire
/// it in a page's `init`, release it in `cleanup` (or by dropping the
/// handle) and the watcher task stops immediately.
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(channel: String, task: JoinHandle<()>) -> Self {
        Self { channel, task }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Explicit release; equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns a polling watcher that emits an event whenever the fetched
/// snapshot differs from the previous one. The first poll happens one
/// interval after subscribing; failed polls are logged and retried on the
/// next tick.
pub(crate) fn spawn_poller<F, Fut, T, E>(
    channel: String,
    poll_interval: Duration,
    mut fetch: F,
    events: UnboundedSender<TripEvent>,
    mut to_event: E,
) -> Subscription
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
    T: PartialEq + Clone + Send + 'static,
    E: FnMut(T) -> TripEvent + Send + 'static,
{
    let label = channel.clone();
    let task = tokio::spawn(async move {
        let mut ticker = time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The interval's first tick completes immediately; consume it so the
        // first poll lands one full interval after subscribing.
        ticker.tick().await;

        let mut last: Option<T> = None;
        loop {
            ticker.tick().await;
            match fetch().await {
                Ok(snapshot) => {
                    if last.as_ref() != Some(&snapshot) {
                        last = Some(snapshot.clone());
                        if events.send(to_event(snapshot)).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!(channel = %label, "change feed poll failed: {err}");
                }
            }
        }
    });

    Subscription::new(channel, task)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use tokio::sync::mpsc::unbounded_channel;

    use super::spawn_poller;
    use crate::event::TripEvent;

    #[tokio::test(start_paused = true)]
    async fn poller_emits_only_on_change() {
        let (tx, mut rx) = unbounded_channel();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_fetch = Arc::clone(&calls);

        let subscription = spawn_poller(
            "available-trips".to_string(),
            Duration::from_millis(50),
            move || {
                let calls = Arc::clone(&calls_in_fetch);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    // Same snapshot for the first two polls, then a change.
                    Ok(if n < 2 { vec![] } else { vec![()] })
                }
            },
            tx,
            |snapshot: Vec<()>| TripEvent::Available(Vec::with_capacity(snapshot.len())),
        );
        assert_eq!(subscription.channel(), "available-trips");

        // First snapshot (empty) is new relative to no snapshot at all.
        let first = rx.recv().await.expect("first change should arrive");
        assert_eq!(first, TripEvent::Available(vec![]));

        // The unchanged second poll emits nothing; the third differs.
        let second = rx.recv().await.expect("second change should arrive");
        assert_eq!(second, TripEvent::Available(vec![]));
        assert!(calls.load(Ordering::SeqCst) >= 3);

        subscription.unsubscribe();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_subscription_stops_the_watcher() {
        let (tx, mut rx) = unbounded_channel();
        let subscription = spawn_poller(
            "trip:42".to_string(),
            Duration::from_millis(10),
            || async { Ok(1u32) },
            tx,
            |_| TripEvent::Available(vec![]),
        );

        let _ = rx.recv().await;
        drop(subscription);

        // After the abort the sender is gone and the channel drains.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.recv().await.is_none());
    }
}
