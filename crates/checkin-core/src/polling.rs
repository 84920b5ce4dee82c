//! Cancellable periodic fetch tasks.
//!
//! Both the station stats poller and the dashboard refresh are built on
//! `spawn_polling_task`: a spawned loop that runs a fetch on every tick (and
//! whenever its refresh trigger fires) and sends each successful result to
//! the owning view over an mpsc channel. The view applies results on its
//! own `&mut self`, replacing its cache wholesale.
//!
//! Failed fetches are logged and the loop carries on; the view keeps its
//! previous data until the next successful cycle.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Refresh period shared by the station poller and the dashboard.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Buffer size for poll result channels
pub(crate) const CHANNEL_BUFFER_SIZE: usize = 16;

/// Asks a polling task for an immediate out-of-band fetch.
///
/// Firing does not reset the task's interval; the next scheduled tick
/// still happens on time. Fires that arrive while a fetch is running
/// collapse into a single follow-up fetch.
#[derive(Clone, Debug, Default)]
pub struct RefreshTrigger {
    notify: Arc<Notify>,
}

impl RefreshTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.notify.notify_one();
    }

    pub(crate) async fn fired(&self) {
        self.notify.notified().await;
    }
}

/// Handle to a running polling task. Cancelling (or dropping) the handle
/// stops the timer; a fetch that is still in flight is abandoned and its
/// result is never delivered.
#[derive(Debug)]
pub struct PollHandle {
    name: &'static str,
    cancel: CancellationToken,
    refresh: RefreshTrigger,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn refresh_trigger(&self) -> RefreshTrigger {
        self.refresh.clone()
    }

    pub fn refresh_now(&self) {
        self.refresh.fire();
    }

    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!(task = self.name, "Stopping polling task");
            self.cancel.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the spawned loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn a loop that runs `fetch` immediately, then every `period`, and
/// again whenever the returned handle's refresh trigger fires.
///
/// Successful results are sent on `tx`. The loop ends when the handle is
/// cancelled or the receiver is dropped.
pub fn spawn_polling_task<T, E, F, Fut>(
    name: &'static str,
    period: Duration,
    tx: mpsc::Sender<T>,
    fetch: F,
) -> PollHandle
where
    T: Send + 'static,
    E: Display + Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let refresh = RefreshTrigger::new();

    let task = {
        let cancel = cancel.clone();
        let refresh = refresh.clone();

        tokio::spawn(async move {
            info!(task = name, ?period, "Polling task started");
            let mut ticker = tokio::time::interval(period);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => debug!(task = name, "Scheduled poll"),
                    _ = refresh.fired() => debug!(task = name, "Manual refresh"),
                }

                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    result = fetch() => result,
                };

                match result {
                    Ok(value) => {
                        let delivered = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => false,
                            sent = tx.send(value) => sent.is_ok(),
                        };
                        if !delivered {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(task = name, error = %e, "Poll failed, keeping previous data");
                    }
                }
            }

            info!(task = name, "Polling task stopped");
        })
    };

    PollHandle {
        name,
        cancel,
        refresh,
        task,
    }
}
