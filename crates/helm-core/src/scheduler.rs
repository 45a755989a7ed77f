//! Task Scheduler (spec §4.1, C1).
//!
//! Separates **critical** operations, which the caller synchronously awaits
//! under a timeout, from **background** operations, which are tracked for
//! lifecycle purposes (cancellation, drain) but whose result is discarded.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

use crate::error::{Result, RuntimeError};

/// Default timeout for [`Scheduler::run_critical`].
pub const DEFAULT_CRITICAL_TIMEOUT: Duration = Duration::from_secs(30);

/// A cancellation signal handed to background tasks.
///
/// Cloning is cheap; every clone observes the same cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<Option<Arc<str>>>,
}

impl CancelSignal {
    /// Whether cancellation has been requested, and if so, with what reason.
    pub fn reason(&self) -> Option<Arc<str>> {
        self.rx.borrow().clone()
    }

    /// True if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(Option::is_some).await;
    }
}

/// Diagnostic snapshot of one tracked task.
#[derive(Debug, Clone)]
pub struct TrackedTaskInfo {
    /// Unique task id.
    pub id: u64,
    /// Human-readable label.
    pub label: String,
    /// When the task was started.
    pub started_at: Instant,
}

struct TrackedTask {
    label: String,
    started_at: Instant,
    handle: tokio::task::JoinHandle<()>,
}

/// A cancellation channel for one "generation" of background tasks.
/// `cancel_all` retires the current generation's channel permanently at
/// `Some(reason)` rather than resetting it, so every already-handed-out
/// [`CancelSignal`] observes the reason durably; the next generation (the
/// next `wait_until` call) gets a fresh, un-cancelled channel.
struct CancelGeneration {
    tx: watch::Sender<Option<Arc<str>>>,
    rx: watch::Receiver<Option<Arc<str>>>,
}

impl CancelGeneration {
    fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self { tx, rx }
    }
}

/// Runs critical tasks with a timeout and tracks best-effort background
/// tasks with cooperative cancellation and drain.
pub struct Scheduler {
    tasks: Mutex<HashMap<u64, TrackedTask>>,
    next_id: AtomicU64,
    cancel: Mutex<CancelGeneration>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.get_pending_count())
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a new, empty scheduler.
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            cancel: Mutex::new(CancelGeneration::new()),
        }
    }

    /// Execute `fut` with a timeout, failing with
    /// [`RuntimeError::CriticalTimeout`] if it does not complete in time.
    #[instrument(level = "debug", skip(self, fut), fields(label = %label))]
    pub async fn run_critical<F, T>(&self, fut: F, label: &str, timeout: Duration) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        debug!("starting critical task");
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => {
                debug!("critical task finished");
                Ok(value)
            }
            Ok(Err(e)) => {
                error!(error = %e, "critical task failed");
                Err(e)
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis(), "critical task timed out");
                Err(RuntimeError::CriticalTimeout {
                    label: label.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Enqueue `fut` to run in the background and return immediately.
    ///
    /// The closure is given a live [`CancelSignal`]; errors it returns are
    /// logged but never propagated to the caller. A task started after
    /// [`Scheduler::cancel_all`] still receives a signal that is already
    /// cancelled.
    pub fn wait_until<F, Fut>(&self, label: Option<String>, f: F)
    where
        F: FnOnce(CancelSignal) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<(), TaskOutcome>> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let label = label.unwrap_or_else(|| format!("background-{id}"));
        let signal = CancelSignal {
            rx: self.cancel.lock().rx.clone(),
        };
        let label_for_task = label.clone();
        let handle = tokio::spawn(async move {
            match f(signal).await {
                Ok(()) => {
                    debug!(label = %label_for_task, "background task finished");
                }
                Err(TaskOutcome::Cancelled(reason)) => {
                    debug!(label = %label_for_task, reason = %reason, "background task cancelled");
                }
                Err(TaskOutcome::Failed(message)) => {
                    error!(label = %label_for_task, error = %message, "background task failed");
                }
            }
        });
        self.tasks.lock().insert(
            id,
            TrackedTask {
                label,
                started_at: Instant::now(),
                handle,
            },
        );
        self.reap_finished();
    }

    /// Signal every tracked task's cancellation handle with `reason`, then
    /// clear the tracking set.
    ///
    /// The current generation's channel is retired permanently at
    /// `Some(reason)`; every [`CancelSignal`] already handed out keeps
    /// observing it. A fresh, un-cancelled channel is installed for the
    /// *next* generation so a later `wait_until` doesn't start pre-cancelled.
    pub fn cancel_all(&self, reason: impl Into<Arc<str>>) {
        let reason = reason.into();
        let mut cancel = self.cancel.lock();
        let _ = cancel.tx.send(Some(reason));
        *cancel = CancelGeneration::new();
        self.tasks.lock().clear();
    }

    /// Wait until the tracked set is empty or `timeout` elapses.
    ///
    /// On timeout, logs a warning with the remaining count and returns
    /// without error. If the set is already empty, returns immediately.
    #[instrument(level = "debug", skip(self))]
    pub async fn drain(&self, timeout: Duration) {
        if self.get_pending_count() == 0 {
            debug!("drain: nothing pending");
            return;
        }
        let deadline = Instant::now() + timeout;
        loop {
            self.reap_finished();
            let remaining = self.get_pending_count();
            if remaining == 0 {
                debug!("drain complete");
                return;
            }
            if Instant::now() >= deadline {
                warn!(remaining, "drain timed out with tasks still pending");
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    /// Number of tasks currently tracked.
    pub fn get_pending_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Diagnostic info for every currently tracked task.
    pub fn get_pending_tasks(&self) -> Vec<TrackedTaskInfo> {
        self.tasks
            .lock()
            .iter()
            .map(|(&id, t)| TrackedTaskInfo {
                id,
                label: t.label.clone(),
                started_at: t.started_at,
            })
            .collect()
    }

    fn reap_finished(&self) {
        self.tasks.lock().retain(|_, t| !t.handle.is_finished());
    }
}

/// The outcome a background task reports back to the scheduler for logging
/// purposes. Cancellation is never logged as an error.
#[derive(Debug)]
pub enum TaskOutcome {
    /// The task observed its cancel signal and exited cleanly.
    Cancelled(String),
    /// The task failed for a reason other than cancellation.
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_critical_times_out_when_future_overshoots() {
        let scheduler = Scheduler::new();
        let result = scheduler
            .run_critical(
                async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, RuntimeError>(())
                },
                "slow",
                Duration::from_millis(5),
            )
            .await;
        assert!(matches!(result, Err(RuntimeError::CriticalTimeout { label, .. }) if label == "slow"));
    }

    #[tokio::test]
    async fn run_critical_propagates_the_original_error() {
        let scheduler = Scheduler::new();
        let result = scheduler
            .run_critical(
                async { Err::<(), _>(RuntimeError::WebSocketNotReady) },
                "fails",
                Duration::from_secs(1),
            )
            .await;
        assert!(matches!(result, Err(RuntimeError::WebSocketNotReady)));
    }

    #[tokio::test]
    async fn drain_returns_immediately_when_nothing_pending() {
        let scheduler = Scheduler::new();
        let start = Instant::now();
        scheduler.drain(Duration::from_secs(5)).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn cancel_all_lets_drain_observe_cancellation_reason() {
        let scheduler = Arc::new(Scheduler::new());
        let observed = Arc::new(Mutex::new(None));
        let observed_in_task = observed.clone();
        scheduler.wait_until(Some("watcher".to_string()), move |mut signal| async move {
            signal.cancelled().await;
            *observed_in_task.lock() = signal.reason();
            Ok(())
        });
        assert_eq!(scheduler.get_pending_count(), 1);

        scheduler.cancel_all("shutdown");
        scheduler.drain(Duration::from_secs(1)).await;

        assert_eq!(scheduler.get_pending_count(), 0);
        assert_eq!(observed.lock().as_deref(), Some("shutdown"));
    }

    #[tokio::test]
    async fn drain_times_out_and_reports_remaining_count() {
        let scheduler = Scheduler::new();
        scheduler.wait_until(None, |_signal| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        });
        scheduler.drain(Duration::from_millis(20)).await;
        assert_eq!(scheduler.get_pending_count(), 1);
    }
}
