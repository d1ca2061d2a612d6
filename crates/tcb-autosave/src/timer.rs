//! Resettable one-shot timer

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type Action = Arc<dyn Fn() -> bool + Send + Sync>;

/// Runs an action once `interval` has passed without another reset
///
/// Each [`reset`](Self::reset) aborts the scheduled run and starts a new
/// wait. Outside a tokio runtime there is nothing to schedule on: the run
/// stays pending until [`fire_now`](Self::fire_now) or [`cancel`](Self::cancel).
pub struct DebounceTimer {
    interval: Duration,
    action: Action,
    scheduled: Mutex<Option<JoinHandle<()>>>,
    deferred: AtomicBool,
}

impl DebounceTimer {
    /// Timer running `action` after `interval` of quiet
    ///
    /// The action's return value is handed back by [`fire_now`](Self::fire_now).
    pub fn new(interval: Duration, action: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            interval,
            action: Arc::new(action),
            scheduled: Mutex::new(None),
            deferred: AtomicBool::new(false),
        }
    }

    /// Quiet period before the action runs
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Restart the wait, dropping any scheduled run
    pub fn reset(&self) {
        let mut scheduled = self.scheduled.lock();
        if let Some(previous) = scheduled.take() {
            previous.abort();
        }
        match Handle::try_current() {
            Ok(runtime) => {
                let action = Arc::clone(&self.action);
                let interval = self.interval;
                *scheduled = Some(runtime.spawn(async move {
                    tokio::time::sleep(interval).await;
                    action();
                }));
            }
            Err(_) => {
                if !self.deferred.swap(true, Ordering::SeqCst) {
                    tracing::debug!("no async runtime; debounced action waits for fire_now");
                }
            }
        }
    }

    /// Drop the scheduled run, if any
    ///
    /// Returns whether a run was still waiting.
    pub fn cancel(&self) -> bool {
        let deferred = self.deferred.swap(false, Ordering::SeqCst);
        let scheduled = match self.scheduled.lock().take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        };
        deferred || scheduled
    }

    /// Cancel the wait and run the action on the calling thread
    ///
    /// Returns what the action returned.
    pub fn fire_now(&self) -> bool {
        self.cancel();
        (self.action)()
    }

    /// Whether a run is scheduled and has not happened yet
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deferred.load(Ordering::SeqCst)
            || self
                .scheduled
                .lock()
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }
}

impl fmt::Debug for DebounceTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceTimer")
            .field("interval", &self.interval)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.scheduled.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(interval_ms: u64) -> (DebounceTimer, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let timer = DebounceTimer::new(Duration::from_millis(interval_ms), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        (timer, runs)
    }

    #[tokio::test(start_paused = true)]
    async fn resets_coalesce_into_one_run() {
        let (timer, runs) = counting(100);
        for _ in 0..5 {
            timer.reset();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(timer.is_pending());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_run() {
        let (timer, runs) = counting(100);
        timer.reset();
        assert!(timer.cancel());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn fire_now_runs_once_without_waiting() {
        let (timer, runs) = counting(100);
        timer.reset();
        assert!(timer.fire_now());
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn waits_for_fire_now_without_runtime() {
        let (timer, runs) = counting(100);
        for _ in 0..3 {
            timer.reset();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(timer.is_pending());

        assert!(timer.fire_now());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[test]
    fn cancel_drops_deferred_run_without_runtime() {
        let (timer, runs) = counting(100);
        timer.reset();
        assert!(timer.cancel());
        assert!(!timer.is_pending());
        assert!(!timer.cancel());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
