pub mod error;
pub mod types;

pub use error::{RetryError, Result};
pub use types::{RetryPolicy, RetryStatistics};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::classifier::{self, ErrorContext};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(30);
const STALE_AFTER: chrono::Duration = chrono::Duration::hours(24);

/// A restart callback: given a file path, attempt to resume its transfer.
pub type RestartFn = Arc<dyn Fn(String) -> BoxFuture<'static, crate::error::Result<()>> + Send + Sync>;
/// A give-up callback: given a file path and the final error message, mark
/// the transfer permanently failed.
pub type FailFn = Arc<dyn Fn(String, String) -> BoxFuture<'static, ()> + Send + Sync>;

struct Task {
    retry_count: u32,
    next_attempt: DateTime<Utc>,
    last_attempt: DateTime<Utc>,
    context: ErrorContext,
    timer: JoinHandle<()>,
}

struct Inner {
    tasks: RwLock<HashMap<String, Task>>,
    policy: RetryPolicy,
    restart: RestartFn,
    fail: FailFn,
}

/// Delayed, cancelable re-dispatch of failed transfers.
///
/// Mirrors the teacher's `send_with_retry`/`send_with_backoff` hand-rolled
/// exponential backoff, generalized to per-file scheduling with a timer per
/// task instead of a loop around one send.
pub struct RetryScheduler {
    inner: Arc<Inner>,
    cleanup: JoinHandle<()>,
}

impl RetryScheduler {
    pub fn new(policy: RetryPolicy, restart: RestartFn, fail: FailFn) -> Self {
        let inner = Arc::new(Inner {
            tasks: RwLock::new(HashMap::new()),
            policy,
            restart,
            fail,
        });

        let cleanup_inner = inner.clone();
        let cleanup = tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let now = Utc::now();
                cleanup_inner
                    .tasks
                    .write()
                    .retain(|_, t| now.signed_duration_since(t.last_attempt) < STALE_AFTER);
            }
        });

        Self { inner, cleanup }
    }

    /// Classifies `error_message`, and if the recommended action is `Retry`,
    /// arms a timer for `path` at the computed backoff delay. Returns
    /// `false` (and schedules nothing) for any other action.
    pub fn schedule(&self, path: String, error_message: String, retry_count: u32) -> bool {
        schedule_on(&self.inner, path, error_message, retry_count)
    }

    async fn fire(inner: Arc<Inner>, path: String) {
        let (retry_count, escalate) = {
            let mut tasks = inner.tasks.write();
            match tasks.remove(&path) {
                Some(task) => {
                    let escalate = task
                        .context
                        .should_escalate(task.retry_count, inner.policy.max_retries);
                    (task.retry_count, escalate)
                }
                None => return, // cancelled before the timer fired
            }
        };

        if escalate {
            tracing::warn!(path = %path, "retry history escalated, giving up");
            crate::metrics::record_retry_escalated();
            (inner.fail)(path, "retry history escalated".to_string()).await;
            return;
        }

        match (inner.restart)(path.clone()).await {
            Ok(()) => {}
            Err(err) => {
                tracing::warn!(path = %path, %err, "retry attempt failed, rescheduling");
                if !schedule_on(&inner, path.clone(), err.to_string(), retry_count + 1) {
                    (inner.fail)(path, err.to_string()).await;
                }
            }
        }
    }

    /// Cancels the pending retry for `path`, if any.
    pub fn cancel(&self, path: &str) {
        if let Some(task) = self.inner.tasks.write().remove(path) {
            task.timer.abort();
        }
    }

    pub fn statistics(&self) -> RetryStatistics {
        let tasks = self.inner.tasks.read();
        let now = Utc::now();
        let scheduled = tasks.len();
        let overdue = tasks.values().filter(|t| t.next_attempt < now).count();
        let max_retry_count = tasks.values().map(|t| t.retry_count).max().unwrap_or(0);
        let total_retry_count: u32 = tasks.values().map(|t| t.retry_count).sum();
        let average_retry_count = if scheduled > 0 {
            total_retry_count as f64 / scheduled as f64
        } else {
            0.0
        };
        RetryStatistics {
            scheduled,
            pending: scheduled,
            overdue,
            max_retry_count,
            total_retry_count,
            average_retry_count,
        }
    }

    /// Cancels the cleanup loop and every pending timer.
    pub fn stop(&self) {
        self.cleanup.abort();
        let mut tasks = self.inner.tasks.write();
        for (_, task) in tasks.drain() {
            task.timer.abort();
        }
    }
}

impl Drop for RetryScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Shared scheduling logic used both by the public `schedule` entry point
/// and by the timer-fire path when it reschedules after a failed restart.
fn schedule_on(inner: &Arc<Inner>, path: String, error_message: String, retry_count: u32) -> bool {
    let category = classifier::classify(&error_message);
    let action = classifier::recommend_action(category, retry_count, &inner.policy);
    if action != classifier::Action::Retry {
        tracing::warn!(path = %path, %retry_count, "retry scheduler declined to reschedule");
        return false;
    }

    let delay = classifier::retry_delay(&inner.policy, retry_count);
    let now = Utc::now();

    let mut tasks = inner.tasks.write();
    let existing = tasks.remove(&path);
    if let Some(existing) = &existing {
        existing.timer.abort();
    }
    let mut context = existing.map(|t| t.context).unwrap_or_default();
    context.record(error_message);

    let timer_inner = inner.clone();
    let timer_path = path.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        RetryScheduler::fire(timer_inner, timer_path).await;
    });

    tasks.insert(
        path,
        Task {
            retry_count,
            next_attempt: now + chrono::Duration::from_std(delay).unwrap_or_default(),
            last_attempt: now,
            context,
            timer,
        },
    );
    crate::metrics::record_retry_scheduled();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop_fns() -> (RestartFn, FailFn, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let restart_calls = Arc::new(AtomicUsize::new(0));
        let fail_calls = Arc::new(AtomicUsize::new(0));
        let rc = restart_calls.clone();
        let fc = fail_calls.clone();
        let restart: RestartFn = Arc::new(move |_path| {
            rc.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        });
        let fail: FailFn = Arc::new(move |_path, _err| {
            fc.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        });
        (restart, fail, restart_calls, fail_calls)
    }

    #[tokio::test]
    async fn schedule_declines_non_recoverable_errors() {
        let (restart, fail, _, _) = noop_fns();
        let scheduler = RetryScheduler::new(RetryPolicy::default(), restart, fail);
        let scheduled = scheduler.schedule("f".into(), "file not found".into(), 0);
        assert!(!scheduled);
        scheduler.stop();
    }

    #[tokio::test]
    async fn schedule_accepts_recoverable_errors_and_fires_restart() {
        let mut policy = RetryPolicy::default();
        policy.initial_delay = Duration::from_millis(10);
        policy.max_delay = Duration::from_millis(10);

        let (restart, fail, restart_calls, _) = noop_fns();
        let scheduler = RetryScheduler::new(policy, restart, fail);
        assert!(scheduler.schedule("f".into(), "connection timeout".into(), 0));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(restart_calls.load(Ordering::SeqCst), 1);
        scheduler.stop();
    }

    #[tokio::test]
    async fn cancel_prevents_timer_from_firing() {
        let mut policy = RetryPolicy::default();
        policy.initial_delay = Duration::from_millis(50);

        let (restart, fail, restart_calls, _) = noop_fns();
        let scheduler = RetryScheduler::new(policy, restart, fail);
        scheduler.schedule("f".into(), "connection timeout".into(), 0);
        scheduler.cancel("f");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(restart_calls.load(Ordering::SeqCst), 0);
        scheduler.stop();
    }

    #[tokio::test]
    async fn rescheduling_identical_error_does_not_grow_history() {
        let (restart, fail, _, _) = noop_fns();
        let scheduler = RetryScheduler::new(RetryPolicy::default(), restart, fail);
        scheduler.schedule("f".into(), "connection timeout".into(), 1);
        scheduler.schedule("f".into(), "connection timeout".into(), 1);

        let tasks = scheduler.inner.tasks.read();
        assert_eq!(tasks.get("f").unwrap().context.len(), 1);
        drop(tasks);
        scheduler.stop();
    }

    #[tokio::test]
    async fn rescheduling_a_distinct_error_grows_history() {
        let (restart, fail, _, _) = noop_fns();
        let scheduler = RetryScheduler::new(RetryPolicy::default(), restart, fail);
        scheduler.schedule("f".into(), "connection timeout".into(), 1);
        scheduler.schedule("f".into(), "network unreachable".into(), 1);

        let tasks = scheduler.inner.tasks.read();
        assert_eq!(tasks.get("f").unwrap().context.len(), 2);
        drop(tasks);
        scheduler.stop();
    }
}
