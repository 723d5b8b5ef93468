//! Supervises every asynchronous task the runtime owns (spec §4.C).

use std::future::Future;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinSet};

tokio::task_local! {
    static ON_RUNTIME_TASK: ();
}

/// Handle to a task tracked by the [`TaskManager`]; dropping it does not
/// cancel the task, only `TaskManager::cancel` does.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    abort: AbortHandle,
}

impl TaskHandle {
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Raised by `run_sync` when called from inside a task the manager itself
/// supervises (spec §4.C: "fails with `Blocked` if called from inside the
/// runtime task").
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("run_sync called from inside a TaskManager-supervised task")]
pub struct Blocked;

/// Wraps a `tokio::task::JoinSet`, giving every subsystem (connectors, OMS,
/// EMS consumer loops, the Cache flush task) a single place the Engine can
/// cancel or join at shutdown.
#[derive(Debug, Default)]
pub struct TaskManager {
    tasks: Mutex<JoinSet<()>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self { tasks: Mutex::new(JoinSet::new()) }
    }

    /// Spawns `future` onto the current Tokio runtime, tagging it as a
    /// runtime task so `run_sync` can detect re-entrancy, and tracks its
    /// `AbortHandle`.
    pub async fn create_task<F>(&self, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let wrapped = ON_RUNTIME_TASK.scope((), future);
        let abort = self.tasks.lock().await.spawn(wrapped);
        TaskHandle { abort }
    }

    /// Drains the JoinSet to completion; any task that panics is reported
    /// via `tracing::error` rather than propagated (a panicking task is a
    /// bug in that subsystem, not grounds for bringing the whole gateway
    /// down).
    pub async fn wait(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    tracing::error!(error = ?e, "supervised task panicked");
                }
            }
        }
    }

    /// Aborts every tracked task then drains the JoinSet.
    pub async fn cancel(&self) {
        let mut tasks = self.tasks.lock().await;
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
    }

    /// Runs `future` to completion from a synchronous call site (the
    /// `SyncApiCall` bridge used by strategy code), returning `Err(Blocked)`
    /// if the caller is itself running inside a task this manager spawned.
    pub fn run_sync<F>(&self, future: F) -> Result<F::Output, Blocked>
    where
        F: Future,
    {
        if ON_RUNTIME_TASK.try_with(|_| ()).is_ok() {
            return Err(Blocked);
        }
        Ok(tokio::runtime::Handle::current().block_on(future))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_completes_once_every_task_finishes() {
        let manager = TaskManager::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let counter = counter.clone();
            manager
                .create_task(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }
        manager.wait().await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn cancel_aborts_pending_tasks() {
        let manager = TaskManager::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        manager
            .create_task(async move {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                ran_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        manager.cancel().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn run_sync_from_a_supervised_task_is_blocked() {
        let manager = Arc::new(TaskManager::new());
        let inner = manager.clone();
        let handle = manager
            .create_task(async move {
                let result = inner.run_sync(async { 1 });
                assert!(result.is_err());
            })
            .await;
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
    }
}
