//! Detached background work.
//!
//! Cache writes, trims and revalidations never delay the response they
//! belong to. They run on a shared `JoinSet`; each task logs its own
//! failures. [`BackgroundTasks::settle`] waits for everything spawned so far,
//! which lets tests and shutdown observe the store deterministically.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

/// Handle to the worker's detached tasks. Clones share the same set.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    set: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a fire-and-forget task on the current runtime.
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(done) = set.try_join_next() {
            log_join_result(done);
        }
        tracing::trace!(task = label, pending = set.len(), "spawning background task");
        set.spawn(task);
    }

    /// Number of tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.set.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait until every task spawned so far (and any they spawn) has finished.
    pub async fn settle(&self) {
        loop {
            let mut batch = std::mem::take(&mut *self.set.lock().unwrap_or_else(PoisonError::into_inner));
            if batch.is_empty() {
                return;
            }
            while let Some(done) = batch.join_next().await {
                log_join_result(done);
            }
        }
    }
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks").field("pending", &self.pending()).finish()
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        tracing::error!("background task panicked: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_settle_waits_for_all() {
        let tasks = BackgroundTasks::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for i in 0..5 {
            let counter = counter.clone();
            tasks.spawn("count", async move {
                tokio::time::sleep(Duration::from_millis(10 * i)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tasks.settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_settle_follows_nested_spawns() {
        let tasks = BackgroundTasks::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_tasks = tasks.clone();
        let inner_counter = counter.clone();
        tasks.spawn("outer", async move {
            inner_tasks.spawn("inner", async move {
                inner_counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        tasks.settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_settle_survives_panics() {
        let tasks = BackgroundTasks::new();
        tasks.spawn("boom", async { panic!("boom") });
        tasks.settle().await;
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_settle_empty() {
        BackgroundTasks::new().settle().await;
    }
}
