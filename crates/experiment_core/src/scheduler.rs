use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
    time::Duration,
};

use tokio::task::JoinHandle;
use tracing::debug;

/// Delayed tasks owned by a controller. Everything still pending is aborted
/// on [`TaskScheduler::cancel_all`] or when the scheduler is dropped.
#[derive(Default)]
pub struct TaskScheduler {
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` after `delay`. Returns `false` if the scheduler is closed.
    pub fn schedule<F>(&self, label: &'static str, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_closed() {
            debug!(task = label, "scheduler closed; dropping task");
            return false;
        }

        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task.await;
        });
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
        drop(tasks);
        debug!(task = label, delay_ms = delay.as_millis() as u64, "task scheduled");
        true
    }

    pub fn pending(&self) -> usize {
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.iter().filter(|task| !task.is_finished()).count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn cancel_all(&self) {
        let tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            self.closed.store(true, Ordering::Release);
            std::mem::take(&mut *guard)
        };
        if !tasks.is_empty() {
            debug!(count = tasks.len(), "aborting scheduled tasks");
        }
        for task in tasks {
            task.abort();
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
