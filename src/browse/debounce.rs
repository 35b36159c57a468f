use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};

/// Cancels a scheduled action that has not run yet.
#[derive(Debug, Clone)]
pub struct DebounceHandle(AbortHandle);

impl DebounceHandle {
    pub fn cancel(&self) {
        self.0.abort();
    }
}

/// Runs only the last of a burst of scheduled actions.
///
/// Every [schedule](Debouncer::schedule) cancels whatever was pending, so an action runs
/// once its delay has passed without another call.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&mut self, delay: Duration, action: F) -> DebounceHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        let handle = DebounceHandle(task.abort_handle());
        self.pending = Some(task);
        handle
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().map_or(false, |task| !task.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
