//! Owned background tasks.

use tokio::task::JoinHandle;

/// A spawned task that is aborted when the guard is dropped.
///
/// Tab and modal records own their event pumps and timers through this type,
/// so removing a record from its table tears the tasks down with it.
#[derive(Debug)]
pub struct TaskGuard(Option<JoinHandle<()>>);

impl TaskGuard {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self(Some(handle))
    }

    pub fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self::new(tokio::spawn(future))
    }

    /// Drop the guard without aborting the task.
    ///
    /// Used by a task that removes its own guard from shared state; aborting
    /// itself would be pointless.
    pub fn disarm(mut self) {
        self.0.take();
    }

    pub fn is_finished(&self) -> bool {
        self.0.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}
