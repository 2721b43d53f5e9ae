//! Close-intercept and save-before-quit sequencing.
//!
//! `Running -> CloseIntercepted -> Saving -> Quitting`. The first close
//! request is intercepted so the UI stays alive to answer the save's
//! requests; later close requests are ignored until the save has finished
//! or the hard timeout has passed. Whatever the save does (succeed, fail,
//! panic, hang) the sequence always ends in `Quitting`.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    CloseIntercepted,
    Saving,
    Quitting,
}

/// How the save attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveReport {
    Saved,
    Failed(String),
    Panicked,
    TimedOut,
}

pub struct ShutdownCoordinator {
    phase: Mutex<ShutdownPhase>,
    hard_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(hard_timeout: Duration) -> Self {
        Self {
            phase: Mutex::new(ShutdownPhase::Running),
            hard_timeout,
        }
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.phase.lock()
    }

    pub fn is_quitting(&self) -> bool {
        self.phase() == ShutdownPhase::Quitting
    }

    /// Record a close request. Returns true only for the first one, which
    /// must then drive [`run`](Self::run).
    pub fn intercept_close(&self) -> bool {
        let mut phase = self.phase.lock();
        if *phase == ShutdownPhase::Running {
            *phase = ShutdownPhase::CloseIntercepted;
            true
        } else {
            debug_log!("SESSION", "Close requested again during {:?}", *phase);
            false
        }
    }

    /// Run the save with the hard timeout and move to `Quitting`.
    ///
    /// The save runs as its own task so a panic inside it is contained.
    pub async fn run<F>(&self, save: F) -> SaveReport
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        *self.phase.lock() = ShutdownPhase::Saving;

        let mut task = tokio::spawn(save);
        let report = match tokio::time::timeout(self.hard_timeout, &mut task).await {
            Ok(Ok(Ok(()))) => SaveReport::Saved,
            Ok(Ok(Err(e))) => SaveReport::Failed(format!("{e:#}")),
            Ok(Err(join_error)) if join_error.is_panic() => SaveReport::Panicked,
            Ok(Err(join_error)) => SaveReport::Failed(join_error.to_string()),
            Err(_) => {
                task.abort();
                SaveReport::TimedOut
            }
        };

        match &report {
            SaveReport::Saved => log::info!("Session saved, quitting"),
            SaveReport::Failed(e) => log::error!("Session save failed, quitting anyway: {}", e),
            SaveReport::Panicked => log::error!("Session save panicked, quitting anyway"),
            SaveReport::TimedOut => log::error!(
                "Session save did not finish within {:?}, quitting anyway",
                self.hard_timeout
            ),
        }

        *self.phase.lock() = ShutdownPhase::Quitting;
        report
    }
}
