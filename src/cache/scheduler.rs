//! Repeating ticker behind periodic snapshot rebuilds.

use std::ops::ControlFlow;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::util::lock::mutex_lock;

const SOURCE: &str = "cache::scheduler";

/// Owns at most one ticker task. Starting again replaces the running one.
#[derive(Default)]
pub struct RefreshScheduler {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `on_tick` every `period`, first one full period after start.
    ///
    /// The ticker ends on its own once `on_tick` returns `Break`. Must be
    /// called from within a tokio runtime.
    pub fn start<F>(&self, period: Duration, mut on_tick: F)
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await; // Skip the first immediate tick
            loop {
                interval.tick().await;
                if on_tick().is_break() {
                    break;
                }
            }
        });

        if let Some(previous) = mutex_lock(&self.handle, SOURCE, "start").replace(task) {
            previous.abort();
        }
    }

    /// Abort the ticker. Returns whether one was running; calling it again is
    /// a no-op.
    pub fn stop(&self) -> bool {
        match mutex_lock(&self.handle, SOURCE, "stop").take() {
            Some(task) => {
                let was_running = !task.is_finished();
                task.abort();
                was_running
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        mutex_lock(&self.handle, SOURCE, "is_running")
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
