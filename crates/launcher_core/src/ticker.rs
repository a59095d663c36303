use std::{future::Future, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

/// Background task that is aborted when its owner drops it.
pub struct ScopedTask {
    handle: JoinHandle<()>,
}

impl ScopedTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Fixed-period job. The first tick fires immediately.
///
/// Ticks missed while the process was suspended or the job overran are not
/// replayed; the schedule restarts from the moment the late tick fires.
pub struct PeriodicTask {
    _task: ScopedTask,
    period: Duration,
}

impl PeriodicTask {
    pub fn spawn<F, Fut>(period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // `interval` panics on a zero period.
        let period = period.max(Duration::from_millis(1));
        let task = ScopedTask::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                job().await;
            }
        });
        Self {
            _task: task,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[cfg(test)]
#[path = "tests/ticker_tests.rs"]
mod tests;
