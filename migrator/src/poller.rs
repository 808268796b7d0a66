//! Cancellable fixed-interval polling.
//!
//! A poll runs `step` once per period, starting one period after spawn,
//! until the step breaks or the handle is cancelled or dropped. The
//! teardown hook runs exactly once in either case.

use {
    log::*,
    std::{future::Future, ops::ControlFlow, time::Duration},
    tokio::{
        sync::watch,
        task::JoinHandle,
        time::{self, Instant, MissedTickBehavior},
    },
};

type TeardownHook = Box<dyn FnOnce() + Send + 'static>;

struct Teardown(Option<TeardownHook>);

impl Drop for Teardown {
    fn drop(&mut self) {
        if let Some(hook) = self.0.take() {
            hook();
        }
    }
}

pub struct ScheduledPoll {
    period: Duration,
    teardown: Option<TeardownHook>,
}

impl ScheduledPoll {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            teardown: None,
        }
    }

    pub fn on_teardown(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.teardown = Some(Box::new(hook));
        self
    }

    /// Must be called inside a tokio runtime. The receiver holds `None`
    /// until the step breaks with a value.
    pub fn spawn<T, F, Fut>(self, mut step: F) -> (PollHandle, watch::Receiver<Option<T>>)
    where
        T: Send + Sync + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<T>> + Send + 'static,
    {
        let (sender, receiver) = watch::channel(None);
        let period = self.period;
        let teardown = Teardown(self.teardown);
        let task = tokio::spawn(async move {
            // dropped with the task, whether it finishes or is aborted
            let _teardown = teardown;
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut runs = 0u64;
            loop {
                interval.tick().await;
                runs += 1;
                if let ControlFlow::Break(value) = step().await {
                    debug!("poll finished after {} runs", runs);
                    let _ = sender.send(Some(value));
                    break;
                }
            }
        });
        (PollHandle { task }, receiver)
    }
}

/// Owner of a running poll. Dropping it cancels the poll.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn cancel(&self) {
        if !self.task.is_finished() {
            debug!("poll cancelled");
        }
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
