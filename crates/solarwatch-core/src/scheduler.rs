//! Periodic fetch-with-fallback task runner.
//!
//! A [`PollingScheduler`] owns one tokio task that:
//! 1. invokes the source immediately, then once per interval
//! 2. never overlaps invocations (a slow fetch delays the next tick)
//! 3. substitutes the source's fallback on any error and logs it
//! 4. hands every value, live or fallback, to a sink closure
//! 5. stops for good on [`teardown`](PollingScheduler::teardown)
//!
//! In-flight fetches run on their own task and are left to finish after
//! teardown; their result is dropped instead of reaching the sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::ApiResult;

/// Shortest interval a scheduler accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

/// Cloneable cancellation token. Triggering is idempotent and permanent.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|&stop| stop).await;
    }
}

// ---------------------------------------------------------------------------
// PollSource
// ---------------------------------------------------------------------------

/// Something a scheduler can poll: a fallible fetch plus its stand-in value.
#[async_trait]
pub trait PollSource: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> ApiResult<Self::Output>;

    /// Value delivered when `fetch` fails.
    fn fallback(&self) -> Self::Output;
}

// ---------------------------------------------------------------------------
// PollingScheduler
// ---------------------------------------------------------------------------

/// Handle to a running poll loop. Dropping the handle tears the loop down.
pub struct PollingScheduler {
    name: &'static str,
    shutdown: Shutdown,
    task: Option<JoinHandle<()>>,
}

impl PollingScheduler {
    /// Start polling `source` every `interval`, feeding results to `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S, K>(source: S, interval: Duration, mut sink: K) -> Self
    where
        S: PollSource,
        K: FnMut(S::Output) + Send + 'static,
    {
        let name = source.name();
        let shutdown = Shutdown::new();
        let token = shutdown.clone();
        let source = Arc::new(source);
        let period = interval.max(MIN_INTERVAL);

        debug!("{name}: polling every {period:?}");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let src = Arc::clone(&source);
                let mut call = tokio::spawn(async move { src.fetch().await });

                let joined = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    joined = &mut call => Some(joined),
                };
                let Some(joined) = joined else { break };

                let value = match joined {
                    Ok(Ok(value)) => value,
                    Ok(Err(e)) => {
                        warn!("{name}: {e}; using fallback");
                        source.fallback()
                    }
                    Err(e) => {
                        warn!("{name}: fetch task failed ({e}); using fallback");
                        source.fallback()
                    }
                };
                if token.is_triggered() {
                    break;
                }
                sink(value);
            }
            debug!("{name}: stopped");
        });

        Self {
            name,
            shutdown,
            task: Some(task),
        }
    }

    /// Stop scheduling. Safe to call any number of times.
    pub fn teardown(&self) {
        if !self.shutdown.is_triggered() {
            debug!("{}: teardown", self.name);
        }
        self.shutdown.trigger();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Tear down and wait for the loop to exit.
    pub async fn join(mut self) {
        self.teardown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
