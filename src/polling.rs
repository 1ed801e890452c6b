/// Fixed-interval polling drivers.
///
/// The backend has no push channel, so every view that shows live data owns
/// one or more pollers. A poller fires on a wall-clock schedule (fixed rate
/// from the start, not from completion), runs `poll`, and hands the result to
/// `apply`. Overlapping polls race with "last response wins" semantics; the
/// default policy instead skips a tick while a poll is still outstanding.
///
/// Cancelling the handle (explicitly or by dropping it) stops the timer and
/// guarantees that no outstanding poll applies its result afterwards.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::logging::{self, LogSource};

/// What to do when a tick fires while the previous poll is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Issue the poll anyway. Responses may resolve out of order.
    Allow,
    /// Skip the tick; the next one gets a fresh chance.
    #[serde(alias = "skip")]
    SkipWhileInFlight,
}

/// When the first poll happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstTick {
    Immediate,
    /// The owner already loaded once; wait a full period.
    AfterPeriod,
}

/// What `apply` made of one completed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The result replaced the owner's state.
    Applied,
    /// A normal response with nothing to apply (e.g. no reading yet).
    Ignored,
    /// The fetch failed; the owner kept its previous state.
    Failed,
}

/// Counters describing a poller's lifetime so far. Polls abandoned at
/// cancellation count as attempted only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub attempted: u64,
    pub applied: u64,
    pub failed: u64,
    pub skipped: u64,
}

#[derive(Default)]
struct Counters {
    attempted: AtomicU64,
    applied: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PollStats {
        PollStats {
            attempted: self.attempted.load(Ordering::SeqCst),
            applied: self.applied.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }

    fn record(&self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Applied => self.applied.fetch_add(1, Ordering::SeqCst),
            PollOutcome::Failed => self.failed.fetch_add(1, Ordering::SeqCst),
            PollOutcome::Ignored => return,
        };
    }
}

/// Owner's handle on a running poller.
pub struct PollingHandle {
    name: String,
    token: CancellationToken,
    counters: Arc<Counters>,
    task: Option<JoinHandle<()>>,
}

impl PollingHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> PollStats {
        self.counters.snapshot()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stops the timer. Outstanding polls are abandoned without applying.
    pub fn cancel(&mut self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let stats = self.stats();
        logging::log_poll_summary(
            LogSource::Poller,
            &self.name,
            stats.attempted,
            stats.applied,
            stats.failed,
        );
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Starts a poller on the current tokio runtime.
///
/// `poll` produces one fetch per tick; `apply` receives each completed
/// result unless the poller was cancelled in the meantime. The outcome
/// `apply` reports only feeds the statistics.
pub fn spawn_poller<P, Fut, T, A>(
    name: &str,
    period: Duration,
    first_tick: FirstTick,
    policy: OverlapPolicy,
    poll: P,
    apply: A,
) -> PollingHandle
where
    P: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
    A: Fn(T) -> PollOutcome + Send + Sync + 'static,
{
    let token = CancellationToken::new();
    let counters = Arc::new(Counters::default());
    let in_flight = Arc::new(AtomicBool::new(false));
    let apply = Arc::new(apply);

    let start = match first_tick {
        FirstTick::Immediate => Instant::now(),
        FirstTick::AfterPeriod => Instant::now() + period,
    };

    let loop_token = token.clone();
    let loop_counters = Arc::clone(&counters);
    let loop_name = name.to_string();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = loop_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if policy == OverlapPolicy::SkipWhileInFlight && in_flight.swap(true, Ordering::SeqCst) {
                loop_counters.skipped.fetch_add(1, Ordering::SeqCst);
                logging::debug(
                    LogSource::Poller,
                    None,
                    &format!("{}: previous poll still in flight, skipping tick", loop_name),
                );
                continue;
            }

            loop_counters.attempted.fetch_add(1, Ordering::SeqCst);
            let fetch = poll();
            let token = loop_token.clone();
            let counters = Arc::clone(&loop_counters);
            let in_flight = Arc::clone(&in_flight);
            let apply = Arc::clone(&apply);

            tokio::spawn(async move {
                let result = tokio::select! {
                    _ = token.cancelled() => return,
                    result = fetch => result,
                };
                in_flight.store(false, Ordering::SeqCst);
                if token.is_cancelled() {
                    return;
                }
                counters.record((*apply)(result));
            });
        }
    });

    PollingHandle {
        name: name.to_string(),
        token,
        counters,
        task: Some(task),
    }
}
