//! # Repeat scheduler: turns a [`TaskEventAction`] into repeat ticks.
//!
//! ```text
//! start(Nothing)      → Scheduled::Nothing    (no timer)
//! start(Once)         → Scheduled::Immediate  (caller dispatches one event now)
//! start(Repeat{I})    → Scheduled::Timer      (tick at I, 2I, 3I, ... after start)
//!
//!            ┌──────── timer task ────────┐
//! interval ──► tick(epoch) ──► true  ──► keep going
//!            │               └─► false ──► exit (owner gone)
//!  cancel ───┘──► exit
//! ```
//!
//! ## Rules
//! - At most one timer is active; `start` always stops the previous one first.
//! - Ticks of a stopped timer are recognised by their epoch ([`RepeatScheduler::is_current`]),
//!   so a tick already in flight when the timer was replaced is never dispatched.
//! - The first repeat tick fires one full period after `start` (no immediate tick).
//! - Late ticks are delayed, not bunched up (`MissedTickBehavior::Delay`).

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::model::{TaskEventAction, TaskEventType};

/// What [`RepeatScheduler::start`] set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scheduled {
    /// No repeat events for this action.
    Nothing,
    /// Exactly one repeat event, to be dispatched by the caller right away.
    Immediate,
    /// A periodic timer is running.
    Timer { period: Duration },
}

struct Timer {
    token: CancellationToken,
    join: JoinHandle<()>,
}

/// Owns the (single) repeat timer of a supervisor.
pub(crate) struct RepeatScheduler {
    min_period: Duration,
    epoch: u64,
    timer: Option<Timer>,
}

impl RepeatScheduler {
    /// Creates an idle scheduler; repeat periods are clamped to at least `min_period`.
    pub(crate) fn new(min_period: Duration) -> Self {
        Self {
            min_period: min_period.max(Duration::from_millis(1)),
            epoch: 0,
            timer: None,
        }
    }

    /// Replaces the current schedule with `action`.
    ///
    /// For `Repeat`, spawns a timer calling `tick(epoch)` on every period; the timer
    /// exits when `tick` returns `false`. Must be called within a Tokio runtime.
    pub(crate) fn start<F>(&mut self, action: TaskEventAction, tick: F) -> Scheduled
    where
        F: Fn(u64) -> bool + Send + 'static,
    {
        self.stop();

        match action.kind {
            TaskEventType::Nothing => Scheduled::Nothing,
            TaskEventType::Once => Scheduled::Immediate,
            TaskEventType::Repeat => {
                let period = action.interval().max(self.min_period);
                self.epoch += 1;
                let epoch = self.epoch;
                let token = CancellationToken::new();
                let join = tokio::spawn(run_timer(period, epoch, token.clone(), tick));
                self.timer = Some(Timer { token, join });
                Scheduled::Timer { period }
            }
        }
    }

    /// Cancels the active timer, if any. Idempotent.
    pub(crate) fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.token.cancel();
            timer.join.abort();
        }
    }

    /// True if a timer is running.
    pub(crate) fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    /// True if `epoch` belongs to the timer that is running now.
    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.timer.is_some() && self.epoch == epoch
    }
}

impl Drop for RepeatScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_timer<F>(period: Duration, epoch: u64, token: CancellationToken, tick: F)
where
    F: Fn(u64) -> bool,
{
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                if !tick(epoch) {
                    break;
                }
            }
        }
    }
}
