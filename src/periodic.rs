/// Periodic task scheduling for the UI thread
///
/// Nothing here spawns threads. The frame loop calls `poll(now)` and runs the
/// work when it returns true; the task is re-armed before the work runs, so
/// a tick whose work falls back to defaults still schedules the next one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared stop flag (Ctrl-C handler, window close, tests)
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct PeriodicTask {
    period: Duration,
    next_due: Option<Instant>,
    token: CancellationToken,
    ticks: u64,
}

impl PeriodicTask {
    pub fn new(period: Duration, token: CancellationToken) -> Self {
        Self {
            period,
            next_due: None,
            token,
            ticks: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks fired so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some() && !self.token.is_cancelled()
    }

    /// Queue the first tick one period after `now`
    pub fn start(&mut self, now: Instant) {
        if self.token.is_cancelled() {
            return;
        }
        self.next_due = Some(now + self.period);
    }

    /// Returns true exactly once per due tick.
    ///
    /// The next deadline is the previous deadline plus one period. If the
    /// caller fell more than a period behind, the schedule restarts from
    /// `now` instead of firing a burst of catch-up ticks.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.token.is_cancelled() {
            self.next_due = None;
            return false;
        }
        let due = match self.next_due {
            Some(due) => due,
            None => return false,
        };
        if now < due {
            return false;
        }
        let mut next = due + self.period;
        if next <= now {
            next = now + self.period;
        }
        self.next_due = Some(next);
        self.ticks += 1;
        true
    }

    /// Time left before the next tick, for repaint scheduling
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        if self.token.is_cancelled() {
            return None;
        }
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}
