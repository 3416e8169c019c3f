//! Named delayed/repeating callbacks.
//!
//! The scheduler keeps a single list ordered by next fire time and knows
//! nothing about the network. The connection loop asks it for the next
//! deadline to bound its wait, and calls [`TimerScheduler::process`] after
//! every wake-up.
//!
//! Callbacks receive a caller-chosen context `C`; in the bot this is the
//! plugin facade, so a timer can issue commands exactly like a handler.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::TimerError;

/// Callback invoked when a timer fires.
pub type TimerCallback<C> = Box<dyn FnMut(&mut C) -> anyhow::Result<()>>;

/// Remaining repetitions of a timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    /// Fires until deleted.
    Forever,
    /// Fires this many more times.
    Times(u32),
}

impl Repeat {
    /// Convert a repetition count; `0` means forever.
    pub fn from_count(reps: u32) -> Self {
        if reps == 0 {
            Repeat::Forever
        } else {
            Repeat::Times(reps)
        }
    }

    /// Account for one firing. Returns `None` when no repetitions remain.
    fn consume(self) -> Option<Self> {
        match self {
            Repeat::Forever => Some(Repeat::Forever),
            Repeat::Times(n) if n > 1 => Some(Repeat::Times(n - 1)),
            Repeat::Times(_) => None,
        }
    }
}

struct Timer<C> {
    name: String,
    fire_at: Instant,
    interval: Duration,
    remaining: Repeat,
    callback: TimerCallback<C>,
}

/// Time-ordered set of named timers.
pub struct TimerScheduler<C> {
    /// Sorted ascending by `fire_at`; equal times keep insertion order.
    timers: Vec<Timer<C>>,
}

impl<C> TimerScheduler<C> {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self { timers: Vec::new() }
    }

    /// Arm a timer that first fires `delay` from now.
    ///
    /// `reps == 0` repeats forever. Adding a name that is already armed
    /// creates a second, independent timer.
    pub fn add(&mut self, name: impl Into<String>, delay: Duration, reps: u32, callback: TimerCallback<C>) {
        self.add_at(Instant::now(), name, delay, reps, callback);
    }

    /// Arm a timer relative to an explicit `now`.
    pub fn add_at(
        &mut self,
        now: Instant,
        name: impl Into<String>,
        delay: Duration,
        reps: u32,
        callback: TimerCallback<C>,
    ) {
        let name = name.into();
        debug!(timer = %name, delay_secs = delay.as_secs_f64(), reps, "Adding timer");
        self.insert(Timer {
            name,
            fire_at: now + delay,
            interval: delay,
            remaining: Repeat::from_count(reps),
            callback,
        });
    }

    fn insert(&mut self, timer: Timer<C>) {
        let pos = self.timers.partition_point(|t| t.fire_at <= timer.fire_at);
        self.timers.insert(pos, timer);
    }

    /// Remove the earliest-scheduled timer with this name.
    pub fn delete(&mut self, name: &str) -> Result<(), TimerError> {
        match self.timers.iter().position(|t| t.name == name) {
            Some(pos) => {
                debug!(timer = %name, "Deleting timer");
                self.timers.remove(pos);
                Ok(())
            }
            None => {
                warn!(timer = %name, "Timer not found");
                Err(TimerError::NotFound(name.to_string()))
            }
        }
    }

    /// Fire every timer due at `now`, in fire-time order.
    ///
    /// A failing or panicking callback is logged and does not stop the
    /// remaining timers. A repeating timer is re-armed `interval` after
    /// `now`, not after its original target time, and cannot fire twice in
    /// one call. Returns the delay until the earliest remaining timer.
    pub fn process(&mut self, now: Instant, ctx: &mut C) -> Option<Duration> {
        let due = self.timers.partition_point(|t| t.fire_at <= now);
        let fired: Vec<Timer<C>> = self.timers.drain(..due).collect();

        for mut timer in fired {
            debug!(timer = %timer.name, "Executing timer");
            match catch_unwind(AssertUnwindSafe(|| (timer.callback)(ctx))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(timer = %timer.name, error = %e, "Failed to execute timer"),
                Err(_) => warn!(timer = %timer.name, "Timer callback panicked"),
            }

            if let Some(remaining) = timer.remaining.consume() {
                debug!(timer = %timer.name, ?remaining, "Re-adding timer");
                timer.remaining = remaining;
                timer.fire_at = now + timer.interval;
                self.insert(timer);
            }
        }

        self.next_delay(now)
    }

    /// Delay from `now` until the earliest timer, or `None` if none are armed.
    pub fn next_delay(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|at| at.saturating_duration_since(now))
    }

    /// Fire time of the earliest timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.first().map(|t| t.fire_at)
    }

    /// Whether any timer with this name is armed.
    pub fn contains(&self, name: &str) -> bool {
        self.timers.iter().any(|t| t.name == name)
    }

    /// Names of armed timers in fire order.
    pub fn names(&self) -> Vec<&str> {
        self.timers.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl<C> Default for TimerScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}
