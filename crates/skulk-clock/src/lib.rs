//! Session clock and cancellable alarms for Skulk.
//!
//! Two timing concerns live here:
//!
//! - **Session time.** Cooldown deadlines are stored and replicated as an
//!   offset from the lobby's epoch. [`Clock`] provides that offset;
//!   [`TokioClock`] reads Tokio's clock (so `tokio::time::pause()` controls
//!   it in tests) and [`ManualClock`] is stepped by hand.
//! - **Scheduled continuations.** [`Alarm`] is a one-shot, cancellable
//!   deadline meant to sit inside an actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         () = alarm.fired() => { /* deadline reached */ }
//!     }
//! }
//! ```
//!
//! An unarmed alarm pends forever, so the select simply never takes that
//! branch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// A monotonic source of "time since this session began".
pub trait Clock: Send + Sync + 'static {
    /// Elapsed time since the clock's epoch.
    fn now(&self) -> Duration;
}

/// Clock backed by `tokio::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    epoch: Instant,
}

impl TokioClock {
    /// Starts a clock whose epoch is the current instant.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::Relaxed);
    }

    /// Sets the clock to an absolute offset.
    pub fn set(&self, to: Duration) {
        self.millis.store(to.as_millis() as u64, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::Relaxed))
    }
}

// ---------------------------------------------------------------------------
// Alarm
// ---------------------------------------------------------------------------

/// A one-shot, cancellable deadline.
///
/// Scheduling while armed replaces the previous deadline. Once
/// [`fired`](Self::fired) resolves the alarm disarms itself.
#[derive(Debug, Default)]
pub struct Alarm {
    deadline: Option<Instant>,
}

impl Alarm {
    /// Creates an unarmed alarm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the alarm to fire `after` from now.
    pub fn schedule(&mut self, after: Duration) {
        let deadline = Instant::now() + after;
        if self.deadline.replace(deadline).is_some() {
            debug!(after_ms = after.as_millis() as u64, "alarm rescheduled");
        } else {
            trace!(after_ms = after.as_millis() as u64, "alarm armed");
        }
    }

    /// Disarms the alarm. Returns `true` if it was armed.
    ///
    /// Safe to call repeatedly.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.deadline.take().is_some();
        if was_armed {
            debug!("alarm cancelled");
        }
        was_armed
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the deadline, or `None` when unarmed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Resolves when the deadline passes, then disarms.
    ///
    /// Pends forever while unarmed. Cancel-safe: dropping the future
    /// leaves the deadline in place.
    pub async fn fired(&mut self) {
        let Some(deadline) = self.deadline else {
            return std::future::pending().await;
        };
        time::sleep_until(deadline).await;
        self.deadline = None;
        trace!("alarm fired");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance_and_set() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now(), Duration::from_millis(1500));

        clock.set(Duration::from_secs(10));
        assert_eq!(clock.now(), Duration::from_secs(10));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        a.advance(Duration::from_secs(3));
        assert_eq!(b.now(), Duration::from_secs(3));
    }

    #[test]
    fn test_new_alarm_is_unarmed() {
        let alarm = Alarm::new();
        assert!(!alarm.is_armed());
        assert_eq!(alarm.remaining(), None);
    }
}
