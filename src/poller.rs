use std::time::{Duration, Instant};

/// Fixed-cadence deadline for the inactivity check.
///
/// The poller only keeps time; the owner decides when to arm it (a tap arrived)
/// and when to disarm it (lock, reset, teardown), and calls the session's tick
/// whenever [`poll`](Self::poll) reports a due deadline.
#[derive(Debug, Clone)]
pub struct InactivityPoller {
    interval: Duration,
    next_tick: Option<Instant>,
}

impl InactivityPoller {
    pub fn new(interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll interval must be non-zero");
        Self {
            interval,
            next_tick: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Start ticking from `now`. Re-arming an armed poller keeps its schedule.
    pub fn arm(&mut self, now: Instant) {
        if self.next_tick.is_none() {
            self.next_tick = Some(now + self.interval);
        }
    }

    pub fn disarm(&mut self) {
        self.next_tick = None;
    }

    /// How long the owner may block before the next tick; `None` when disarmed.
    pub fn timeout(&self, now: Instant) -> Option<Duration> {
        self.next_tick
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Returns `true` if a tick is due at `now` and schedules the following one.
    ///
    /// Missed deadlines collapse into a single tick instead of bursting.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_tick {
            Some(deadline) if now >= deadline => {
                let mut next = deadline + self.interval;
                if next <= now {
                    next = now + self.interval;
                }
                self.next_tick = Some(next);
                true
            }
            _ => false,
        }
    }
}
