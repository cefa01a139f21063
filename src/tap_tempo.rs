use std::collections::VecDeque;

use crate::settings::TapSettings;

/// Averages below this many seconds are treated as "no usable interval".
const MIN_INTERVAL_SECS: f64 = 1e-6;

/// Largest rolling window accepted.
pub const MAX_WINDOW_TAPS: usize = 1024;

/// Whether the estimator still accepts taps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockState {
    #[default]
    Unlocked,
    Locked,
}

/// How much tap history backs the current estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TapConfidence {
    Low,
    Medium,
    High,
}

impl TapConfidence {
    fn from_tap_count(count: usize) -> Option<Self> {
        match count {
            0..=3 => None,
            4..=5 => Some(Self::Low),
            6..=7 => Some(Self::Medium),
            _ => Some(Self::High),
        }
    }
}

/// Result of registering a single tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapOutcome {
    /// The estimator is locked; the tap was dropped.
    Ignored,
    /// The tap was recorded but there is not enough data for an estimate yet.
    Pending { taps: usize },
    /// A fresh estimate derived from the current window.
    Estimate { bpm: f64, taps: usize },
}

/// Rolling-window tap-tempo estimator with an inactivity lock.
///
/// Timestamps are seconds on any monotonic clock chosen by the caller.
///
/// ```
/// use bpm_boogaloo::tap_tempo::{TapOutcome, TapTempo};
///
/// let mut tapper = TapTempo::new(4, 12, 2.0);
/// let mut last = TapOutcome::Ignored;
/// for t in [0.0, 0.5, 1.0, 1.5] {
///     last = tapper.add_tap(t);
/// }
/// assert!(matches!(last, TapOutcome::Estimate { .. }));
/// ```
#[derive(Debug, Clone)]
pub struct TapTempo {
    min_taps: usize,
    max_taps: usize,
    inactivity_secs: f64,
    taps: VecDeque<f64>,
    last_tap: Option<f64>,
    lock: LockState,
    bpm: Option<f64>,
}

impl TapTempo {
    /// Create a new tap-tempo estimator.
    ///
    /// * `min_taps` – number of taps required before a BPM is produced.
    /// * `max_taps` – size of the rolling window; older taps are evicted first.
    /// * `inactivity_secs` – idle time after the last tap before the estimate locks.
    pub fn new(min_taps: usize, max_taps: usize, inactivity_secs: f64) -> Self {
        assert!(min_taps >= 2, "at least two taps are required to compute BPM");
        assert!(max_taps >= min_taps, "window must hold at least `min_taps` taps");
        assert!(max_taps <= MAX_WINDOW_TAPS, "window may hold at most {MAX_WINDOW_TAPS} taps");
        assert!(inactivity_secs > 0.0, "inactivity threshold must be positive");

        Self {
            min_taps,
            max_taps,
            inactivity_secs,
            taps: VecDeque::with_capacity(max_taps + 1),
            last_tap: None,
            lock: LockState::Unlocked,
            bpm: None,
        }
    }

    pub fn from_settings(settings: &TapSettings) -> Self {
        Self::new(settings.min_taps, settings.max_taps, settings.inactivity_secs)
    }

    /// Register a tap at the supplied timestamp (seconds).
    ///
    /// Taps are dropped while locked, and so are taps older than the previous one.
    /// The estimate is computed over the whole window before it is trimmed back to
    /// `max_taps`.
    pub fn add_tap(&mut self, timestamp_sec: f64) -> TapOutcome {
        if self.lock == LockState::Locked {
            log::debug!("tap ignored: estimate is locked");
            return TapOutcome::Ignored;
        }

        if let Some(last) = self.last_tap {
            if timestamp_sec < last {
                log::debug!("tap ignored: {timestamp_sec:.3}s is before last tap {last:.3}s");
                return TapOutcome::Ignored;
            }
        }

        self.taps.push_back(timestamp_sec);
        self.last_tap = Some(timestamp_sec);

        let count = self.taps.len();
        let estimate = if count < self.min_taps {
            None
        } else {
            self.average_interval()
                .filter(|avg| *avg > MIN_INTERVAL_SECS)
                .map(|avg| 60.0 / avg)
        };

        while self.taps.len() > self.max_taps {
            self.taps.pop_front();
        }

        match estimate {
            Some(bpm) => {
                log::debug!("tap #{count}: {bpm:.2} BPM");
                self.bpm = Some(bpm);
                TapOutcome::Estimate { bpm, taps: count }
            }
            None => {
                log::debug!("tap #{count}: waiting for more data");
                TapOutcome::Pending { taps: count }
            }
        }
    }

    fn average_interval(&self) -> Option<f64> {
        let first = *self.taps.front()?;
        let last = *self.taps.back()?;
        let intervals = self.taps.len().checked_sub(1).filter(|n| *n > 0)?;
        // Consecutive differences telescope to last - first.
        Some((last - first) / intervals as f64)
    }

    /// Freeze the current estimate. Idempotent.
    pub fn lock(&mut self) {
        if self.lock == LockState::Unlocked {
            log::info!("tap tempo locked at {:?} BPM", self.bpm);
        }
        self.lock = LockState::Locked;
    }

    /// Clear the tap history and the held estimate, returning to `Unlocked`. Idempotent.
    pub fn reset(&mut self) {
        self.taps.clear();
        self.last_tap = None;
        self.bpm = None;
        self.lock = LockState::Unlocked;
    }

    /// Lock the estimate if no tap arrived for longer than the inactivity threshold.
    ///
    /// Returns `true` only on the call that performs the transition.
    pub fn check_inactivity(&mut self, now_sec: f64) -> bool {
        if self.lock == LockState::Locked {
            return false;
        }
        let Some(last) = self.last_tap else {
            return false;
        };
        if now_sec - last > self.inactivity_secs {
            log::info!("no tap for {:.2}s, locking", now_sec - last);
            self.lock = LockState::Locked;
            return true;
        }
        false
    }

    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    pub fn is_locked(&self) -> bool {
        self.lock == LockState::Locked
    }

    /// Latest estimate, held across lock until reset.
    pub fn bpm(&self) -> Option<f64> {
        self.bpm
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn last_tap(&self) -> Option<f64> {
        self.last_tap
    }

    pub fn confidence(&self) -> Option<TapConfidence> {
        TapConfidence::from_tap_count(self.taps.len())
    }

    /// Whether the caller should keep polling [`check_inactivity`](Self::check_inactivity).
    pub fn awaiting_inactivity(&self) -> bool {
        self.lock == LockState::Unlocked && self.last_tap.is_some()
    }
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::from_settings(&TapSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::{LockState, TapConfidence, TapOutcome, TapTempo};

    fn feed(tapper: &mut TapTempo, taps: &[f64]) -> TapOutcome {
        let mut outcome = TapOutcome::Ignored;
        for &t in taps {
            outcome = tapper.add_tap(t);
        }
        outcome
    }

    fn bpm_of(outcome: TapOutcome) -> f64 {
        match outcome {
            TapOutcome::Estimate { bpm, .. } => bpm,
            other => panic!("expected an estimate, got {other:?}"),
        }
    }

    #[test]
    fn computes_expected_bpm() {
        let mut tapper = TapTempo::new(4, 12, 2.0);

        let bpm = bpm_of(feed(&mut tapper, &[0.0, 0.5, 1.0, 1.5])); // 120 BPM
        assert!((bpm - 120.0).abs() < 1e-6);
        assert_eq!(tapper.bpm(), Some(bpm));
    }

    #[test]
    fn first_three_taps_are_pending() {
        let mut tapper = TapTempo::default();

        assert_eq!(tapper.add_tap(0.0), TapOutcome::Pending { taps: 1 });
        assert_eq!(tapper.add_tap(0.4), TapOutcome::Pending { taps: 2 });
        assert_eq!(tapper.add_tap(0.8), TapOutcome::Pending { taps: 3 });
        assert!(tapper.bpm().is_none());
        assert!(matches!(tapper.add_tap(1.2), TapOutcome::Estimate { taps: 4, .. }));
    }

    #[test]
    fn constant_interval_converges() {
        for interval in [0.25, 0.4, 0.5, 0.75, 1.0] {
            let mut tapper = TapTempo::default();
            let taps: Vec<f64> = (0..20).map(|i| 3.0 + i as f64 * interval).collect();
            let bpm = bpm_of(feed(&mut tapper, &taps));
            assert!((bpm - 60.0 / interval).abs() < 1e-6, "interval {interval}");
        }
    }

    #[test]
    fn varying_intervals_use_mean_interval() {
        let mut tapper = TapTempo::default();
        // intervals 0.5, 0.4, 0.6, 0.3 -> mean 0.45
        let bpm = bpm_of(feed(&mut tapper, &[0.0, 0.5, 0.9, 1.5, 1.8]));
        assert!((bpm - 60.0 / 0.45).abs() < 1e-6);
    }

    #[test]
    fn window_is_bounded_and_rolls() {
        let mut tapper = TapTempo::default();
        let mut taps: Vec<f64> = (0..12).map(|i| i as f64 * 0.5).collect();
        feed(&mut tapper, &taps);
        assert_eq!(tapper.tap_count(), 12);

        // 13th tap still averages over 13 taps, then the oldest is evicted.
        tapper.add_tap(6.0);
        assert_eq!(tapper.tap_count(), 12);

        // Four more taps at 0.25s: the last estimate spans 2.0s..=7.0s.
        let mut t = 6.0;
        for _ in 0..4 {
            t += 0.25;
            taps.push(t);
        }
        let bpm = bpm_of(feed(&mut tapper, &taps[12..]));
        let expected = 60.0 / ((8.0 * 0.5 + 4.0 * 0.25) / 12.0);
        assert!((bpm - expected).abs() < 1e-6);
        assert!(bpm > 120.0);
    }

    #[test]
    fn old_tempo_is_forgotten_after_a_full_window() {
        let mut tapper = TapTempo::default();
        let mut t = 0.0;
        for _ in 0..12 {
            tapper.add_tap(t);
            t += 0.5;
        }
        let mut outcome = TapOutcome::Ignored;
        for _ in 0..13 {
            outcome = tapper.add_tap(t);
            t += 0.25;
        }
        let bpm = bpm_of(outcome);
        assert!((bpm - 240.0).abs() < 1e-6);
    }

    #[test]
    fn duplicate_timestamps_do_not_divide_by_zero() {
        let mut tapper = TapTempo::default();
        let outcome = feed(&mut tapper, &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(outcome, TapOutcome::Pending { taps: 4 });
        assert!(tapper.bpm().is_none());
    }

    #[test]
    fn out_of_order_tap_is_dropped() {
        let mut tapper = TapTempo::default();
        feed(&mut tapper, &[1.0, 1.5]);
        assert_eq!(tapper.add_tap(1.2), TapOutcome::Ignored);
        assert_eq!(tapper.tap_count(), 2);
    }

    #[test]
    fn taps_are_ignored_while_locked() {
        let mut tapper = TapTempo::default();
        let bpm = bpm_of(feed(&mut tapper, &[0.0, 0.5, 1.0, 1.5]));
        tapper.lock();
        tapper.lock();
        assert_eq!(tapper.lock_state(), LockState::Locked);
        assert_eq!(tapper.add_tap(2.0), TapOutcome::Ignored);
        assert_eq!(tapper.bpm(), Some(bpm));
        assert_eq!(tapper.tap_count(), 4);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut tapper = TapTempo::default();
        feed(&mut tapper, &[0.0, 0.5, 1.0, 1.5]);
        tapper.lock();

        tapper.reset();
        let once = format!("{tapper:?}");
        tapper.reset();
        assert_eq!(format!("{tapper:?}"), once);

        assert_eq!(tapper.lock_state(), LockState::Unlocked);
        assert_eq!(tapper.tap_count(), 0);
        assert!(tapper.bpm().is_none());
        assert!(tapper.last_tap().is_none());
    }

    #[test]
    fn locks_after_inactivity() {
        let mut tapper = TapTempo::default();
        tapper.add_tap(10.0);

        assert!(!tapper.check_inactivity(11.99));
        assert_eq!(tapper.lock_state(), LockState::Unlocked);

        assert!(tapper.check_inactivity(12.01));
        assert_eq!(tapper.lock_state(), LockState::Locked);
        assert!(!tapper.check_inactivity(20.0));
    }

    #[test]
    fn inactivity_needs_a_tap() {
        let mut tapper = TapTempo::default();
        assert!(!tapper.awaiting_inactivity());
        assert!(!tapper.check_inactivity(1_000.0));
        assert_eq!(tapper.lock_state(), LockState::Unlocked);
    }

    #[test]
    fn confidence_grows_with_taps() {
        let mut tapper = TapTempo::default();
        let mut seen = Vec::new();
        for i in 0..9 {
            tapper.add_tap(i as f64 * 0.5);
            seen.push(tapper.confidence());
        }
        assert_eq!(seen[2], None);
        assert_eq!(seen[3], Some(TapConfidence::Low));
        assert_eq!(seen[5], Some(TapConfidence::Medium));
        assert_eq!(seen[8], Some(TapConfidence::High));
    }

    #[test]
    #[should_panic]
    fn rejects_window_smaller_than_minimum() {
        TapTempo::new(4, 3, 2.0);
    }

    #[test]
    #[should_panic]
    fn rejects_oversized_window() {
        TapTempo::new(4, usize::MAX, 2.0);
    }

    #[test]
    fn largest_window_is_accepted() {
        let tapper = TapTempo::new(4, super::MAX_WINDOW_TAPS, 2.0);
        assert_eq!(tapper.tap_count(), 0);
    }
}
