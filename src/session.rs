use crate::{
    derivation::{DerivedBpmSet, TipResult, TransitionTip},
    format::{parse_bpm, usable_bpm, BpmFormat},
    pitch::{PitchRange, PitchShift},
    settings::{Settings, SettingsError, TapSettings},
    tap_tempo::{LockState, TapConfidence, TapOutcome, TapTempo},
};

/// Everything the front-end talks to: tap estimation, manual entry, pitch and
/// the derived transition tips.
///
/// All inputs are plain values; every operation leaves the session in a
/// displayable state. Timestamps are seconds on the caller's monotonic clock.
#[derive(Debug, Clone)]
pub struct BpmSession {
    tap_settings: TapSettings,
    tapper: TapTempo,
    pitch: PitchShift,
    /// Tapped or manually entered tempo, before pitch.
    base_bpm: Option<f64>,
    format: BpmFormat,
    derived: DerivedBpmSet,
}

impl BpmSession {
    pub fn new(settings: &Settings) -> Result<Self, SettingsError> {
        settings.validate()?;
        let format = settings.bpm_format();
        Ok(Self {
            tap_settings: settings.tap.clone(),
            tapper: TapTempo::from_settings(&settings.tap),
            pitch: PitchShift::new(settings.pitch_range),
            base_bpm: None,
            format,
            derived: DerivedBpmSet::new(settings.transition_tips()?, format),
        })
    }

    /// Register a tap. Ignored while locked.
    pub fn tap(&mut self, now_sec: f64) -> TapOutcome {
        let outcome = self.tapper.add_tap(now_sec);
        if let TapOutcome::Estimate { bpm, .. } = outcome {
            self.base_bpm = Some(bpm);
            self.refresh();
        }
        outcome
    }

    pub fn lock(&mut self) {
        self.tapper.lock();
    }

    /// Back to an empty, unlocked session with no BPM and no pitch.
    pub fn reset(&mut self) {
        self.tapper.reset();
        self.pitch.reset();
        self.base_bpm = None;
        self.refresh();
        log::info!("session reset");
    }

    /// Periodic inactivity check. Returns `true` when this call locked the session.
    pub fn tick(&mut self, now_sec: f64) -> bool {
        let locked = self.tapper.check_inactivity(now_sec);
        if locked {
            self.refresh();
        }
        locked
    }

    /// Use a typed BPM as the base tempo. Input that is not a positive number is ignored.
    pub fn enter_manual_bpm(&mut self, input: &str) -> bool {
        let Some(bpm) = parse_bpm(input) else {
            log::debug!("ignoring manual BPM entry {input:?}");
            return false;
        };
        self.base_bpm = Some(bpm);
        self.pitch.reset();
        self.refresh();
        true
    }

    /// Set the pitch percentage (clamped). Only takes effect while locked.
    pub fn set_pitch(&mut self, percent: f64) -> bool {
        if !self.tapper.is_locked() {
            log::debug!("pitch change ignored: session is not locked");
            return false;
        }
        self.pitch.set_percent(percent);
        self.refresh();
        true
    }

    pub fn nudge_pitch(&mut self, steps: i32) -> bool {
        if !self.tapper.is_locked() {
            log::debug!("pitch nudge ignored: session is not locked");
            return false;
        }
        self.pitch.nudge(steps);
        self.refresh();
        true
    }

    /// Take over changed preferences. Tap parameter changes restart tap detection
    /// but keep the current tempo and lock.
    pub fn apply_settings(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        settings.validate()?;

        if settings.tap != self.tap_settings {
            let was_locked = self.tapper.is_locked();
            self.tapper = TapTempo::from_settings(&settings.tap);
            if was_locked {
                self.tapper.lock();
            }
            self.tap_settings = settings.tap.clone();
        }

        self.pitch.set_range(settings.pitch_range);
        self.format = settings.bpm_format();
        self.derived.set_tips(settings.transition_tips()?);
        self.derived.set_format(self.format);
        self.refresh();
        Ok(())
    }

    fn refresh(&mut self) {
        self.derived.set_base_bpm(self.bpm());
    }

    /// The tempo in effect: the base tempo, pitch-shifted while locked.
    pub fn bpm(&self) -> Option<f64> {
        let base = usable_bpm(self.base_bpm)?;
        if self.tapper.is_locked() {
            Some(self.pitch.apply(base))
        } else {
            Some(base)
        }
    }

    pub fn base_bpm(&self) -> Option<f64> {
        self.base_bpm
    }

    pub fn bpm_text(&self) -> Option<String> {
        self.bpm().map(|bpm| self.format.format(bpm))
    }

    pub fn format(&self) -> BpmFormat {
        self.format
    }

    pub fn lock_state(&self) -> LockState {
        self.tapper.lock_state()
    }

    pub fn is_locked(&self) -> bool {
        self.tapper.is_locked()
    }

    /// Whether the owner should keep calling [`tick`](Self::tick).
    pub fn awaiting_inactivity(&self) -> bool {
        self.tapper.awaiting_inactivity()
    }

    pub fn tap_count(&self) -> usize {
        self.tapper.tap_count()
    }

    pub fn confidence(&self) -> Option<TapConfidence> {
        self.tapper.confidence()
    }

    pub fn pitch_percent(&self) -> f64 {
        self.pitch.percent()
    }

    pub fn pitch_range(&self) -> PitchRange {
        self.pitch.range()
    }

    pub fn tips(&self) -> &[TransitionTip] {
        self.derived.tips()
    }

    pub fn results(&self) -> &[TipResult] {
        self.derived.results()
    }

    pub fn result(&self, title: &str) -> Option<&str> {
        self.derived.get(title)
    }

    pub fn display_order(&self) -> Vec<&TipResult> {
        self.derived.display_order()
    }

    pub fn toggle_tip_hidden(&mut self, index: usize) -> Option<bool> {
        self.derived.toggle_hidden(index)
    }

    pub fn move_tip(&mut self, from: usize, to: usize) -> bool {
        self.derived.move_tip(from, to)
    }
}
