use std::{fmt, ops::RangeInclusive, str::FromStr};

use serde::{Deserialize, Serialize};

/// Increment used when nudging the pitch up or down.
pub const PITCH_STEP: f64 = 0.1;

/// Pitch fader range presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PitchRange {
    #[default]
    #[serde(rename = "±6%")]
    Six,
    #[serde(rename = "±10%")]
    Ten,
    #[serde(rename = "±16%")]
    Sixteen,
    #[serde(rename = "WIDE")]
    Wide,
}

impl PitchRange {
    pub const ALL: [PitchRange; 4] = [Self::Six, Self::Ten, Self::Sixteen, Self::Wide];

    /// Largest absolute pitch percentage allowed by this preset.
    pub fn limit(self) -> f64 {
        match self {
            PitchRange::Six => 6.0,
            PitchRange::Ten => 10.0,
            PitchRange::Sixteen => 16.0,
            PitchRange::Wide => 100.0,
        }
    }

    pub fn bounds(self) -> RangeInclusive<f64> {
        -self.limit()..=self.limit()
    }

    pub fn clamp(self, percent: f64) -> f64 {
        percent.clamp(-self.limit(), self.limit())
    }

    pub fn label(self) -> &'static str {
        match self {
            PitchRange::Six => "±6%",
            PitchRange::Ten => "±10%",
            PitchRange::Sixteen => "±16%",
            PitchRange::Wide => "WIDE",
        }
    }
}

impl fmt::Display for PitchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PitchRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().trim_start_matches('±').trim_end_matches('%');
        match key.to_ascii_lowercase().as_str() {
            "6" => Ok(PitchRange::Six),
            "10" => Ok(PitchRange::Ten),
            "16" => Ok(PitchRange::Sixteen),
            "wide" | "100" => Ok(PitchRange::Wide),
            _ => Err(format!(
                "unknown pitch range \"{s}\" (expected 6, 10, 16 or wide)"
            )),
        }
    }
}

/// Percentage tempo adjustment, always kept within the active range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PitchShift {
    percent: f64,
    range: PitchRange,
}

impl PitchShift {
    pub fn new(range: PitchRange) -> Self {
        Self {
            percent: 0.0,
            range,
        }
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn range(&self) -> PitchRange {
        self.range
    }

    /// Set the pitch, clamped to the active range. Non-finite input is ignored.
    pub fn set_percent(&mut self, percent: f64) {
        if percent.is_finite() {
            self.percent = self.range.clamp(percent);
        }
    }

    /// Move the pitch by whole [`PITCH_STEP`] increments.
    pub fn nudge(&mut self, steps: i32) {
        let stepped = self.percent + steps as f64 * PITCH_STEP;
        // Snap to the step grid so repeated nudges don't accumulate float drift.
        self.set_percent((stepped / PITCH_STEP).round() * PITCH_STEP);
    }

    /// Switch presets, pulling the current pitch back inside the new bounds.
    pub fn set_range(&mut self, range: PitchRange) {
        self.range = range;
        self.percent = range.clamp(self.percent);
    }

    pub fn reset(&mut self) {
        self.percent = 0.0;
    }

    pub fn apply(&self, bpm: f64) -> f64 {
        bpm * (1.0 + self.percent / 100.0)
    }
}
