use crate::format::{BpmFormat, PLACEHOLDER};

/// Lower bound multiplier of the mixable range (-6%).
pub const RANGE_LOWER: f64 = 0.94;
/// Upper bound multiplier of the mixable range (+6%).
pub const RANGE_UPPER: f64 = 1.06;
/// Title of the default range tip.
pub const RANGE_TITLE: &str = "Range";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TipKind {
    /// Base BPM scaled by a fixed factor.
    Multiplier(f64),
    /// The band a pitch fader can reach from the base BPM.
    Range,
}

/// A named alternate tempo useful when mixing into another track.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTip {
    pub title: String,
    pub kind: TipKind,
    pub hidden: bool,
}

impl TransitionTip {
    pub fn multiplier(title: impl Into<String>, multiplier: f64) -> Self {
        Self {
            title: title.into(),
            kind: TipKind::Multiplier(multiplier),
            hidden: false,
        }
    }

    pub fn range(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: TipKind::Range,
            hidden: false,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self.kind, TipKind::Range)
    }

    /// Display text for this tip at `bpm`, or the placeholder when there is no BPM.
    pub fn compute(&self, bpm: Option<f64>, format: BpmFormat) -> String {
        let Some(bpm) = bpm else {
            return PLACEHOLDER.to_string();
        };

        match self.kind {
            TipKind::Multiplier(multiplier) => format.format(bpm * multiplier),
            TipKind::Range => format!(
                "{} to {} BPM",
                format.format_approx(bpm * RANGE_LOWER),
                format.format_approx(bpm * RANGE_UPPER)
            ),
        }
    }
}

pub fn default_tips() -> Vec<TransitionTip> {
    vec![
        TransitionTip::range(RANGE_TITLE),
        TransitionTip::multiplier("Halftime", 0.5),
        TransitionTip::multiplier("Doubletime", 2.0),
        TransitionTip::multiplier("¾ Loop Up", 4.0 / 3.0),
        TransitionTip::multiplier("¾ Loop Down", 3.0 / 4.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_tip() {
        let tip = TransitionTip::multiplier("Doubletime", 2.0);
        assert_eq!(tip.compute(Some(120.0), BpmFormat::WholeNumber), "240");
        assert_eq!(
            tip.compute(Some(120.0), BpmFormat::Fractional { decimals: 1 }),
            "240.0"
        );
    }

    #[test]
    fn range_tip_whole_and_fractional() {
        let tip = TransitionTip::range(RANGE_TITLE);
        assert_eq!(
            tip.compute(Some(120.0), BpmFormat::WholeNumber),
            "~113 to ~127 BPM"
        );
        assert_eq!(
            tip.compute(Some(120.0), BpmFormat::Fractional { decimals: 1 }),
            "112.8 to 127.2 BPM"
        );
    }

    #[test]
    fn loop_tips() {
        let tips = default_tips();
        let up = tips.iter().find(|t| t.title == "¾ Loop Up").unwrap();
        let down = tips.iter().find(|t| t.title == "¾ Loop Down").unwrap();
        assert_eq!(up.compute(Some(120.0), BpmFormat::WholeNumber), "160");
        assert_eq!(down.compute(Some(120.0), BpmFormat::WholeNumber), "90");
    }

    #[test]
    fn placeholder_without_bpm() {
        for tip in default_tips() {
            assert_eq!(tip.compute(None, BpmFormat::WholeNumber), PLACEHOLDER);
        }
    }
}
