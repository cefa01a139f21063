/// Shown in place of a value when there is no usable BPM.
pub const PLACEHOLDER: &str = "- BPM";

/// How BPM values are rendered for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BpmFormat {
    /// Rounded to the nearest integer.
    #[default]
    WholeNumber,
    /// Fixed number of decimal places.
    Fractional { decimals: usize },
}

impl BpmFormat {
    pub fn from_flags(whole_number: bool, decimals: usize) -> Self {
        if whole_number {
            BpmFormat::WholeNumber
        } else {
            BpmFormat::Fractional { decimals }
        }
    }

    pub fn is_whole_number(&self) -> bool {
        matches!(self, BpmFormat::WholeNumber)
    }

    pub fn format(&self, bpm: f64) -> String {
        match *self {
            BpmFormat::WholeNumber => format!("{:.0}", bpm.round()),
            BpmFormat::Fractional { decimals } => format!("{bpm:.decimals$}"),
        }
    }

    /// Like [`format`](Self::format), but prefixes `~` in whole-number mode since the value is rounded.
    pub fn format_approx(&self, bpm: f64) -> String {
        match self {
            BpmFormat::WholeNumber => format!("~{}", self.format(bpm)),
            BpmFormat::Fractional { .. } => self.format(bpm),
        }
    }
}

/// Returns the BPM if it is usable for display and derivation.
pub fn usable_bpm(bpm: Option<f64>) -> Option<f64> {
    bpm.filter(|b| b.is_finite() && *b > 0.0)
}

/// Parse a manually typed BPM. Anything that is not a finite positive number yields `None`.
pub fn parse_bpm(input: &str) -> Option<f64> {
    usable_bpm(input.trim().parse::<f64>().ok())
}
