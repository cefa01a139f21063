use std::{
    collections::HashSet,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    derivation::{default_tips, TipKind, TransitionTip},
    format::BpmFormat,
    pitch::PitchRange,
    tap_tempo::MAX_WINDOW_TAPS,
};

const APP_DIR: &str = "bpm-boogaloo";
const SETTINGS_FILE: &str = "settings.yaml";
const MAX_DECIMAL_PLACES: usize = 3;

/// User preferences consumed by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub whole_number_bpm: bool,
    pub decimal_places: usize,
    pub pitch_range: PitchRange,
    /// Countdown alert thresholds, carried for the clock front-end.
    pub orange_alert_minutes: f64,
    pub red_alert_minutes: f64,
    pub tap: TapSettings,
    pub tips: Vec<TipSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            whole_number_bpm: true,
            decimal_places: 1,
            pitch_range: PitchRange::default(),
            orange_alert_minutes: 10.0,
            red_alert_minutes: 5.0,
            tap: TapSettings::default(),
            tips: default_tips().iter().map(TipSettings::from).collect(),
        }
    }
}

/// Tap detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapSettings {
    pub min_taps: usize,
    pub max_taps: usize,
    pub inactivity_secs: f64,
    pub poll_interval_ms: u64,
}

impl Default for TapSettings {
    fn default() -> Self {
        Self {
            min_taps: 4,
            max_taps: 12,
            inactivity_secs: 2.0,
            poll_interval_ms: 100,
        }
    }
}

/// On-disk shape of a transition tip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipSettings {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub range: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl From<&TransitionTip> for TipSettings {
    fn from(tip: &TransitionTip) -> Self {
        let (multiplier, range) = match tip.kind {
            TipKind::Multiplier(m) => (Some(m), false),
            TipKind::Range => (None, true),
        };
        Self {
            title: tip.title.clone(),
            multiplier,
            range,
            hidden: tip.hidden,
        }
    }
}

impl TryFrom<&TipSettings> for TransitionTip {
    type Error = SettingsError;

    fn try_from(entry: &TipSettings) -> Result<Self, Self::Error> {
        let kind = match (entry.multiplier, entry.range) {
            (Some(m), false) if m.is_finite() && m > 0.0 => TipKind::Multiplier(m),
            (Some(m), false) => {
                return Err(SettingsError::Invalid(format!(
                    "tip \"{}\" has invalid multiplier {m}",
                    entry.title
                )))
            }
            (None, true) => TipKind::Range,
            _ => {
                return Err(SettingsError::Invalid(format!(
                    "tip \"{}\" must have exactly one of `multiplier` or `range`",
                    entry.title
                )))
            }
        };
        Ok(TransitionTip {
            title: entry.title.clone(),
            kind,
            hidden: entry.hidden,
        })
    }
}

impl Settings {
    /// `<config dir>/bpm-boogaloo/settings.yaml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(SETTINGS_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("no settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_yaml::from_str(contents).map_err(SettingsError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        self.validate()?;
        let yaml = serde_yaml::to_string(self).map_err(SettingsError::Serialize)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, yaml).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("settings saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let tap = &self.tap;
        if tap.min_taps < 2 {
            return Err(invalid("tap.min_taps must be at least 2"));
        }
        if tap.max_taps < tap.min_taps {
            return Err(invalid("tap.max_taps must not be smaller than tap.min_taps"));
        }
        if tap.max_taps > MAX_WINDOW_TAPS {
            return Err(invalid(&format!(
                "tap.max_taps must be at most {MAX_WINDOW_TAPS}"
            )));
        }
        if !(tap.inactivity_secs.is_finite() && tap.inactivity_secs > 0.0) {
            return Err(invalid("tap.inactivity_secs must be positive"));
        }
        if tap.poll_interval_ms == 0 {
            return Err(invalid("tap.poll_interval_ms must be positive"));
        }
        if self.decimal_places > MAX_DECIMAL_PLACES {
            return Err(invalid(&format!(
                "decimal_places must be at most {MAX_DECIMAL_PLACES}"
            )));
        }
        for minutes in [self.orange_alert_minutes, self.red_alert_minutes] {
            if !(minutes.is_finite() && minutes >= 0.0) {
                return Err(invalid("alert minutes must be zero or positive"));
            }
        }

        let mut titles = HashSet::new();
        for entry in &self.tips {
            if entry.title.trim().is_empty() {
                return Err(invalid("tip titles must not be empty"));
            }
            if !titles.insert(entry.title.as_str()) {
                return Err(SettingsError::Invalid(format!(
                    "duplicate tip title \"{}\"",
                    entry.title
                )));
            }
            TransitionTip::try_from(entry)?;
        }
        Ok(())
    }

    pub fn bpm_format(&self) -> BpmFormat {
        BpmFormat::from_flags(self.whole_number_bpm, self.decimal_places)
    }

    /// The configured tips. Entries are assumed validated.
    pub fn transition_tips(&self) -> Result<Vec<TransitionTip>, SettingsError> {
        self.tips.iter().map(TransitionTip::try_from).collect()
    }

    /// Replace the stored tip list, e.g. after the user reorders or hides tips.
    pub fn store_tips(&mut self, tips: &[TransitionTip]) {
        self.tips = tips.iter().map(TipSettings::from).collect();
    }
}

fn invalid(message: &str) -> SettingsError {
    SettingsError::Invalid(message.to_string())
}

#[derive(Debug)]
pub enum SettingsError {
    Io { path: PathBuf, source: io::Error },
    Parse(serde_yaml::Error),
    Serialize(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io { path, source } => {
                write!(f, "failed to access settings at {}: {source}", path.display())
            }
            SettingsError::Parse(err) => write!(f, "failed to parse settings: {err}"),
            SettingsError::Serialize(err) => write!(f, "failed to serialise settings: {err}"),
            SettingsError::Invalid(reason) => write!(f, "invalid settings: {reason}"),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io { source, .. } => Some(source),
            SettingsError::Parse(err) | SettingsError::Serialize(err) => Some(err),
            SettingsError::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.bpm_format(), BpmFormat::WholeNumber);
        assert_eq!(settings.transition_tips().unwrap(), default_tips());
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let settings = Settings::from_yaml(
            "whole_number_bpm: false\npitch_range: \"±16%\"\ntap:\n  inactivity_secs: 3.5\n",
        )
        .unwrap();

        assert!(!settings.whole_number_bpm);
        assert_eq!(settings.pitch_range, PitchRange::Sixteen);
        assert_eq!(settings.tap.inactivity_secs, 3.5);
        assert_eq!(settings.tap.max_taps, 12);
        assert_eq!(settings.bpm_format(), BpmFormat::Fractional { decimals: 1 });
        assert_eq!(settings.tips.len(), 5);
    }

    #[test]
    fn custom_tips() {
        let settings = Settings::from_yaml(
            "tips:\n  - title: Range\n    range: true\n  - title: Triple\n    multiplier: 3.0\n    hidden: true\n",
        )
        .unwrap();
        let tips = settings.transition_tips().unwrap();
        assert_eq!(tips.len(), 2);
        assert!(tips[0].is_range());
        assert_eq!(tips[1].kind, TipKind::Multiplier(3.0));
        assert!(tips[1].hidden);
    }

    #[test]
    fn rejects_bad_tips() {
        let both = "tips:\n  - title: Odd\n    range: true\n    multiplier: 2.0\n";
        assert!(matches!(
            Settings::from_yaml(both),
            Err(SettingsError::Invalid(_))
        ));

        let negative = "tips:\n  - title: Odd\n    multiplier: -2.0\n";
        assert!(matches!(
            Settings::from_yaml(negative),
            Err(SettingsError::Invalid(_))
        ));

        let duplicate = "tips:\n  - title: A\n    range: true\n  - title: A\n    multiplier: 2.0\n";
        assert!(matches!(
            Settings::from_yaml(duplicate),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_bad_tap_settings() {
        let small_window = "tap:\n  min_taps: 4\n  max_taps: 3\n";
        assert!(matches!(
            Settings::from_yaml(small_window),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_yaml("tap:\n  max_taps: 18446744073709551615\n"),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_yaml("tap:\n  max_taps: 1000000000000\n"),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_yaml("tap:\n  inactivity_secs: 0\n"),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_yaml("decimal_places: 7\n"),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_pitch_range_is_a_parse_error() {
        assert!(matches!(
            Settings::from_yaml("pitch_range: \"±12%\"\n"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let mut settings = Settings::default();
        settings.whole_number_bpm = false;
        settings.decimal_places = 2;
        settings.pitch_range = PitchRange::Wide;
        let mut tips = settings.transition_tips().unwrap();
        tips[2].hidden = true;
        settings.store_tips(&tips);

        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        assert!(matches!(Settings::load(&path), Err(SettingsError::Io { .. })));
        assert_eq!(Settings::load_or_default(&path).unwrap(), Settings::default());
    }

    #[test]
    fn default_path_names_the_app() {
        if let Some(path) = Settings::default_path() {
            assert!(path.ends_with(Path::new(APP_DIR).join(SETTINGS_FILE)));
        }
    }
}
