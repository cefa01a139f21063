//! Tap-tempo BPM detection, pitch adjustment and DJ transition tips.
//!
//! [`BpmSession`] is the entry point for front-ends; the other modules are
//! usable on their own.

pub mod derivation;
pub mod format;
pub mod logging;
pub mod pitch;
pub mod poller;
pub mod session;
pub mod settings;
pub mod tap_tempo;

pub use session::BpmSession;
pub use settings::{Settings, SettingsError};
