//! Logger setup for the terminal front-end.
//!
//! Records go to stderr so they never interleave with the BPM readout on
//! stdout, and optionally to an append-mode log file.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const APP_DIR: &str = "bpm-boogaloo";
const LOG_FILE: &str = "bpm-boogaloo.log";

/// Where a log file goes when the user asks for one without naming a path.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join(APP_DIR).join("logs").join(LOG_FILE))
}

/// Pick the terminal level from the number of `-v` flags.
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build()
}

/// Install the global logger. A log file that cannot be opened falls back to
/// terminal-only logging.
pub fn init(level: LevelFilter, log_file: Option<&Path>) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Debug, config(), file)),
            Err(err) => eprintln!("Warning: could not open log file {}: {err}", path.display()),
        }
    }

    if CombinedLogger::init(loggers).is_err() {
        eprintln!("Warning: logger already initialized");
    }
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_from_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_from_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_from_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn default_log_path_names_the_app() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with(LOG_FILE));
            assert!(path.to_string_lossy().contains(APP_DIR));
        }
    }

    #[test]
    fn log_file_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join(LOG_FILE);
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
