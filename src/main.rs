use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use bpm_boogaloo::{
    format::PLACEHOLDER, logging, pitch::PitchRange, poller::InactivityPoller,
    tap_tempo::TapOutcome, BpmSession, Settings,
};
use clap::Parser;

const READER_THREAD_NAME: &str = "bpm-boogaloo-stdin";

#[derive(Parser)]
#[command(name = "bpm-boogaloo", version)]
#[command(about = "Tap-tempo BPM detector with pitch adjustment and transition tips", long_about = None)]
struct Cli {
    /// Settings file (YAML). Defaults to the platform config directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show fractional BPM values instead of whole numbers
    #[arg(long)]
    fractional: bool,

    /// Decimal places used for fractional BPM values
    #[arg(long)]
    decimals: Option<usize>,

    /// Pitch fader range: 6, 10, 16 or wide
    #[arg(long)]
    pitch_range: Option<PitchRange>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Also write logs to the default log file
    #[arg(long, conflicts_with = "log_file")]
    log: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Tap,
    Lock,
    Reset,
    Manual(String),
    Pitch(f64),
    Nudge(i32),
    ToggleTip(usize),
    MoveTip(usize, usize),
    ListTips,
    Show,
    Save,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Ok(Command::Tap);
        };
        let args: Vec<&str> = parts.collect();

        let command = match (head, args.as_slice()) {
            ("t" | "tap", []) => Command::Tap,
            ("l" | "lock", []) => Command::Lock,
            ("r" | "reset", []) => Command::Reset,
            ("b" | "bpm", [value]) => Command::Manual(value.to_string()),
            ("p" | "pitch", [value]) => Command::Pitch(
                value
                    .trim_end_matches('%')
                    .parse()
                    .map_err(|_| format!("not a pitch percentage: {value}"))?,
            ),
            ("+", []) => Command::Nudge(1),
            ("-", []) => Command::Nudge(-1),
            ("h" | "hide", [index]) => Command::ToggleTip(parse_index(index)?),
            ("m" | "move", [from, to]) => Command::MoveTip(parse_index(from)?, parse_index(to)?),
            ("tips", []) => Command::ListTips,
            ("s" | "show", []) => Command::Show,
            ("save", []) => Command::Save,
            ("?" | "help", []) => Command::Help,
            ("q" | "quit" | "exit", []) => Command::Quit,
            (value, []) if value.parse::<f64>().is_ok() => Command::Manual(value.to_string()),
            _ => return Err(format!("unknown command: {}", line.trim())),
        };
        Ok(command)
    }
}

/// Tip numbers are 1-based on the command line.
fn parse_index(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("not a tip number: {raw}")),
    }
}

#[derive(Debug)]
enum ControlMessage {
    Command {
        command: Command,
        timestamp: Instant,
    },
    Invalid(String),
    Closed,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| cli.log.then(logging::default_log_path).flatten());
    logging::init(
        logging::level_from_verbosity(cli.verbose),
        log_file.as_deref(),
    );

    let settings_path = cli.config.clone().or_else(Settings::default_path);
    // What `save` writes back: the file's contents, without command-line overrides.
    let mut stored = match &settings_path {
        Some(path) => Settings::load_or_default(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    let settings = with_overrides(&cli, &stored);

    let mut session = BpmSession::new(&settings).context("invalid settings")?;
    let mut poller =
        InactivityPoller::new(Duration::from_millis(settings.tap.poll_interval_ms));

    let (tx, rx) = mpsc::channel::<ControlMessage>();
    thread::Builder::new()
        .name(READER_THREAD_NAME.into())
        .spawn(move || read_commands(tx))
        .context("failed to start input thread")?;

    let app_start = Instant::now();
    print_help();
    print_status(&session);

    loop {
        let message = match poller.timeout(Instant::now()) {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            },
        };

        match message {
            Some(ControlMessage::Command { command, timestamp }) => {
                let tap_time = timestamp
                    .checked_duration_since(app_start)
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);
                let keep_running = handle_command(
                    command,
                    tap_time,
                    &mut session,
                    &mut stored,
                    settings_path.as_ref(),
                );
                if !keep_running {
                    break;
                }
            }
            Some(ControlMessage::Invalid(err)) => println!("{err} (type `help` for commands)"),
            Some(ControlMessage::Closed) => break,
            None => {}
        }

        let now = Instant::now();
        if poller.poll(now) {
            let now_sec = now.duration_since(app_start).as_secs_f64();
            if session.tick(now_sec) {
                println!("Locked after inactivity");
                print_status(&session);
            }
        }

        if session.awaiting_inactivity() {
            poller.arm(now);
        } else {
            poller.disarm();
        }
    }

    poller.disarm();
    log::info!("session ended");
    Ok(())
}

/// Settings for this run: the stored ones with command-line flags applied.
fn with_overrides(cli: &Cli, stored: &Settings) -> Settings {
    let mut settings = stored.clone();
    if cli.fractional {
        settings.whole_number_bpm = false;
    }
    if let Some(decimals) = cli.decimals {
        settings.decimal_places = decimals;
    }
    if let Some(range) = cli.pitch_range {
        settings.pitch_range = range;
    }
    settings
}

fn read_commands(tx: Sender<ControlMessage>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let timestamp = Instant::now();
        let message = match line {
            Ok(line) => match Command::parse(&line) {
                Ok(command) => ControlMessage::Command { command, timestamp },
                Err(err) => ControlMessage::Invalid(err),
            },
            Err(err) => {
                log::error!("failed to read input: {err}");
                break;
            }
        };
        if tx.send(message).is_err() {
            return;
        }
    }
    let _ = tx.send(ControlMessage::Closed);
}

/// Returns `false` when the user asked to quit.
fn handle_command(
    command: Command,
    tap_time: f64,
    session: &mut BpmSession,
    stored: &mut Settings,
    settings_path: Option<&PathBuf>,
) -> bool {
    match command {
        Command::Tap => match session.tap(tap_time) {
            TapOutcome::Ignored if session.is_locked() => {
                println!("Locked. Type `r` to reset before tapping again.");
            }
            TapOutcome::Ignored => {}
            TapOutcome::Pending { taps } => println!("tap {taps}..."),
            TapOutcome::Estimate { .. } => print_status(session),
        },
        Command::Lock => {
            session.lock();
            print_status(session);
        }
        Command::Reset => {
            session.reset();
            print_status(session);
        }
        Command::Manual(value) => {
            if session.enter_manual_bpm(&value) {
                print_status(session);
            } else {
                println!("ignored: {value} is not a positive BPM");
            }
        }
        Command::Pitch(percent) => {
            if session.set_pitch(percent) {
                print_status(session);
            } else {
                println!("pitch can only be changed while locked");
            }
        }
        Command::Nudge(steps) => {
            if session.nudge_pitch(steps) {
                print_status(session);
            } else {
                println!("pitch can only be changed while locked");
            }
        }
        Command::ToggleTip(index) => match session.toggle_tip_hidden(index) {
            Some(hidden) => {
                println!("tip {} {}", index + 1, if hidden { "hidden" } else { "shown" });
                print_tips(session);
            }
            None => println!("no tip number {}", index + 1),
        },
        Command::MoveTip(from, to) => {
            if session.move_tip(from, to) {
                print_tips(session);
            } else {
                println!("cannot move tip {} to {}", from + 1, to + 1);
            }
        }
        Command::ListTips => print_tips(session),
        Command::Show => print_status(session),
        Command::Save => {
            stored.store_tips(session.tips());
            match settings_path {
                Some(path) => match stored.save(path) {
                    Ok(()) => println!("settings saved to {}", path.display()),
                    Err(err) => println!("{err}"),
                },
                None => println!("no settings location available; pass --config"),
            }
        }
        Command::Help => print_help(),
        Command::Quit => return false,
    }
    true
}

fn print_status(session: &BpmSession) {
    let bpm = session
        .bpm_text()
        .map(|text| format!("{text} BPM"))
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let mut line = bpm;
    if session.is_locked() {
        line.push_str(&format!(
            "  [LOCKED]  pitch {:+.1}% ({})",
            session.pitch_percent(),
            session.pitch_range()
        ));
    } else if let Some(confidence) = session.confidence() {
        line.push_str(&format!("  [{} taps, {confidence:?} confidence]", session.tap_count()));
    }
    println!("{line}");

    let width = session
        .display_order()
        .iter()
        .map(|r| r.title.chars().count())
        .max()
        .unwrap_or(0);
    for result in session.display_order() {
        println!("  {:<width$}  {}", result.title, result.text);
    }
}

fn print_tips(session: &BpmSession) {
    for (i, tip) in session.tips().iter().enumerate() {
        let marker = if tip.hidden { " (hidden)" } else { "" };
        println!("  {}. {}{marker}", i + 1, tip.title);
    }
}

fn print_help() {
    println!("Enter/t tap   l lock   r reset   b <bpm> or <bpm> set BPM");
    println!("p <percent> pitch   +/- nudge pitch   tips list tips");
    println!("h <n> hide/show tip   m <from> <to> move tip   s show   save   q quit");
}
