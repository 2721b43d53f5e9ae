//! Categorized diagnostics for the shell core.
//!
//! `DEBUG_LEVEL` selects how much is written:
//! - 0 or unset: nothing
//! - 1: errors
//! - 2: tab, modal and session lifecycle
//! - 3: layout changes and UI round trips
//! - 4: every surface event
//!
//! Lines go to `zenium_debug.log` in the system temp directory, never to the
//! host's stdout. [`init_log_bridge`] sends `log` facade records to the same
//! file and mirrors them to stderr when `RUST_LOG` is set.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::Utc;
use parking_lot::Mutex;

/// Categories used by the `debug_*!` macros.
pub mod category {
    pub const VIEW: &str = "VIEW";
    pub const MODAL: &str = "MODAL";
    pub const SESSION: &str = "SESSION";
    pub const PROTOCOL: &str = "PROTOCOL";
    pub const UI: &str = "UI";
    pub const SHELL: &str = "SHELL";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl DebugLevel {
    fn from_env() -> Self {
        std::env::var("DEBUG_LEVEL")
            .ok()
            .and_then(|raw| raw.trim().parse::<u8>().ok())
            .map_or(DebugLevel::Off, Self::from_number)
    }

    fn from_number(n: u8) -> Self {
        match n {
            1 => DebugLevel::Error,
            2 => DebugLevel::Info,
            3 => DebugLevel::Debug,
            4.. => DebugLevel::Trace,
            0 => DebugLevel::Off,
        }
    }

    fn from_filter(filter: log::LevelFilter) -> Self {
        match filter.to_level() {
            None => DebugLevel::Off,
            Some(log::Level::Error) => DebugLevel::Error,
            Some(log::Level::Warn | log::Level::Info) => DebugLevel::Info,
            Some(log::Level::Debug) => DebugLevel::Debug,
            Some(log::Level::Trace) => DebugLevel::Trace,
        }
    }

    fn label(self) -> &'static str {
        match self {
            DebugLevel::Off => "OFF  ",
            DebugLevel::Error => "ERROR",
            DebugLevel::Info => "INFO ",
            DebugLevel::Debug => "DEBUG",
            DebugLevel::Trace => "TRACE",
        }
    }
}

pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("zenium_debug.log")
}

struct DebugLogger {
    level: DebugLevel,
    sink: Option<Box<dyn Write + Send>>,
}

impl DebugLogger {
    fn disabled() -> Self {
        Self {
            level: DebugLevel::Off,
            sink: None,
        }
    }

    /// Truncate the log file and write a session banner. An unwritable temp
    /// dir leaves the logger silent.
    fn open(level: DebugLevel) -> Self {
        if level == DebugLevel::Off {
            return Self::disabled();
        }
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(log_path());
        match file {
            Ok(file) => Self::with_sink(level, Box::new(file)),
            Err(_) => Self::disabled(),
        }
    }

    fn with_sink(level: DebugLevel, sink: Box<dyn Write + Send>) -> Self {
        let mut logger = Self {
            level,
            sink: Some(sink),
        };
        let rule = "-".repeat(72);
        logger.write_line(&format!(
            "{rule}\nzenium {} diagnostics, level {:?}, started {}\n{rule}",
            crate::VERSION,
            level,
            Utc::now().to_rfc3339()
        ));
        logger
    }

    fn write_line(&mut self, line: &str) {
        if let Some(sink) = self.sink.as_mut() {
            let _ = writeln!(sink, "{line}");
            let _ = sink.flush();
        }
    }

    fn record(&mut self, level: DebugLevel, category: &str, msg: &str) {
        if level == DebugLevel::Off || level > self.level {
            return;
        }
        let stamp = Utc::now().format("%H:%M:%S%.6f");
        self.write_line(&format!("{stamp} {} {category:<8} {msg}", level.label()));
    }
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

fn logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::open(DebugLevel::from_env())))
}

pub fn is_enabled(level: DebugLevel) -> bool {
    level != DebugLevel::Off && level <= logger().lock().level
}

/// Backend of the `debug_*!` macros. Formatting is skipped when the level is
/// filtered out.
pub fn logf(level: DebugLevel, category: &str, args: fmt::Arguments) {
    let mut logger = logger().lock();
    if level <= logger.level {
        logger.record(level, category, &args.to_string());
    }
}

/// `log` facade records, written into the debug file.
struct LogBridge {
    mirror_to_stderr: bool,
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = DebugLevel::from_filter(record.level().to_level_filter());
        logf(level, record.target(), *record.args());
        if self.mirror_to_stderr {
            eprintln!("{:<5} {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

/// Install the `log` bridge.
///
/// The facade level comes from `cli_level` (`--log-level`), else `RUST_LOG`,
/// else `info`. The file is opened at no less than that level so facade
/// records are not lost to a lower `DEBUG_LEVEL`. Only the first call
/// installs anything.
pub fn init_log_bridge(cli_level: Option<log::LevelFilter>) {
    let rust_log = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| raw.trim().parse::<log::LevelFilter>().ok());
    let level = cli_level.or(rust_log).unwrap_or(log::LevelFilter::Info);

    let file_level = DebugLevel::from_filter(level).max(DebugLevel::from_env());
    let _ = LOGGER.set(Mutex::new(DebugLogger::open(file_level)));

    let bridge = BRIDGE.get_or_init(|| LogBridge {
        mirror_to_stderr: rust_log.is_some(),
    });
    if log::set_logger(bridge).is_ok() {
        log::set_max_level(level);
    }
}

/// Apply the `log_level` from the shell config. Ignored when `--log-level`
/// or `RUST_LOG` already chose one.
pub fn apply_config_log_level(config_level: Option<&str>, cli_level: Option<log::LevelFilter>) {
    if cli_level.is_some() || std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    match config_level.map(|raw| raw.trim().parse::<log::LevelFilter>()) {
        Some(Ok(level)) => log::set_max_level(level),
        Some(Err(_)) => log::warn!("Ignoring unknown log_level {:?} in config", config_level),
        None => {}
    }
}

#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Error, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Info, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Debug, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_trace {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Trace, $category, format_args!($($arg)*))
    };
}
