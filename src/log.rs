//! Run log under `~/.kombajn/kombajn.log`.
//!
//! Batches are noisy: every attempt, retry, backoff wait, and subprocess
//! command line is worth keeping when a scan misbehaves, but none of it
//! belongs on stdout next to the progress output. Each run truncates the
//! log and appends one line per event through the `klog!` macro family.
//! Trace level carries the raw tool invocations from the adapters, so it
//! stays off unless explicitly requested.
//!
//! Level selection, most specific wins:
//! 1. `KOMBAJN_LOG=error|warn|info|debug|trace`
//! 2. `--debug` / `KOMBAJN_DEBUG=1` (selects debug)
//! 3. default: info

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();
static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Parse a level name as given in `KOMBAJN_LOG`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Pick the level for this run and truncate the log file.
pub fn init_with_debug(debug: bool) {
    let level = std::env::var("KOMBAJN_LOG")
        .ok()
        .and_then(|v| LogLevel::parse(&v))
        .unwrap_or(if debug || env_flag("KOMBAJN_DEBUG") {
            LogLevel::Debug
        } else {
            LogLevel::Info
        });
    set_level(level);

    if let Some(dir) = dirs::home_dir().map(|home| home.join(".kombajn")) {
        let _ = std::fs::create_dir_all(&dir);
        let file = dir.join("kombajn.log");
        let _ = std::fs::write(&file, "");
        let _ = LOG_FILE.set(file);
    }
}

pub fn set_level(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Whether a message at `level` would currently be written.
pub fn enabled(level: LogLevel) -> bool {
    level as u8 <= MAX_LEVEL.load(Ordering::Relaxed)
}

/// Append one formatted line. The macros are the intended entry point;
/// they hand over `format_args!` so a filtered-out message costs only
/// the level check.
pub fn write(level: LogLevel, args: fmt::Arguments<'_>) {
    if !enabled(level) {
        return;
    }
    let Some(file) = LOG_FILE.get() else {
        return;
    };
    if let Ok(mut out) = OpenOptions::new().append(true).open(file) {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let _ = writeln!(out, "{stamp} {:5} {args}", level.as_str());
    }
}

#[macro_export]
macro_rules! klog {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_error {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Error, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_warn {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_debug {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Debug, format_args!($($arg)*))
    };
}

/// Raw subprocess command lines and tool output; debug mode alone does
/// not enable these, `KOMBAJN_LOG=trace` does.
#[macro_export]
macro_rules! klog_trace {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Trace, format_args!($($arg)*))
    };
}
