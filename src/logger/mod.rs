//! Structured tagged logging for signalbot
//!
//! This module provides a small, ergonomic logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-tag debug control via --debug-<tag> flags
//! - Dual output: colored console + file persistence
//!
//! ## Usage
//!
//! ```rust
//! use signalbot::logger::{self, LogTag};
//!
//! logger::error(LogTag::Rpc, "Blockhash fetch failed");
//! logger::warning(LogTag::Market, "Primary oracle returned HTTP 502");
//! logger::info(LogTag::Trader, "Trade 42 executed");
//! logger::debug(LogTag::Swap, "Quote details: ..."); // Only with --debug-swap
//! logger::verbose(LogTag::Store, "Row payload: ..."); // Only with --verbose
//! ```
//!
//! Call [`init`] once at startup, before services start. Without it, console
//! logging still works with default settings and nothing is written to disk.

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

use std::path::Path;

/// Initialize the logger system
///
/// Installs the given configuration and opens the log file under `logs_dir`
/// (one file per day). File logging failures are reported on stderr and
/// console logging continues.
pub fn init(config: LoggerConfig, logs_dir: Option<&Path>) {
    set_logger_config(config);

    if let Some(dir) = logs_dir {
        file::init_file_logging(dir);
    }
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (detailed diagnostics)
///
/// Debug logs are ONLY shown when --debug-<tag> is provided for that tag.
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (very detailed tracing, --verbose only)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush all pending log writes
///
/// Call this during shutdown to ensure all logs are written to disk.
pub fn flush() {
    file::flush_file_logging();
}
