/// Logger configuration: minimum level and per-tag debug switches
use super::levels::LogLevel;
use super::tags::LogTag;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Messages above this level are dropped (Debug/Verbose have extra gates)
    pub min_level: LogLevel,
    /// Tags with debug output enabled (`--debug-<tag>`)
    pub debug_tags: HashSet<String>,
    /// If non-empty, only these tags are shown (errors always pass)
    pub enabled_tags: HashSet<String>,
    /// Write to stdout; disabled in tests that only care about the file
    pub console: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
            console: true,
        }
    }
}

impl LoggerConfig {
    /// Build from the `--debug-<tag>` / `--verbose` flags of the CLI
    pub fn from_flags(debug_tags: &[String], verbose: bool) -> Self {
        let debug_tags: HashSet<String> = debug_tags.iter().map(|t| t.to_lowercase()).collect();
        let min_level = if verbose {
            LogLevel::Verbose
        } else if debug_tags.is_empty() {
            LogLevel::Info
        } else {
            LogLevel::Debug
        };

        Self {
            min_level,
            debug_tags,
            ..Default::default()
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

pub(super) fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = LOGGER_CONFIG.read();
    config.min_level >= LogLevel::Verbose || config.debug_tags.contains(&tag.to_debug_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags_levels() {
        let quiet = LoggerConfig::from_flags(&[], false);
        assert_eq!(quiet.min_level, LogLevel::Info);

        let debug = LoggerConfig::from_flags(&["Trader".to_string()], false);
        assert_eq!(debug.min_level, LogLevel::Debug);
        assert!(debug.debug_tags.contains("trader"));

        let verbose = LoggerConfig::from_flags(&[], true);
        assert_eq!(verbose.min_level, LogLevel::Verbose);
    }
}
