/// Command-line argument handling for signalbot
///
/// Regular options are parsed with clap. `--debug-<tag>` switches are open
/// ended (one per log tag), so they are pulled out of the raw arguments
/// before clap sees the rest.
use crate::config::CONFIG_FILE_PATH;
use crate::trader::{ExitReason, RunMode};
use clap::{Parser, ValueEnum};

const DEBUG_FLAG_PREFIX: &str = "--debug-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Exit-condition sweep over executed trades
    Monitor,
    /// Signal intake and entry sweep
    Open,
    /// Exit sweep, or close one trade with --trade-id
    Close,
    /// Entry and exit sweeps
    All,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Monitor => RunMode::Monitor,
            Mode::Open => RunMode::Open,
            Mode::Close => RunMode::Close,
            Mode::All => RunMode::All,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "signalbot",
    version,
    about = "Signal-driven trade lifecycle controller",
    after_help = "Debug output per subsystem: --debug-<tag> (trader, entry, exit, market, swap, rpc, wallet, store, notifications, config, system)"
)]
pub struct Cli {
    /// Which sweep to run
    #[arg(value_enum)]
    pub mode: Mode,

    /// Close only this trade (close mode)
    #[arg(long)]
    pub trade_id: Option<i64>,

    /// Exit reason for --trade-id (default MANUAL)
    #[arg(long, value_parser = parse_exit_reason)]
    pub reason: Option<ExitReason>,

    /// Configuration file
    #[arg(long, default_value = CONFIG_FILE_PATH)]
    pub config: String,

    /// Repeat the sweep every SECS seconds until Ctrl-C
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Enable all debug and verbose output
    #[arg(long)]
    pub verbose: bool,
}

/// Parsed command line
#[derive(Debug)]
pub struct Arguments {
    pub cli: Cli,
    /// Tags named by `--debug-<tag>` flags
    pub debug_tags: Vec<String>,
}

impl Arguments {
    /// Parse from the process arguments; exits with usage on error
    pub fn from_env() -> Self {
        Self::parse_from(std::env::args().collect())
    }

    pub fn parse_from(args: Vec<String>) -> Self {
        let (rest, debug_tags) = split_debug_flags(args);
        Self {
            cli: Cli::parse_from(rest),
            debug_tags,
        }
    }

    pub fn try_parse_from(args: Vec<String>) -> Result<Self, clap::Error> {
        let (rest, debug_tags) = split_debug_flags(args);
        Ok(Self {
            cli: Cli::try_parse_from(rest)?,
            debug_tags,
        })
    }

    /// Manual close request, if one was given
    pub fn close_request(&self) -> Option<(i64, ExitReason)> {
        if self.cli.mode != Mode::Close {
            return None;
        }
        self.cli
            .trade_id
            .map(|id| (id, self.cli.reason.unwrap_or(ExitReason::Manual)))
    }
}

/// Separate `--debug-<tag>` flags from everything else
pub fn split_debug_flags(args: Vec<String>) -> (Vec<String>, Vec<String>) {
    let mut rest = Vec::with_capacity(args.len());
    let mut tags = Vec::new();

    for arg in args {
        match arg.strip_prefix(DEBUG_FLAG_PREFIX) {
            Some(tag) if !tag.is_empty() => tags.push(tag.to_lowercase()),
            _ => rest.push(arg),
        }
    }
    (rest, tags)
}

fn parse_exit_reason(raw: &str) -> Result<ExitReason, String> {
    raw.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_debug_flags_are_split_out() {
        let (rest, tags) = split_debug_flags(args(&[
            "signalbot",
            "all",
            "--debug-trader",
            "--debug-Swap",
            "--verbose",
        ]));
        assert_eq!(rest, args(&["signalbot", "all", "--verbose"]));
        assert_eq!(tags, vec!["trader".to_string(), "swap".to_string()]);
    }

    #[test]
    fn test_parse_modes_and_defaults() {
        let parsed = Arguments::try_parse_from(args(&["signalbot", "monitor"])).unwrap();
        assert_eq!(parsed.cli.mode, Mode::Monitor);
        assert_eq!(parsed.cli.config, CONFIG_FILE_PATH);
        assert_eq!(parsed.cli.interval, None);
        assert!(parsed.close_request().is_none());

        let parsed = Arguments::try_parse_from(args(&[
            "signalbot",
            "open",
            "--interval",
            "60",
            "--config",
            "custom.toml",
            "--debug-entry",
        ]))
        .unwrap();
        assert_eq!(RunMode::from(parsed.cli.mode), RunMode::Open);
        assert_eq!(parsed.cli.interval, Some(60));
        assert_eq!(parsed.cli.config, "custom.toml");
        assert_eq!(parsed.debug_tags, vec!["entry".to_string()]);
    }

    #[test]
    fn test_manual_close_request() {
        let parsed = Arguments::try_parse_from(args(&[
            "signalbot",
            "close",
            "--trade-id",
            "42",
            "--reason",
            "take-profit",
        ]))
        .unwrap();
        assert_eq!(parsed.close_request(), Some((42, ExitReason::TakeProfit)));

        let parsed =
            Arguments::try_parse_from(args(&["signalbot", "close", "--trade-id", "5"])).unwrap();
        assert_eq!(parsed.close_request(), Some((5, ExitReason::Manual)));

        let parsed =
            Arguments::try_parse_from(args(&["signalbot", "all", "--trade-id", "5"])).unwrap();
        assert!(parsed.close_request().is_none());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Arguments::try_parse_from(args(&["signalbot", "sideways"])).is_err());
        assert!(Arguments::try_parse_from(args(&[
            "signalbot",
            "close",
            "--trade-id",
            "1",
            "--reason",
            "moon"
        ]))
        .is_err());
    }
}
