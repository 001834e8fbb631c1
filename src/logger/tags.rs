/// Log tags identify the subsystem that produced a message.
///
/// The debug key of a tag is what the `--debug-<key>` flag matches.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Trader,
    Entry,
    Exit,
    Market,
    Swap,
    Rpc,
    Wallet,
    Store,
    Notifications,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used by `--debug-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Trader => "trader".to_string(),
            LogTag::Entry => "entry".to_string(),
            LogTag::Exit => "exit".to_string(),
            LogTag::Market => "market".to_string(),
            LogTag::Swap => "swap".to_string(),
            LogTag::Rpc => "rpc".to_string(),
            LogTag::Wallet => "wallet".to_string(),
            LogTag::Store => "store".to_string(),
            LogTag::Notifications => "notifications".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(s) => s.to_lowercase(),
        }
    }

    /// Uppercase label without colors, used in the log file
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Notifications => "NOTIFY".to_string(),
            other => other.to_debug_key().to_uppercase(),
        }
    }
}
