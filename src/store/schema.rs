/// SQLite schema for signals, trades and trade status history

pub const SCHEMA_VERSION: u32 = 2;

pub const SCHEMA_SIGNALS: &str = r#"
CREATE TABLE IF NOT EXISTS signals (
    id TEXT PRIMARY KEY,
    token TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('BUY', 'SELL')),
    timeframe TEXT NOT NULL,
    entry_price REAL NOT NULL,
    target_price REAL NOT NULL,
    stop_loss REAL NOT NULL,
    confidence REAL NOT NULL,
    created_at TEXT NOT NULL,
    expiry_at TEXT NOT NULL
);
"#;

pub const SCHEMA_TRADES: &str = r#"
CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    signal_id TEXT NOT NULL,
    token TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('BUY', 'SELL')),
    timeframe TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('PENDING', 'EXECUTED', 'CLOSED', 'ERROR', 'FAILED')),
    entry_price REAL NOT NULL,
    target_price REAL NOT NULL,
    stop_loss REAL NOT NULL,
    amount INTEGER NOT NULL DEFAULT 0, -- raw token units
    value REAL NOT NULL DEFAULT 0, -- entry value in quote units
    executed_at TEXT,
    closed_at TEXT,
    exit_reason TEXT,
    exit_price REAL,
    realized_pnl REAL,
    roi REAL,
    exit_value REAL,
    settlement_signature TEXT,
    unsettled_signature TEXT, -- confirmed swap whose status write failed
    error_message TEXT,
    attempts INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

pub const SCHEMA_TRADE_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS trade_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trade_id INTEGER NOT NULL,
    from_status TEXT, -- NULL for creation
    to_status TEXT NOT NULL,
    reason TEXT,
    changed_at TEXT NOT NULL,
    FOREIGN KEY (trade_id) REFERENCES trades(id) ON DELETE CASCADE
);
"#;

pub const SCHEMA_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS store_metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Columns added after version 1, applied to older databases
pub const ADDED_TRADE_COLUMNS: &[(&str, &str)] = &[("unsettled_signature", "TEXT")];

pub const INDEXES: &[&str] = &[
    // At most one non-terminal trade per signal
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_trades_open_signal ON trades(signal_id) WHERE status IN ('PENDING', 'EXECUTED');",
    "CREATE INDEX IF NOT EXISTS idx_trades_signal ON trades(signal_id);",
    "CREATE INDEX IF NOT EXISTS idx_trades_status ON trades(status, id);",
    "CREATE INDEX IF NOT EXISTS idx_signals_expiry ON signals(expiry_at);",
    "CREATE INDEX IF NOT EXISTS idx_trade_events_trade ON trade_events(trade_id, id);",
];
