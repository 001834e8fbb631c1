/// Persistent store for signals and trades (SQLite)
///
/// The store is the single source of truth for trade state. Every status
/// change is a compare-and-swap on the expected current status, executed in
/// an immediate transaction together with its `trade_events` history row.
mod schema;
mod signals;
mod trades;

use crate::errors::{StoreError, StoreResult};
use crate::logger::{self, LogTag};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

pub struct TradeStore {
    conn: Mutex<Connection>,
}

impl TradeStore {
    #[cfg(test)]
    pub(crate) fn execute_sql(&self, sql: &str) -> StoreResult<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Open (or create) the database file
    pub fn open(path: &str) -> StoreResult<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        let store = Self::with_connection(conn)?;

        logger::info(LogTag::Store, &format!("Trade store opened at {}", path));
        Ok(store)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn initialize_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(schema::SCHEMA_SIGNALS)?;
    conn.execute_batch(schema::SCHEMA_TRADES)?;
    conn.execute_batch(schema::SCHEMA_TRADE_EVENTS)?;
    conn.execute_batch(schema::SCHEMA_METADATA)?;
    add_missing_columns(conn)?;
    for index_sql in schema::INDEXES {
        conn.execute_batch(index_sql)?;
    }
    conn.execute(
        "INSERT OR REPLACE INTO store_metadata (key, value) VALUES ('schema_version', ?1)",
        params![schema::SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

fn add_missing_columns(conn: &Connection) -> StoreResult<()> {
    for (column, sql_type) in schema::ADDED_TRADE_COLUMNS {
        let present: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('trades') WHERE name = ?1",
            params![column],
            |row| row.get(0),
        )?;
        if present == 0 {
            conn.execute_batch(&format!("ALTER TABLE trades ADD COLUMN {} {};", column, sql_type))?;
            logger::info(LogTag::Store, &format!("Added trades.{} column", column));
        }
    }
    Ok(())
}

/// Timestamps are stored as fixed-width RFC 3339 UTC text so they sort lexically
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}

pub(crate) fn parse_opt_ts(raw: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_ts).transpose()
}
