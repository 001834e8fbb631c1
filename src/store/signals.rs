/// Signal rows, written by the upstream producer and read by the controller
use super::{format_ts, parse_ts, TradeStore};
use crate::errors::{StoreError, StoreResult};
use crate::trader::types::Signal;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

const SIGNAL_COLUMNS: &str =
    "id, token, type, timeframe, entry_price, target_price, stop_loss, confidence, created_at, expiry_at";

type SignalRow = (
    String,
    String,
    String,
    String,
    f64,
    f64,
    f64,
    f64,
    String,
    String,
);

fn read_row(row: &Row) -> rusqlite::Result<SignalRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn into_signal(row: SignalRow) -> StoreResult<Signal> {
    let (id, token, direction, timeframe, entry, target, stop, confidence, created, expiry) = row;
    let corrupt = |e: String| StoreError::Corrupt(format!("signal {}: {}", id, e));
    Ok(Signal {
        direction: direction.parse().map_err(corrupt)?,
        timeframe: timeframe.parse().map_err(corrupt)?,
        created_at: parse_ts(&created)?,
        expiry_at: parse_ts(&expiry)?,
        entry_price: entry,
        target_price: target,
        stop_loss: stop,
        confidence,
        token,
        id,
    })
}

impl TradeStore {
    /// Insert a signal; returns false when the id already exists
    pub fn insert_signal(&self, signal: &Signal) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO signals
             (id, token, type, timeframe, entry_price, target_price, stop_loss, confidence,
              created_at, expiry_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                signal.id,
                signal.token,
                signal.direction.as_str(),
                signal.timeframe.as_str(),
                signal.entry_price,
                signal.target_price,
                signal.stop_loss,
                signal.confidence,
                format_ts(signal.created_at),
                format_ts(signal.expiry_at)
            ],
        )?;
        Ok(inserted > 0)
    }

    pub fn get_signal(&self, id: &str) -> StoreResult<Option<Signal>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM signals WHERE id = ?1", SIGNAL_COLUMNS);
        let row = conn.query_row(&sql, params![id], read_row).optional()?;
        row.map(into_signal).transpose()
    }

    /// Unexpired signals that never produced a trade, oldest first
    pub fn list_eligible_signals(&self, now: DateTime<Utc>, limit: usize) -> StoreResult<Vec<Signal>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM signals s
             WHERE s.expiry_at > ?1
               AND NOT EXISTS (SELECT 1 FROM trades t WHERE t.signal_id = s.id)
             ORDER BY s.created_at ASC, s.id ASC
             LIMIT ?2",
            SIGNAL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![format_ts(now), limit as i64], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_signal).collect()
    }
}
