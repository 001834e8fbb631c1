/// Trade rows: conditional creation, status transitions and history
use super::{format_ts, parse_opt_ts, parse_ts, TradeStore};
use crate::errors::{StoreError, StoreResult};
use crate::logger::{self, LogTag};
use crate::trader::types::{
    CloseRecord, ExecutionRecord, ExitReason, NewTrade, Trade, TradeEvent, TradeStatus,
};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};

const TRADE_COLUMNS: &str = "id, signal_id, token, type, timeframe, status, entry_price, \
     target_price, stop_loss, amount, value, executed_at, closed_at, exit_reason, exit_price, \
     realized_pnl, roi, exit_value, settlement_signature, error_message, attempts, created_at, \
     updated_at, unsettled_signature";

/// Raw column values, converted to a `Trade` outside the rusqlite closure
struct TradeRow {
    id: i64,
    signal_id: String,
    token: String,
    direction: String,
    timeframe: String,
    status: String,
    entry_price: f64,
    target_price: f64,
    stop_loss: f64,
    amount: i64,
    value: f64,
    executed_at: Option<String>,
    closed_at: Option<String>,
    exit_reason: Option<String>,
    exit_price: Option<f64>,
    realized_pnl: Option<f64>,
    roi: Option<f64>,
    exit_value: Option<f64>,
    settlement_signature: Option<String>,
    error_message: Option<String>,
    attempts: i64,
    created_at: String,
    updated_at: String,
    unsettled_signature: Option<String>,
}

impl TradeRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            signal_id: row.get(1)?,
            token: row.get(2)?,
            direction: row.get(3)?,
            timeframe: row.get(4)?,
            status: row.get(5)?,
            entry_price: row.get(6)?,
            target_price: row.get(7)?,
            stop_loss: row.get(8)?,
            amount: row.get(9)?,
            value: row.get(10)?,
            executed_at: row.get(11)?,
            closed_at: row.get(12)?,
            exit_reason: row.get(13)?,
            exit_price: row.get(14)?,
            realized_pnl: row.get(15)?,
            roi: row.get(16)?,
            exit_value: row.get(17)?,
            settlement_signature: row.get(18)?,
            error_message: row.get(19)?,
            attempts: row.get(20)?,
            created_at: row.get(21)?,
            updated_at: row.get(22)?,
            unsettled_signature: row.get(23)?,
        })
    }

    fn into_trade(self) -> StoreResult<Trade> {
        let corrupt = |e: String| StoreError::Corrupt(format!("trade {}: {}", self.id, e));
        Ok(Trade {
            id: self.id,
            direction: self.direction.parse().map_err(corrupt)?,
            timeframe: self.timeframe.parse().map_err(corrupt)?,
            status: self.status.parse().map_err(corrupt)?,
            exit_reason: self
                .exit_reason
                .as_deref()
                .map(str::parse::<ExitReason>)
                .transpose()
                .map_err(corrupt)?,
            amount: u64::try_from(self.amount).map_err(|e| corrupt(e.to_string()))?,
            attempts: u32::try_from(self.attempts).map_err(|e| corrupt(e.to_string()))?,
            executed_at: parse_opt_ts(self.executed_at)?,
            closed_at: parse_opt_ts(self.closed_at)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            signal_id: self.signal_id,
            token: self.token,
            entry_price: self.entry_price,
            target_price: self.target_price,
            stop_loss: self.stop_loss,
            entry_value: self.value,
            exit_price: self.exit_price,
            exit_value: self.exit_value,
            realized_pnl: self.realized_pnl,
            roi: self.roi,
            settlement_signature: self.settlement_signature,
            unsettled_signature: self.unsettled_signature,
            error_message: self.error_message,
        })
    }
}

fn record_event(
    tx: &Transaction,
    trade_id: i64,
    from: Option<TradeStatus>,
    to: TradeStatus,
    reason: Option<&str>,
) -> StoreResult<()> {
    tx.execute(
        "INSERT INTO trade_events (trade_id, from_status, to_status, reason, changed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            trade_id,
            from.map(|s| s.as_str()),
            to.as_str(),
            reason,
            format_ts(Utc::now())
        ],
    )?;
    Ok(())
}

/// Explain why a compare-and-swap matched no row
fn cas_miss(tx: &Transaction, id: i64, expected: TradeStatus) -> StoreError {
    let exists = tx
        .query_row("SELECT 1 FROM trades WHERE id = ?1", params![id], |_| Ok(()))
        .optional();
    match exists {
        Ok(Some(())) => StoreError::StaleStatus {
            id,
            expected: expected.to_string(),
        },
        Ok(None) => StoreError::TradeNotFound(id),
        Err(e) => StoreError::Database(e),
    }
}

fn check_transition(id: i64, from: TradeStatus, to: TradeStatus) -> StoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::IllegalTransition {
            id,
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

fn amount_to_sql(id: i64, amount: u64) -> StoreResult<i64> {
    i64::try_from(amount)
        .map_err(|_| StoreError::Corrupt(format!("trade {}: amount {} out of range", id, amount)))
}

impl TradeStore {
    /// Create a PENDING trade unless the signal already has a non-terminal one
    ///
    /// Returns the new trade id, or None when a PENDING/EXECUTED trade for the
    /// same signal exists.
    pub fn create_pending_trade(&self, new: &NewTrade) -> StoreResult<Option<i64>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = format_ts(Utc::now());

        let inserted = tx.execute(
            "INSERT INTO trades (signal_id, token, type, timeframe, status, entry_price,
                                 target_price, stop_loss, amount, value, attempts,
                                 created_at, updated_at)
             SELECT ?1, ?2, ?3, ?4, 'PENDING', ?5, ?6, ?7, 0, ?8, 0, ?9, ?9
             WHERE NOT EXISTS (
                 SELECT 1 FROM trades
                 WHERE signal_id = ?1 AND status IN ('PENDING', 'EXECUTED')
             )",
            params![
                new.signal_id,
                new.token,
                new.direction.as_str(),
                new.timeframe.as_str(),
                new.entry_price,
                new.target_price,
                new.stop_loss,
                new.entry_value,
                now
            ],
        );

        let inserted = match inserted {
            Ok(n) => n,
            // Partial unique index: another writer won the race
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                0
            }
            Err(e) => return Err(e.into()),
        };

        if inserted == 0 {
            logger::debug(
                LogTag::Store,
                &format!("Signal {} already has an open trade", new.signal_id),
            );
            return Ok(None);
        }

        let id = tx.last_insert_rowid();
        record_event(&tx, id, None, TradeStatus::Pending, Some("created from signal"))?;
        tx.commit()?;
        Ok(Some(id))
    }

    pub fn get_trade(&self, id: i64) -> StoreResult<Option<Trade>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM trades WHERE id = ?1", TRADE_COLUMNS);
        let row = conn
            .query_row(&sql, params![id], TradeRow::from_row)
            .optional()?;
        row.map(TradeRow::into_trade).transpose()
    }

    /// Trades in `status`, oldest first
    pub fn list_trades_by_status(&self, status: TradeStatus, limit: usize) -> StoreResult<Vec<Trade>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM trades WHERE status = ?1 ORDER BY id ASC LIMIT ?2",
            TRADE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![status.as_str(), limit as i64], TradeRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TradeRow::into_trade).collect()
    }

    #[cfg(test)]
    pub fn count_open_trades_for_signal(&self, signal_id: &str) -> StoreResult<u32> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM trades WHERE signal_id = ?1 AND status IN ('PENDING', 'EXECUTED')",
            params![signal_id],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// PENDING → EXECUTED with the entry fill
    pub fn mark_executed(&self, id: i64, record: &ExecutionRecord) -> StoreResult<()> {
        check_transition(id, TradeStatus::Pending, TradeStatus::Executed)?;
        let amount = amount_to_sql(id, record.amount)?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE trades
             SET status = 'EXECUTED', amount = ?2, value = ?3, settlement_signature = ?4,
                 executed_at = ?5, error_message = NULL, unsettled_signature = NULL,
                 attempts = 0, updated_at = ?6
             WHERE id = ?1 AND status = 'PENDING'",
            params![
                id,
                amount,
                record.entry_value,
                record.settlement_signature,
                format_ts(record.executed_at),
                format_ts(Utc::now())
            ],
        )?;
        if changed == 0 {
            return Err(cas_miss(&tx, id, TradeStatus::Pending));
        }

        let reason = format!("entry settled {}", record.settlement_signature);
        record_event(&tx, id, Some(TradeStatus::Pending), TradeStatus::Executed, Some(&reason))?;
        tx.commit()?;
        Ok(())
    }

    /// EXECUTED → CLOSED with the exit fill and PnL
    pub fn mark_closed(&self, id: i64, record: &CloseRecord) -> StoreResult<()> {
        check_transition(id, TradeStatus::Executed, TradeStatus::Closed)?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE trades
             SET status = 'CLOSED', exit_price = ?2, exit_value = ?3, realized_pnl = ?4,
                 roi = ?5, exit_reason = ?6, settlement_signature = ?7, closed_at = ?8,
                 error_message = NULL, unsettled_signature = NULL, attempts = 0,
                 updated_at = ?9
             WHERE id = ?1 AND status = 'EXECUTED'",
            params![
                id,
                record.exit_price,
                record.exit_value,
                record.realized_pnl,
                record.roi,
                record.exit_reason.as_str(),
                record.settlement_signature,
                format_ts(record.closed_at),
                format_ts(Utc::now())
            ],
        )?;
        if changed == 0 {
            return Err(cas_miss(&tx, id, TradeStatus::Executed));
        }

        record_event(
            &tx,
            id,
            Some(TradeStatus::Executed),
            TradeStatus::Closed,
            Some(record.exit_reason.as_str()),
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Move a trade to ERROR or FAILED, recording why
    pub fn mark_terminal(
        &self,
        id: i64,
        from: TradeStatus,
        to: TradeStatus,
        message: &str,
        exit_reason: Option<ExitReason>,
    ) -> StoreResult<()> {
        check_transition(id, from, to)?;
        if !matches!(to, TradeStatus::Error | TradeStatus::Failed) {
            return Err(StoreError::IllegalTransition {
                id,
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = format_ts(Utc::now());
        let changed = tx.execute(
            "UPDATE trades
             SET status = ?3, error_message = ?4,
                 exit_reason = COALESCE(?5, exit_reason),
                 closed_at = CASE WHEN ?5 IS NULL THEN closed_at ELSE ?6 END,
                 updated_at = ?6
             WHERE id = ?1 AND status = ?2",
            params![
                id,
                from.as_str(),
                to.as_str(),
                message,
                exit_reason.map(|r| r.as_str()),
                now
            ],
        )?;
        if changed == 0 {
            return Err(cas_miss(&tx, id, from));
        }

        record_event(&tx, id, Some(from), to, Some(message))?;
        tx.commit()?;
        Ok(())
    }

    /// Count a failed attempt without changing status; returns the new count
    pub fn record_attempt(&self, id: i64, expected: TradeStatus, message: &str) -> StoreResult<u32> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE trades SET attempts = attempts + 1, error_message = ?3, updated_at = ?4
             WHERE id = ?1 AND status = ?2",
            params![id, expected.as_str(), message, format_ts(Utc::now())],
        )?;
        if changed == 0 {
            return Err(cas_miss(&tx, id, expected));
        }

        let attempts: i64 = tx.query_row(
            "SELECT attempts FROM trades WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(attempts as u32)
    }

    /// Keep the signature of a confirmed swap whose status write failed
    ///
    /// The status is left alone; a trade carrying this signature must not be
    /// swapped again.
    pub fn record_unsettled_signature(
        &self,
        id: i64,
        expected: TradeStatus,
        signature: &str,
    ) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE trades SET unsettled_signature = ?3, error_message = ?4, updated_at = ?5
             WHERE id = ?1 AND status = ?2",
            params![
                id,
                expected.as_str(),
                signature,
                format!("swap {} confirmed but not recorded", signature),
                format_ts(Utc::now())
            ],
        )?;
        if changed == 0 {
            return Err(cas_miss(&tx, id, expected));
        }
        tx.commit()?;
        Ok(())
    }

    /// Status history of a trade, oldest first
    pub fn trade_events(&self, trade_id: i64) -> StoreResult<Vec<TradeEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT trade_id, from_status, to_status, reason, changed_at
             FROM trade_events WHERE trade_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![trade_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(trade_id, from, to, reason, changed_at)| {
                Ok(TradeEvent {
                    trade_id,
                    from_status: from
                        .as_deref()
                        .map(str::parse::<TradeStatus>)
                        .transpose()
                        .map_err(StoreError::Corrupt)?,
                    to_status: to.parse().map_err(StoreError::Corrupt)?,
                    reason,
                    changed_at: parse_ts(&changed_at)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trader::types::{Direction, TimeframeClass};

    fn new_trade(signal_id: &str) -> NewTrade {
        NewTrade {
            signal_id: signal_id.to_string(),
            token: "MintA".to_string(),
            direction: Direction::Buy,
            timeframe: TimeframeClass::Swing,
            entry_price: 1.0,
            target_price: 1.2,
            stop_loss: 0.9,
            entry_value: 25.0,
        }
    }

    fn execution() -> ExecutionRecord {
        ExecutionRecord {
            amount: 24_750_000_000,
            entry_value: 25.0,
            settlement_signature: "EntrySig".to_string(),
            executed_at: Utc::now(),
        }
    }

    fn close_record() -> CloseRecord {
        CloseRecord {
            exit_price: 1.21,
            exit_value: 30.0,
            realized_pnl: 5.0,
            roi: 20.0,
            exit_reason: ExitReason::TakeProfit,
            settlement_signature: "ExitSig".to_string(),
            closed_at: Utc::now(),
        }
    }

    #[test]
    fn test_one_open_trade_per_signal() {
        let store = TradeStore::open_in_memory().unwrap();
        let first = store.create_pending_trade(&new_trade("sig-1")).unwrap();
        assert!(first.is_some());
        assert_eq!(store.create_pending_trade(&new_trade("sig-1")).unwrap(), None);
        assert_eq!(store.count_open_trades_for_signal("sig-1").unwrap(), 1);

        // A different signal is independent
        assert!(store.create_pending_trade(&new_trade("sig-2")).unwrap().is_some());
    }

    #[test]
    fn test_unsettled_signature_kept_without_status_change() {
        let store = TradeStore::open_in_memory().unwrap();
        let id = store.create_pending_trade(&new_trade("sig-1")).unwrap().unwrap();

        store
            .record_unsettled_signature(id, TradeStatus::Pending, "LostSig")
            .unwrap();
        let trade = store.get_trade(id).unwrap().unwrap();
        assert_eq!(trade.status, TradeStatus::Pending);
        assert_eq!(trade.unsettled_signature.as_deref(), Some("LostSig"));
        assert!(trade.error_message.unwrap().contains("LostSig"));
        assert_eq!(store.trade_events(id).unwrap().len(), 1);

        // Wrong expected status is a miss
        let err = store
            .record_unsettled_signature(id, TradeStatus::Executed, "LostSig")
            .unwrap_err();
        assert!(matches!(err, StoreError::StaleStatus { .. }));

        // A later successful write clears it
        store.mark_executed(id, &execution()).unwrap();
        assert_eq!(store.get_trade(id).unwrap().unwrap().unsettled_signature, None);
    }

    #[test]
    fn test_terminal_trade_frees_signal() {
        let store = TradeStore::open_in_memory().unwrap();
        let id = store.create_pending_trade(&new_trade("sig-1")).unwrap().unwrap();
        store
            .mark_terminal(id, TradeStatus::Pending, TradeStatus::Failed, "signal expired", None)
            .unwrap();
        assert!(store.create_pending_trade(&new_trade("sig-1")).unwrap().is_some());
    }

    #[test]
    fn test_full_lifecycle_and_history() {
        let store = TradeStore::open_in_memory().unwrap();
        let id = store.create_pending_trade(&new_trade("sig-1")).unwrap().unwrap();

        let trade = store.get_trade(id).unwrap().unwrap();
        assert_eq!(trade.status, TradeStatus::Pending);
        assert_eq!(trade.entry_value, 25.0);
        assert_eq!(trade.amount, 0);

        store.mark_executed(id, &execution()).unwrap();
        let trade = store.get_trade(id).unwrap().unwrap();
        assert_eq!(trade.status, TradeStatus::Executed);
        assert_eq!(trade.amount, 24_750_000_000);
        assert_eq!(trade.settlement_signature.as_deref(), Some("EntrySig"));
        assert!(trade.executed_at.is_some());

        store.mark_closed(id, &close_record()).unwrap();
        let trade = store.get_trade(id).unwrap().unwrap();
        assert_eq!(trade.status, TradeStatus::Closed);
        assert_eq!(trade.exit_reason, Some(ExitReason::TakeProfit));
        assert_eq!(trade.roi, Some(20.0));
        assert_eq!(trade.exit_price, Some(1.21));

        let events = store.trade_events(id).unwrap();
        let path: Vec<_> = events.iter().map(|e| (e.from_status, e.to_status)).collect();
        assert_eq!(
            path,
            vec![
                (None, TradeStatus::Pending),
                (Some(TradeStatus::Pending), TradeStatus::Executed),
                (Some(TradeStatus::Executed), TradeStatus::Closed),
            ]
        );
    }

    #[test]
    fn test_compare_and_swap_rejects_stale_status() {
        let store = TradeStore::open_in_memory().unwrap();
        let id = store.create_pending_trade(&new_trade("sig-1")).unwrap().unwrap();
        store.mark_executed(id, &execution()).unwrap();

        assert!(matches!(
            store.mark_executed(id, &execution()),
            Err(StoreError::StaleStatus { .. })
        ));
        assert!(matches!(
            store.mark_terminal(id, TradeStatus::Pending, TradeStatus::Error, "late", None),
            Err(StoreError::StaleStatus { .. })
        ));
        assert!(matches!(
            store.mark_closed(999, &close_record()),
            Err(StoreError::TradeNotFound(999))
        ));
    }

    #[test]
    fn test_backward_transition_refused() {
        let store = TradeStore::open_in_memory().unwrap();
        let id = store.create_pending_trade(&new_trade("sig-1")).unwrap().unwrap();
        assert!(matches!(
            store.mark_terminal(id, TradeStatus::Executed, TradeStatus::Failed, "x", None),
            Err(StoreError::IllegalTransition { .. })
        ));
        assert!(matches!(
            store.mark_terminal(id, TradeStatus::Pending, TradeStatus::Executed, "x", None),
            Err(StoreError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_attempts_and_safety_error() {
        let store = TradeStore::open_in_memory().unwrap();
        let id = store.create_pending_trade(&new_trade("sig-1")).unwrap().unwrap();
        assert_eq!(store.record_attempt(id, TradeStatus::Pending, "timeout").unwrap(), 1);
        assert_eq!(store.record_attempt(id, TradeStatus::Pending, "timeout").unwrap(), 2);
        assert_eq!(
            store.get_trade(id).unwrap().unwrap().error_message.as_deref(),
            Some("timeout")
        );

        store.mark_executed(id, &execution()).unwrap();
        assert_eq!(store.get_trade(id).unwrap().unwrap().attempts, 0);

        store
            .mark_terminal(
                id,
                TradeStatus::Executed,
                TradeStatus::Error,
                "value above ceiling",
                Some(ExitReason::SafetyLimit),
            )
            .unwrap();
        let trade = store.get_trade(id).unwrap().unwrap();
        assert_eq!(trade.status, TradeStatus::Error);
        assert_eq!(trade.exit_reason, Some(ExitReason::SafetyLimit));
        assert!(trade.closed_at.is_some());
    }

    #[test]
    fn test_list_by_status() {
        let store = TradeStore::open_in_memory().unwrap();
        let a = store.create_pending_trade(&new_trade("a")).unwrap().unwrap();
        let b = store.create_pending_trade(&new_trade("b")).unwrap().unwrap();
        store.mark_executed(b, &execution()).unwrap();

        let pending = store.list_trades_by_status(TradeStatus::Pending, 10).unwrap();
        assert_eq!(pending.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a]);
        let executed = store.list_trades_by_status(TradeStatus::Executed, 10).unwrap();
        assert_eq!(executed.iter().map(|t| t.id).collect::<Vec<_>>(), vec![b]);
    }
}
