//! Notification types for trade lifecycle events

use crate::trader::types::{Direction, ExitReason, Trade};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Types of notifications the controller emits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum NotificationType {
    /// A signal passed validation and a PENDING trade was created
    TradeCreated {
        trade_id: i64,
        signal_id: String,
        token: String,
        direction: Direction,
        planned_value: f64,
    },

    /// The entry swap settled
    TradeExecuted {
        trade_id: i64,
        token: String,
        direction: Direction,
        entry_value: f64,
        signature: String,
    },

    /// The exit swap settled
    TradeClosed {
        trade_id: i64,
        token: String,
        exit_reason: ExitReason,
        exit_value: f64,
        realized_pnl: f64,
        roi: f64,
        signature: String,
    },

    /// The trade ended in ERROR or FAILED
    TradeAborted {
        trade_id: i64,
        signal_id: String,
        token: String,
        status: String,
        message: String,
    },

    /// Sweep summary
    RunSummary { mode: String, summary: String },
}

/// A notification with timestamp
#[derive(Clone, Debug)]
pub struct Notification {
    pub notification_type: NotificationType,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(notification_type: NotificationType) -> Self {
        Self {
            notification_type,
            timestamp: Utc::now(),
        }
    }

    pub fn trade_created(trade_id: i64, signal_id: &str, token: &str, direction: Direction, planned_value: f64) -> Self {
        Self::new(NotificationType::TradeCreated {
            trade_id,
            signal_id: signal_id.to_string(),
            token: token.to_string(),
            direction,
            planned_value,
        })
    }

    pub fn trade_executed(trade: &Trade, entry_value: f64, signature: &str) -> Self {
        Self::new(NotificationType::TradeExecuted {
            trade_id: trade.id,
            token: trade.token.clone(),
            direction: trade.direction,
            entry_value,
            signature: signature.to_string(),
        })
    }

    pub fn trade_closed(
        trade: &Trade,
        exit_reason: ExitReason,
        exit_value: f64,
        realized_pnl: f64,
        roi: f64,
        signature: &str,
    ) -> Self {
        Self::new(NotificationType::TradeClosed {
            trade_id: trade.id,
            token: trade.token.clone(),
            exit_reason,
            exit_value,
            realized_pnl,
            roi,
            signature: signature.to_string(),
        })
    }

    pub fn trade_aborted(trade: &Trade, status: &str, message: &str) -> Self {
        Self::new(NotificationType::TradeAborted {
            trade_id: trade.id,
            signal_id: trade.signal_id.clone(),
            token: trade.token.clone(),
            status: status.to_string(),
            message: message.to_string(),
        })
    }

    pub fn run_summary(mode: &str, summary: String) -> Self {
        Self::new(NotificationType::RunSummary {
            mode: mode.to_string(),
            summary,
        })
    }

    /// Single-line human readable text
    pub fn message(&self) -> String {
        match &self.notification_type {
            NotificationType::TradeCreated {
                trade_id,
                signal_id,
                token,
                direction,
                planned_value,
            } => format!(
                "Trade #{} created: {} {} for {:.2} (signal {})",
                trade_id, direction, token, planned_value, signal_id
            ),
            NotificationType::TradeExecuted {
                trade_id,
                token,
                direction,
                entry_value,
                signature,
            } => format!(
                "Trade #{} executed: {} {} worth {:.2} (tx {})",
                trade_id, direction, token, entry_value, signature
            ),
            NotificationType::TradeClosed {
                trade_id,
                token,
                exit_reason,
                exit_value,
                realized_pnl,
                roi,
                signature,
            } => format!(
                "Trade #{} closed ({}): {} exit value {:.2}, PnL {:+.2} ({:+.2}%) (tx {})",
                trade_id, exit_reason, token, exit_value, realized_pnl, roi, signature
            ),
            NotificationType::TradeAborted {
                trade_id,
                signal_id,
                token,
                status,
                message,
            } => format!(
                "Trade #{} {} for {} (signal {}): {}",
                trade_id, status, token, signal_id, message
            ),
            NotificationType::RunSummary { mode, summary } => {
                format!("Run '{}' finished: {}", mode, summary)
            }
        }
    }
}
