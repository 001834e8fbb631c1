/// Domain types: signals, trades and their lifecycle vocabulary
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ENUMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" | "LONG" => Ok(Direction::Buy),
            "SELL" | "SHORT" => Ok(Direction::Sell),
            other => Err(format!("Unknown direction: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeframeClass {
    Scalp,
    Intraday,
    Swing,
    Position,
}

impl TimeframeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeframeClass::Scalp => "SCALP",
            TimeframeClass::Intraday => "INTRADAY",
            TimeframeClass::Swing => "SWING",
            TimeframeClass::Position => "POSITION",
        }
    }
}

impl fmt::Display for TimeframeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeframeClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SCALP" => Ok(TimeframeClass::Scalp),
            "INTRADAY" => Ok(TimeframeClass::Intraday),
            "SWING" => Ok(TimeframeClass::Swing),
            "POSITION" => Ok(TimeframeClass::Position),
            other => Err(format!("Unknown timeframe class: {}", other)),
        }
    }
}

/// Trade lifecycle status
///
/// PENDING → EXECUTED → CLOSED, with PENDING → FAILED|ERROR and
/// EXECUTED → ERROR as side exits. CLOSED, FAILED and ERROR are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Pending,
    Executed,
    Closed,
    Error,
    Failed,
}

impl TradeStatus {
    pub const NON_TERMINAL: [TradeStatus; 2] = [TradeStatus::Pending, TradeStatus::Executed];

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "PENDING",
            TradeStatus::Executed => "EXECUTED",
            TradeStatus::Closed => "CLOSED",
            TradeStatus::Error => "ERROR",
            TradeStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeStatus::Closed | TradeStatus::Error | TradeStatus::Failed
        )
    }

    pub fn can_transition_to(&self, next: TradeStatus) -> bool {
        matches!(
            (self, next),
            (TradeStatus::Pending, TradeStatus::Executed)
                | (TradeStatus::Pending, TradeStatus::Failed)
                | (TradeStatus::Pending, TradeStatus::Error)
                | (TradeStatus::Executed, TradeStatus::Closed)
                | (TradeStatus::Executed, TradeStatus::Error)
        )
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TradeStatus::Pending),
            "EXECUTED" => Ok(TradeStatus::Executed),
            "CLOSED" => Ok(TradeStatus::Closed),
            "ERROR" => Ok(TradeStatus::Error),
            "FAILED" => Ok(TradeStatus::Failed),
            _ => Err(format!("Unknown trade status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    MinProfitTarget,
    Expired,
    SafetyLimit,
    Manual,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::MinProfitTarget => "MIN_PROFIT_TARGET",
            ExitReason::Expired => "EXPIRED",
            ExitReason::SafetyLimit => "SAFETY_LIMIT",
            ExitReason::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExitReason {
    type Err = String;

    /// Accepts any case with '-', '_' or ' ' separators
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "TAKE_PROFIT" => Ok(ExitReason::TakeProfit),
            "STOP_LOSS" => Ok(ExitReason::StopLoss),
            "MIN_PROFIT_TARGET" => Ok(ExitReason::MinProfitTarget),
            "EXPIRED" => Ok(ExitReason::Expired),
            "SAFETY_LIMIT" => Ok(ExitReason::SafetyLimit),
            "MANUAL" => Ok(ExitReason::Manual),
            _ => Err(format!(
                "Unknown exit reason '{}' (expected TAKE_PROFIT, STOP_LOSS, MIN_PROFIT_TARGET, EXPIRED, SAFETY_LIMIT or MANUAL)",
                s
            )),
        }
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// Upstream trading signal, read-only to the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub token: String,
    pub direction: Direction,
    pub timeframe: TimeframeClass,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    /// 0-100
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub expiry_at: DateTime<Utc>,
}

impl Signal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_at
    }
}

/// Trade record owned by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub signal_id: String,
    pub token: String,
    pub direction: Direction,
    pub timeframe: TimeframeClass,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    /// Token amount in raw base units
    pub amount: u64,
    /// Quote-asset value at entry
    pub entry_value: f64,
    pub exit_price: Option<f64>,
    pub exit_value: Option<f64>,
    pub realized_pnl: Option<f64>,
    pub roi: Option<f64>,
    pub status: TradeStatus,
    pub exit_reason: Option<ExitReason>,
    pub settlement_signature: Option<String>,
    /// Confirmed swap that never made it into the status columns
    pub unsettled_signature: Option<String>,
    pub error_message: Option<String>,
    /// Execution attempts in the current status
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a new PENDING trade, copied from its signal
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub signal_id: String,
    pub token: String,
    pub direction: Direction,
    pub timeframe: TimeframeClass,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    /// Planned entry value in quote units
    pub entry_value: f64,
}

impl NewTrade {
    pub fn from_signal(signal: &Signal, entry_value: f64) -> Self {
        Self {
            signal_id: signal.id.clone(),
            token: signal.token.clone(),
            direction: signal.direction,
            timeframe: signal.timeframe,
            entry_price: signal.entry_price,
            target_price: signal.target_price,
            stop_loss: signal.stop_loss,
            entry_value,
        }
    }
}

/// Result of a confirmed entry swap
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub amount: u64,
    pub entry_value: f64,
    pub settlement_signature: String,
    pub executed_at: DateTime<Utc>,
}

/// Result of a confirmed exit swap
#[derive(Debug, Clone, PartialEq)]
pub struct CloseRecord {
    pub exit_price: f64,
    pub exit_value: f64,
    pub realized_pnl: f64,
    pub roi: f64,
    pub exit_reason: ExitReason,
    pub settlement_signature: String,
    pub closed_at: DateTime<Utc>,
}

/// One row of a trade's status history
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub trade_id: i64,
    pub from_status: Option<TradeStatus>,
    pub to_status: TradeStatus,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_moves_forward_only() {
        use TradeStatus::*;
        let all = [Pending, Executed, Closed, Error, Failed];

        assert!(Pending.can_transition_to(Executed));
        assert!(Pending.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Error));
        assert!(Executed.can_transition_to(Closed));
        assert!(Executed.can_transition_to(Error));
        assert!(!Executed.can_transition_to(Pending));
        assert!(!Executed.can_transition_to(Failed));

        for terminal in [Closed, Error, Failed] {
            assert!(terminal.is_terminal());
            for next in all {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_exit_reason_parsing() {
        assert_eq!("take-profit".parse::<ExitReason>(), Ok(ExitReason::TakeProfit));
        assert_eq!("manual".parse::<ExitReason>(), Ok(ExitReason::Manual));
        assert_eq!(
            "Min Profit Target".parse::<ExitReason>(),
            Ok(ExitReason::MinProfitTarget)
        );
        assert!("moon".parse::<ExitReason>().is_err());
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            TradeStatus::Pending,
            TradeStatus::Executed,
            TradeStatus::Closed,
            TradeStatus::Error,
            TradeStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<TradeStatus>(), Ok(status));
        }
        assert_eq!("short".parse::<Direction>(), Ok(Direction::Sell));
        assert_eq!("swing".parse::<TimeframeClass>(), Ok(TimeframeClass::Swing));
    }
}
