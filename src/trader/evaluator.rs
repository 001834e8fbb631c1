//! Entry and exit decisions
//!
//! Pure functions over a signal or trade plus a live price. Nothing here
//! touches the network or the store.
//!
//! Exit checks run in priority order; the first match wins:
//! 1. Target reached (take profit)
//! 2. Stop breached (stop loss)
//! 3. SCALP trade with enough gain (minimum profit target)
//! 4. Held too long (expired)

use super::types::{Direction, ExitReason, Signal, TimeframeClass, Trade};
use crate::config::TraderConfig;
use chrono::{DateTime, Duration, Utc};

/// Outcome of checking a signal for intake
#[derive(Debug, Clone, PartialEq)]
pub enum SignalVerdict {
    Eligible,
    Expired,
    Rejected(String),
}

/// Check expiry, confidence and price levels of a signal
pub fn evaluate_signal(signal: &Signal, now: DateTime<Utc>, config: &TraderConfig) -> SignalVerdict {
    if signal.is_expired(now) {
        return SignalVerdict::Expired;
    }

    if !signal.confidence.is_finite() || signal.confidence < config.min_confidence {
        return SignalVerdict::Rejected(format!(
            "confidence {:.1} below minimum {:.1}",
            signal.confidence, config.min_confidence
        ));
    }

    match validate_levels(
        signal.direction,
        signal.entry_price,
        signal.target_price,
        signal.stop_loss,
    ) {
        Ok(()) => SignalVerdict::Eligible,
        Err(reason) => SignalVerdict::Rejected(reason),
    }
}

/// Levels must be positive and ordered for the direction
///
/// BUY: stop < entry < target. SELL: target < entry < stop.
pub fn validate_levels(direction: Direction, entry: f64, target: f64, stop: f64) -> Result<(), String> {
    for (name, value) in [("entry", entry), ("target", target), ("stop", stop)] {
        if !value.is_finite() || value <= 0.0 {
            return Err(format!("invalid {} price {}", name, value));
        }
    }

    let ordered = match direction {
        Direction::Buy => stop < entry && entry < target,
        Direction::Sell => target < entry && entry < stop,
    };
    if !ordered {
        return Err(format!(
            "{} levels out of order: entry {} target {} stop {}",
            direction, entry, target, stop
        ));
    }
    Ok(())
}

/// Live price within `tolerance_pct` of the planned entry
pub fn entry_condition_met(entry_price: f64, live_price: f64, tolerance_pct: f64) -> bool {
    if entry_price <= 0.0 || !live_price.is_finite() || live_price <= 0.0 {
        return false;
    }
    let deviation_pct = ((live_price - entry_price) / entry_price).abs() * 100.0;
    deviation_pct <= tolerance_pct
}

/// Signed gain in percent, positive when the trade is in profit
pub fn gain_pct(direction: Direction, entry_price: f64, live_price: f64) -> f64 {
    if entry_price <= 0.0 {
        return 0.0;
    }
    match direction {
        Direction::Buy => (live_price - entry_price) / entry_price * 100.0,
        Direction::Sell => (entry_price - live_price) / entry_price * 100.0,
    }
}

/// Exit reason for an EXECUTED trade at `live_price`, or None to hold
pub fn evaluate_exit(
    trade: &Trade,
    live_price: f64,
    now: DateTime<Utc>,
    config: &TraderConfig,
) -> Option<ExitReason> {
    if !live_price.is_finite() || live_price <= 0.0 {
        return None;
    }

    let (target_hit, stop_hit) = match trade.direction {
        Direction::Buy => (live_price >= trade.target_price, live_price <= trade.stop_loss),
        Direction::Sell => (live_price <= trade.target_price, live_price >= trade.stop_loss),
    };

    if target_hit {
        return Some(ExitReason::TakeProfit);
    }
    if stop_hit {
        return Some(ExitReason::StopLoss);
    }

    if trade.timeframe == TimeframeClass::Scalp
        && gain_pct(trade.direction, trade.entry_price, live_price) >= config.scalp_min_profit_pct
    {
        return Some(ExitReason::MinProfitTarget);
    }

    let opened_at = trade.executed_at.unwrap_or(trade.created_at);
    if now - opened_at >= Duration::days(config.max_hold_days) {
        return Some(ExitReason::Expired);
    }

    None
}
