//! Exposure ceiling and exit reconciliation bounds

use super::types::Direction;
use crate::config::SafetyConfig;
use crate::errors::{TradeError, TradeResult};

/// Exit figures after clamping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    pub exit_value: f64,
    pub roi: f64,
    pub realized_pnl: f64,
}

/// Refuse to touch a position whose current value exceeds the ceiling
pub fn check_value_ceiling(current_value: f64, config: &SafetyConfig) -> TradeResult<()> {
    if !current_value.is_finite() || current_value > config.max_trade_value {
        return Err(TradeError::SafetyViolation(format!(
            "position value {:.2} exceeds ceiling {:.2}",
            current_value, config.max_trade_value
        )));
    }
    Ok(())
}

/// Clamp an exit value into [0, max_exit_multiple × entry value]
pub fn clamp_exit_value(exit_value: f64, entry_value: f64, config: &SafetyConfig) -> f64 {
    let ceiling = (entry_value * config.max_exit_multiple).max(0.0);
    if exit_value.is_nan() {
        return 0.0;
    }
    exit_value.clamp(0.0, ceiling)
}

/// Return on the entry value in percent, clamped to the configured band
///
/// A SELL trade profits when buying back costs less than the entry proceeds.
pub fn compute_roi(direction: Direction, entry_value: f64, exit_value: f64, config: &SafetyConfig) -> f64 {
    if entry_value <= 0.0 || !entry_value.is_finite() {
        return 0.0;
    }
    let raw = match direction {
        Direction::Buy => (exit_value - entry_value) / entry_value * 100.0,
        Direction::Sell => (entry_value - exit_value) / entry_value * 100.0,
    };
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(config.roi_min_pct, config.roi_max_pct)
}

pub fn settle(direction: Direction, entry_value: f64, raw_exit_value: f64, config: &SafetyConfig) -> Settlement {
    let exit_value = clamp_exit_value(raw_exit_value, entry_value, config);
    let roi = compute_roi(direction, entry_value, exit_value, config);
    Settlement {
        exit_value,
        roi,
        realized_pnl: roi / 100.0 * entry_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling() {
        let config = SafetyConfig::default();
        assert!(check_value_ceiling(9_999.0, &config).is_ok());
        let err = check_value_ceiling(50_000.0, &config).unwrap_err();
        assert!(err.is_safety_violation());
        assert!(check_value_ceiling(f64::INFINITY, &config).is_err());
    }

    #[test]
    fn test_runaway_exit_is_clamped() {
        let config = SafetyConfig::default();
        let s = settle(Direction::Buy, 25.0, 1_000_000.0, &config);
        assert_eq!(s.exit_value, 125.0);
        assert_eq!(s.roi, 400.0);
        assert_eq!(s.realized_pnl, 100.0);
    }

    #[test]
    fn test_roi_band_and_pnl_identity() {
        let config = SafetyConfig::default();
        for (direction, entry, exit) in [
            (Direction::Buy, 25.0, 30.0),
            (Direction::Buy, 25.0, -5.0),
            (Direction::Sell, 25.0, 20.0),
            (Direction::Sell, 25.0, 120.0),
            (Direction::Buy, 0.5, 400.0),
        ] {
            let s = settle(direction, entry, exit, &config);
            assert!(s.exit_value >= 0.0);
            assert!((-100.0..=1000.0).contains(&s.roi));
            assert!((s.realized_pnl - s.roi / 100.0 * entry).abs() < 1e-9);
        }
    }

    #[test]
    fn test_sell_profit_when_buyback_is_cheaper() {
        let config = SafetyConfig::default();
        let s = settle(Direction::Sell, 25.0, 20.0, &config);
        assert_eq!(s.roi, 20.0);
        assert_eq!(s.realized_pnl, 5.0);
    }
}
