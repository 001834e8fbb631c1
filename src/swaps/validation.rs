/// Pre-trade validation against the aggregator
use super::types::{Quote, QuoteRequest};
use super::SwapRouter;
use crate::errors::{TradeError, TradeResult};
use crate::logger::{self, LogTag};

/// Thresholds a trade must pass before any swap is attempted
#[derive(Debug, Clone, Copy)]
pub struct ValidationLimits {
    /// Smallest trade value worth executing, in quote-asset units
    pub min_trade_value: f64,
    /// Largest accepted price impact, in percent
    pub max_slippage_pct: f64,
}

/// Check size, quote availability and price impact, in that order
///
/// Returns the approved quote so the caller can reuse it while it is fresh.
pub async fn validate_trade(
    router: &dyn SwapRouter,
    request: &QuoteRequest,
    trade_value: f64,
    limits: ValidationLimits,
) -> TradeResult<Quote> {
    if trade_value.is_nan() || trade_value < limits.min_trade_value {
        return Err(TradeError::Validation(format!(
            "trade value {:.4} below minimum {:.4}",
            trade_value, limits.min_trade_value
        )));
    }

    let Some(quote) = router.get_quote(request).await else {
        return Err(TradeError::QuoteRejected(format!(
            "no usable quote for {} -> {}",
            request.input_mint, request.output_mint
        )));
    };

    if quote.price_impact_pct > limits.max_slippage_pct {
        return Err(TradeError::SlippageTooHigh {
            actual: quote.price_impact_pct,
            max: limits.max_slippage_pct,
        });
    }

    logger::debug(
        LogTag::Swap,
        &format!(
            "Trade validated: {} -> {} value {:.4}, impact {:.4}%",
            request.input_mint, request.output_mint, trade_value, quote.price_impact_pct
        ),
    );

    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    struct StubRouter {
        response: Option<serde_json::Value>,
        calls: Mutex<u32>,
    }

    impl StubRouter {
        fn new(response: Option<serde_json::Value>) -> Self {
            Self {
                response,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl SwapRouter for StubRouter {
        async fn get_quote(&self, _request: &QuoteRequest) -> Option<Quote> {
            *self.calls.lock() += 1;
            self.response.clone().and_then(Quote::from_response)
        }

        async fn get_signable_transaction(&self, _quote: &Quote, _wallet: &str) -> Option<Vec<u8>> {
            None
        }
    }

    fn quote_json(impact: &str) -> serde_json::Value {
        json!({
            "inputMint": "USDC",
            "inAmount": "25000000",
            "outputMint": "MintA",
            "outAmount": "25000000000",
            "otherAmountThreshold": "24750000000",
            "swapMode": "ExactIn",
            "priceImpactPct": impact
        })
    }

    fn request() -> QuoteRequest {
        QuoteRequest {
            input_mint: "USDC".to_string(),
            output_mint: "MintA".to_string(),
            amount: 25_000_000,
            slippage_bps: 100,
        }
    }

    const LIMITS: ValidationLimits = ValidationLimits {
        min_trade_value: 1.0,
        max_slippage_pct: 1.0,
    };

    #[tokio::test]
    async fn test_approves_good_quote() {
        let router = StubRouter::new(Some(quote_json("0.2")));
        let quote = validate_trade(&router, &request(), 25.0, LIMITS).await.unwrap();
        assert_eq!(quote.out_amount, 25_000_000_000);
    }

    #[tokio::test]
    async fn test_small_trade_short_circuits() {
        let router = StubRouter::new(Some(quote_json("0.2")));
        let result = validate_trade(&router, &request(), 0.5, LIMITS).await;
        assert!(matches!(result, Err(TradeError::Validation(_))));
        assert_eq!(*router.calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_missing_quote_rejected() {
        let mut raw = quote_json("0.2");
        raw.as_object_mut().unwrap().remove("otherAmountThreshold");
        let router = StubRouter::new(Some(raw));
        let result = validate_trade(&router, &request(), 25.0, LIMITS).await;
        assert!(matches!(result, Err(TradeError::QuoteRejected(_))));
    }

    #[tokio::test]
    async fn test_price_impact_over_limit() {
        let router = StubRouter::new(Some(quote_json("1.5")));
        let result = validate_trade(&router, &request(), 25.0, LIMITS).await;
        assert!(matches!(result, Err(TradeError::SlippageTooHigh { .. })));
    }
}
