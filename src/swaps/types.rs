/// Swap quote types
use serde_json::Value;
use std::time::{Duration, Instant};

/// Parameters of a quote request
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// Raw input amount in the input mint's base units
    pub amount: u64,
    pub slippage_bps: u16,
}

/// A priced route from the aggregator
///
/// `raw` is the untouched response body; the swap request embeds it as-is.
#[derive(Debug, Clone)]
pub struct Quote {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub out_amount: u64,
    pub other_amount_threshold: u64,
    pub swap_mode: String,
    /// Price impact in percent
    pub price_impact_pct: f64,
    pub route_labels: Vec<String>,
    pub raw: Value,
    pub fetched_at: Instant,
}

impl Quote {
    /// Parse an aggregator quote response
    ///
    /// Returns None if any field the swap endpoint relies on is missing or
    /// malformed.
    pub fn from_response(raw: Value) -> Option<Self> {
        let input_mint = non_empty_str(&raw, "inputMint")?;
        let output_mint = non_empty_str(&raw, "outputMint")?;
        let in_amount = amount_field(&raw, "inAmount")?;
        let out_amount = amount_field(&raw, "outAmount")?;
        let other_amount_threshold = amount_field(&raw, "otherAmountThreshold")?;
        let swap_mode = non_empty_str(&raw, "swapMode")?;

        let price_impact_pct = match raw.get("priceImpactPct") {
            Some(Value::String(s)) => s.parse::<f64>().ok()?,
            Some(Value::Number(n)) => n.as_f64()?,
            _ => 0.0,
        };

        let route_labels = raw
            .get("routePlan")
            .and_then(|plan| plan.as_array())
            .map(|steps| {
                steps
                    .iter()
                    .filter_map(|step| step.pointer("/swapInfo/label")?.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            input_mint,
            output_mint,
            in_amount,
            out_amount,
            other_amount_threshold,
            swap_mode,
            price_impact_pct,
            route_labels,
            raw,
            fetched_at: Instant::now(),
        })
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }

    /// Whether this quote still answers `request`
    pub fn matches(&self, request: &QuoteRequest) -> bool {
        self.input_mint == request.input_mint
            && self.output_mint == request.output_mint
            && self.in_amount == request.amount
    }

    pub fn route(&self) -> String {
        if self.route_labels.is_empty() {
            "unknown".to_string()
        } else {
            self.route_labels.join(" -> ")
        }
    }
}

fn non_empty_str(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)?
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Amounts arrive as decimal strings; plain numbers are tolerated
fn amount_field(raw: &Value, key: &str) -> Option<u64> {
    match raw.get(key)? {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_quote_json() -> Value {
        json!({
            "inputMint": "EPjFWJd5AufqSSqeM2qUD1NWEKsJ3ZrLPwg5TQ2yEt1v",
            "inAmount": "25000000",
            "outputMint": "MintA",
            "outAmount": "24750000000",
            "otherAmountThreshold": "24502500000",
            "swapMode": "ExactIn",
            "slippageBps": 100,
            "priceImpactPct": "0.12",
            "routePlan": [
                {"swapInfo": {"ammKey": "amm1", "label": "Orca"}, "percent": 100},
                {"swapInfo": {"ammKey": "amm2", "label": "Raydium"}, "percent": 100}
            ]
        })
    }

    #[test]
    fn test_parse_complete_quote() {
        let quote = Quote::from_response(sample_quote_json()).unwrap();
        assert_eq!(quote.in_amount, 25_000_000);
        assert_eq!(quote.out_amount, 24_750_000_000);
        assert_eq!(quote.other_amount_threshold, 24_502_500_000);
        assert_eq!(quote.swap_mode, "ExactIn");
        assert_eq!(quote.price_impact_pct, 0.12);
        assert_eq!(quote.route(), "Orca -> Raydium");
        assert!(!quote.is_stale(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_threshold_rejected() {
        let mut raw = sample_quote_json();
        raw.as_object_mut().unwrap().remove("otherAmountThreshold");
        assert!(Quote::from_response(raw).is_none());
    }

    #[test]
    fn test_malformed_amount_rejected() {
        let mut raw = sample_quote_json();
        raw["outAmount"] = json!("12.5");
        assert!(Quote::from_response(raw).is_none());

        let mut raw = sample_quote_json();
        raw["inputMint"] = json!("");
        assert!(Quote::from_response(raw).is_none());
    }

    #[test]
    fn test_matches_request() {
        let quote = Quote::from_response(sample_quote_json()).unwrap();
        let mut request = QuoteRequest {
            input_mint: quote.input_mint.clone(),
            output_mint: "MintA".to_string(),
            amount: 25_000_000,
            slippage_bps: 100,
        };
        assert!(quote.matches(&request));
        request.amount = 1;
        assert!(!quote.matches(&request));
    }
}
