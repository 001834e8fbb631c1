/// DexScreener pair aggregator, used as the fallback price source
///
/// GET {base}/latest/dex/tokens/{token} → {"pairs": [...]}. The pair with the
/// deepest USD liquidity wins; on a tie the first listed pair is kept.
use super::client::{HttpClient, RateLimiter, RetryPolicy};
use crate::config::MarketDataConfig;
use crate::errors::ApiError;
use crate::market_data::{MarketSnapshot, PriceSource, SnapshotSource};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PairsResponse {
    pairs: Option<Vec<DexScreenerPair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexScreenerPair {
    price_usd: Option<String>,
    liquidity: Option<LiquidityData>,
    volume: Option<WindowData>,
    price_change: Option<WindowData>,
}

#[derive(Debug, Deserialize)]
struct LiquidityData {
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WindowData {
    h24: Option<f64>,
}

impl DexScreenerPair {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    fn price(&self) -> Option<f64> {
        self.price_usd.as_deref()?.parse::<f64>().ok()
    }
}

/// Pick the pair with the greatest liquidity, first one on ties
fn deepest_pair(pairs: &[DexScreenerPair]) -> Option<&DexScreenerPair> {
    let mut best: Option<&DexScreenerPair> = None;
    for pair in pairs {
        match best {
            Some(current) if pair.liquidity_usd() <= current.liquidity_usd() => {}
            _ => best = Some(pair),
        }
    }
    best
}

pub struct DexScreenerClient {
    http: HttpClient,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(
        config: &MarketDataConfig,
        per_minute: u32,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        let http = HttpClient::new(
            "dexscreener",
            config.timeout_secs,
            RateLimiter::per_minute(per_minute),
            retry,
        )?;

        Ok(Self {
            http,
            base_url: config.fallback_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PriceSource for DexScreenerClient {
    fn name(&self) -> &'static str {
        "DexScreener"
    }

    async fn fetch(&self, token: &str) -> Result<Option<MarketSnapshot>, ApiError> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, token);
        let response: PairsResponse = self
            .http
            .send_json("latest/dex/tokens", |client| client.get(&url))
            .await?;

        let pairs = response.pairs.unwrap_or_default();
        let Some(pair) = deepest_pair(&pairs) else {
            return Ok(None);
        };
        let Some(price) = pair.price() else {
            return Ok(None);
        };

        Ok(Some(MarketSnapshot {
            price,
            liquidity: pair.liquidity_usd(),
            volume_24h: pair.volume.as_ref().and_then(|v| v.h24).unwrap_or(0.0),
            price_change_24h: pair.price_change.as_ref().and_then(|v| v.h24).unwrap_or(0.0),
            source: SnapshotSource::DexAggregator,
        }))
    }
}
