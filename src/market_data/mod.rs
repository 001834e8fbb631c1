/// Market data client
///
/// Current price, liquidity and volume for a token. The primary oracle is
/// asked first; any failure or empty answer falls through to the DEX pair
/// aggregator. When both fail the caller gets a zero snapshot, never an error.
/// Nothing is cached.
use crate::errors::ApiError;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Which source produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    PrimaryOracle,
    DexAggregator,
    Unavailable,
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotSource::PrimaryOracle => write!(f, "primary"),
            SnapshotSource::DexAggregator => write!(f, "dex"),
            SnapshotSource::Unavailable => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub price: f64,
    pub liquidity: f64,
    pub volume_24h: f64,
    pub price_change_24h: f64,
    pub source: SnapshotSource,
}

impl MarketSnapshot {
    pub fn unavailable() -> Self {
        Self {
            price: 0.0,
            liquidity: 0.0,
            volume_24h: 0.0,
            price_change_24h: 0.0,
            source: SnapshotSource::Unavailable,
        }
    }

    /// A zero price means no source answered
    pub fn has_price(&self) -> bool {
        self.price > 0.0 && self.price.is_finite()
    }
}

/// One price source. `Ok(None)` means the source answered but had no data.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, token: &str) -> Result<Option<MarketSnapshot>, ApiError>;
}

pub struct MarketDataClient {
    primary: Arc<dyn PriceSource>,
    fallback: Arc<dyn PriceSource>,
}

impl MarketDataClient {
    pub fn new(primary: Arc<dyn PriceSource>, fallback: Arc<dyn PriceSource>) -> Self {
        Self { primary, fallback }
    }

    pub async fn get_price(&self, token: &str) -> MarketSnapshot {
        if let Some(snapshot) = self.try_source(self.primary.as_ref(), token).await {
            return snapshot;
        }

        if let Some(snapshot) = self.try_source(self.fallback.as_ref(), token).await {
            return snapshot;
        }

        logger::warning(
            LogTag::Market,
            &format!("No price available for {} from any source", token),
        );
        MarketSnapshot::unavailable()
    }

    async fn try_source(&self, source: &dyn PriceSource, token: &str) -> Option<MarketSnapshot> {
        match source.fetch(token).await {
            Ok(Some(snapshot)) if snapshot.has_price() => {
                logger::debug(
                    LogTag::Market,
                    &format!(
                        "{} price for {}: {:.8} (liq ${:.0})",
                        source.name(),
                        token,
                        snapshot.price,
                        snapshot.liquidity
                    ),
                );
                Some(snapshot)
            }
            Ok(_) => {
                logger::debug(
                    LogTag::Market,
                    &format!("{} returned no price data for {}", source.name(), token),
                );
                None
            }
            Err(e) => {
                logger::warning(
                    LogTag::Market,
                    &format!("{} price lookup failed for {}: {}", source.name(), token, e),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        name: &'static str,
        result: fn() -> Result<Option<MarketSnapshot>, ApiError>,
    }

    #[async_trait]
    impl PriceSource for FixedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _token: &str) -> Result<Option<MarketSnapshot>, ApiError> {
            (self.result)()
        }
    }

    fn snapshot(price: f64, source: SnapshotSource) -> MarketSnapshot {
        MarketSnapshot {
            price,
            liquidity: 1000.0,
            volume_24h: 50.0,
            price_change_24h: 1.5,
            source,
        }
    }

    fn client(
        primary: fn() -> Result<Option<MarketSnapshot>, ApiError>,
        fallback: fn() -> Result<Option<MarketSnapshot>, ApiError>,
    ) -> MarketDataClient {
        MarketDataClient::new(
            Arc::new(FixedSource {
                name: "primary",
                result: primary,
            }),
            Arc::new(FixedSource {
                name: "fallback",
                result: fallback,
            }),
        )
    }

    #[tokio::test]
    async fn test_primary_wins() {
        let md = client(
            || Ok(Some(snapshot(1.01, SnapshotSource::PrimaryOracle))),
            || Ok(Some(snapshot(2.0, SnapshotSource::DexAggregator))),
        );
        let snap = md.get_price("TOKEN").await;
        assert_eq!(snap.price, 1.01);
        assert_eq!(snap.source, SnapshotSource::PrimaryOracle);
    }

    #[tokio::test]
    async fn test_falls_back_on_error_and_empty() {
        let md = client(
            || {
                Err(ApiError::Status {
                    endpoint: "price".into(),
                    status: 500,
                    body: String::new(),
                })
            },
            || Ok(Some(snapshot(2.0, SnapshotSource::DexAggregator))),
        );
        assert_eq!(md.get_price("TOKEN").await.source, SnapshotSource::DexAggregator);

        let md = client(
            || Ok(Some(snapshot(0.0, SnapshotSource::PrimaryOracle))),
            || Ok(Some(snapshot(2.0, SnapshotSource::DexAggregator))),
        );
        assert_eq!(md.get_price("TOKEN").await.price, 2.0);
    }

    #[tokio::test]
    async fn test_both_fail_gives_zero_snapshot() {
        let md = client(|| Ok(None), || Ok(None));
        let snap = md.get_price("TOKEN").await;
        assert_eq!(snap, MarketSnapshot::unavailable());
        assert!(!snap.has_price());
    }
}
