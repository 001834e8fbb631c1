/// Primary price oracle client
///
/// GET {primary_price_url}?address={token}
/// → {"data": {"price", "liquidityUsd", "volume24h", "priceChange24h"}}
use super::client::{HttpClient, RateLimiter, RetryPolicy};
use crate::config::MarketDataConfig;
use crate::errors::ApiError;
use crate::market_data::{MarketSnapshot, PriceSource, SnapshotSource};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct OracleResponse {
    data: Option<OracleData>,
}

#[derive(Debug, Deserialize)]
struct OracleData {
    price: Option<f64>,
    #[serde(rename = "liquidityUsd")]
    liquidity_usd: Option<f64>,
    #[serde(rename = "volume24h")]
    volume_24h: Option<f64>,
    #[serde(rename = "priceChange24h")]
    price_change_24h: Option<f64>,
}

pub struct PriceOracleClient {
    http: HttpClient,
    url: String,
    api_key: Option<String>,
}

impl PriceOracleClient {
    pub fn new(
        config: &MarketDataConfig,
        per_minute: u32,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        let http = HttpClient::new(
            "oracle",
            config.timeout_secs,
            RateLimiter::per_minute(per_minute),
            retry,
        )?;
        let api_key = Some(config.primary_api_key.clone()).filter(|k| !k.is_empty());

        Ok(Self {
            http,
            url: config.primary_price_url.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl PriceSource for PriceOracleClient {
    fn name(&self) -> &'static str {
        "Price oracle"
    }

    async fn fetch(&self, token: &str) -> Result<Option<MarketSnapshot>, ApiError> {
        let response: OracleResponse = self
            .http
            .send_json("price", |client| {
                let mut request = client.get(&self.url).query(&[("address", token)]);
                if let Some(key) = &self.api_key {
                    request = request.header("X-API-KEY", key);
                }
                request
            })
            .await?;

        let Some(data) = response.data else {
            return Ok(None);
        };
        let Some(price) = data.price else {
            return Ok(None);
        };

        Ok(Some(MarketSnapshot {
            price,
            liquidity: data.liquidity_usd.unwrap_or(0.0),
            volume_24h: data.volume_24h.unwrap_or(0.0),
            price_change_24h: data.price_change_24h.unwrap_or(0.0),
            source: SnapshotSource::PrimaryOracle,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oracle(server: &MockServer, api_key: &str) -> PriceOracleClient {
        let config = MarketDataConfig {
            primary_price_url: format!("{}/defi/price", server.uri()),
            primary_api_key: api_key.to_string(),
            ..Default::default()
        };
        PriceOracleClient::new(&config, 0, RetryPolicy::none()).unwrap()
    }

    #[tokio::test]
    async fn test_parses_price_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/defi/price"))
            .and(query_param("address", "MintA"))
            .and(header("X-API-KEY", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "price": 1.01,
                    "liquidityUsd": 250000.0,
                    "volume24h": 1200.5,
                    "priceChange24h": -3.2
                }
            })))
            .mount(&server)
            .await;

        let snap = oracle(&server, "secret").fetch("MintA").await.unwrap().unwrap();
        assert_eq!(snap.price, 1.01);
        assert_eq!(snap.liquidity, 250000.0);
        assert_eq!(snap.volume_24h, 1200.5);
        assert_eq!(snap.price_change_24h, -3.2);
        assert_eq!(snap.source, SnapshotSource::PrimaryOracle);
    }

    #[tokio::test]
    async fn test_missing_data_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
            .mount(&server)
            .await;

        assert!(oracle(&server, "").fetch("MintA").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_200_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(oracle(&server, "").fetch("MintA").await.is_err());
    }
}
