/// Jupiter-style swap aggregator client
///
/// Quote: GET {quote_url}?inputMint&outputMint&amount&slippageBps
/// Swap:  POST {swap_url} with the quote embedded → {"swapTransaction": base64}
use super::types::{Quote, QuoteRequest};
use super::SwapRouter;
use crate::apis::client::{HttpClient, RateLimiter, RetryPolicy};
use crate::config::SwapsConfig;
use crate::errors::ApiError;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct JupiterQuoteParams {
    #[serde(rename = "inputMint")]
    input_mint: String,
    #[serde(rename = "outputMint")]
    output_mint: String,
    amount: String,
    #[serde(rename = "slippageBps")]
    slippage_bps: u16,
}

#[derive(Debug, Serialize)]
struct PriorityLevelWithMaxLamports {
    #[serde(rename = "priorityLevel")]
    priority_level: &'static str,
    #[serde(rename = "maxLamports")]
    max_lamports: u64,
}

#[derive(Debug, Serialize)]
struct PrioritizationFee {
    #[serde(rename = "priorityLevelWithMaxLamports")]
    priority_level_with_max_lamports: PriorityLevelWithMaxLamports,
}

#[derive(Debug, Serialize)]
struct JupiterSwapRequest<'a> {
    #[serde(rename = "quoteResponse")]
    quote_response: &'a serde_json::Value,
    #[serde(rename = "userPublicKey")]
    user_public_key: &'a str,
    #[serde(rename = "wrapAndUnwrapSol")]
    wrap_and_unwrap_sol: bool,
    #[serde(rename = "useSharedAccounts")]
    use_shared_accounts: bool,
    #[serde(rename = "dynamicComputeUnitLimit")]
    dynamic_compute_unit_limit: bool,
    #[serde(rename = "prioritizationFeeLamports")]
    prioritization_fee_lamports: PrioritizationFee,
}

#[derive(Debug, Deserialize)]
struct JupiterSwapResponse {
    #[serde(rename = "swapTransaction")]
    swap_transaction: Option<String>,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct JupiterClient {
    http: HttpClient,
    quote_url: String,
    swap_url: String,
    max_priority_fee_lamports: u64,
}

impl JupiterClient {
    pub fn new(config: &SwapsConfig, per_minute: u32, retry: RetryPolicy) -> Result<Self, ApiError> {
        let http = HttpClient::new(
            "jupiter",
            config.timeout_secs,
            RateLimiter::per_minute(per_minute),
            retry,
        )?;

        Ok(Self {
            http,
            quote_url: config.quote_url.clone(),
            swap_url: config.swap_url.clone(),
            max_priority_fee_lamports: config.max_priority_fee_lamports,
        })
    }

    fn swap_body<'a>(&self, quote: &'a Quote, wallet: &'a str) -> JupiterSwapRequest<'a> {
        JupiterSwapRequest {
            quote_response: &quote.raw,
            user_public_key: wallet,
            wrap_and_unwrap_sol: true,
            use_shared_accounts: true,
            dynamic_compute_unit_limit: true,
            prioritization_fee_lamports: PrioritizationFee {
                priority_level_with_max_lamports: PriorityLevelWithMaxLamports {
                    priority_level: "medium",
                    max_lamports: self.max_priority_fee_lamports,
                },
            },
        }
    }
}

#[async_trait]
impl SwapRouter for JupiterClient {
    async fn get_quote(&self, request: &QuoteRequest) -> Option<Quote> {
        let params = JupiterQuoteParams {
            input_mint: request.input_mint.clone(),
            output_mint: request.output_mint.clone(),
            amount: request.amount.to_string(),
            slippage_bps: request.slippage_bps,
        };

        logger::debug(
            LogTag::Swap,
            &format!(
                "Quote request: {} {} -> {} (slippage: {}bps)",
                request.amount, request.input_mint, request.output_mint, request.slippage_bps
            ),
        );

        let raw: serde_json::Value = match self
            .http
            .send_json("quote", |client| client.get(&self.quote_url).query(&params))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                logger::warning(LogTag::Swap, &format!("Quote request failed: {}", e));
                return None;
            }
        };

        match Quote::from_response(raw) {
            Some(quote) => {
                logger::debug(
                    LogTag::Swap,
                    &format!(
                        "Quote: {} out, {:.4}% impact, route: {}",
                        quote.out_amount,
                        quote.price_impact_pct,
                        quote.route()
                    ),
                );
                Some(quote)
            }
            None => {
                logger::warning(
                    LogTag::Swap,
                    &format!(
                        "Quote for {} -> {} is missing required fields, rejecting",
                        request.input_mint, request.output_mint
                    ),
                );
                None
            }
        }
    }

    async fn get_signable_transaction(&self, quote: &Quote, wallet: &str) -> Option<Vec<u8>> {
        let body = self.swap_body(quote, wallet);

        let response: JupiterSwapResponse = match self
            .http
            .send_json("swap", |client| client.post(&self.swap_url).json(&body))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                logger::warning(LogTag::Swap, &format!("Swap request failed: {}", e));
                return None;
            }
        };

        let Some(encoded) = response.swap_transaction.filter(|s| !s.is_empty()) else {
            logger::warning(LogTag::Swap, "Swap response has no swapTransaction");
            return None;
        };

        match STANDARD.decode(encoded.as_bytes()) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(e) => {
                logger::warning(
                    LogTag::Swap,
                    &format!("swapTransaction is not valid base64: {}", e),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quote_json() -> serde_json::Value {
        json!({
            "inputMint": "USDC",
            "inAmount": "25000000",
            "outputMint": "MintA",
            "outAmount": "24750000000",
            "otherAmountThreshold": "24502500000",
            "swapMode": "ExactIn",
            "priceImpactPct": "0.05",
            "routePlan": []
        })
    }

    fn client(server: &MockServer) -> JupiterClient {
        let config = SwapsConfig {
            quote_url: format!("{}/quote", server.uri()),
            swap_url: format!("{}/swap", server.uri()),
            max_priority_fee_lamports: 5000,
            ..Default::default()
        };
        JupiterClient::new(&config, 0, RetryPolicy::none()).unwrap()
    }

    fn request() -> QuoteRequest {
        QuoteRequest {
            input_mint: "USDC".to_string(),
            output_mint: "MintA".to_string(),
            amount: 25_000_000,
            slippage_bps: 100,
        }
    }

    #[tokio::test]
    async fn test_quote_query_and_parse() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("inputMint", "USDC"))
            .and(query_param("outputMint", "MintA"))
            .and(query_param("amount", "25000000"))
            .and(query_param("slippageBps", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quote_json()))
            .mount(&server)
            .await;

        let quote = client(&server).get_quote(&request()).await.unwrap();
        assert_eq!(quote.out_amount, 24_750_000_000);
        assert_eq!(quote.raw, quote_json());
    }

    #[tokio::test]
    async fn test_quote_without_threshold_is_none() {
        let server = MockServer::start().await;
        let mut body = quote_json();
        body.as_object_mut().unwrap().remove("otherAmountThreshold");
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        assert!(client(&server).get_quote(&request()).await.is_none());
    }

    #[tokio::test]
    async fn test_swap_request_body_and_decode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/swap"))
            .and(body_partial_json(json!({
                "quoteResponse": quote_json(),
                "userPublicKey": "Wallet111",
                "wrapAndUnwrapSol": true,
                "useSharedAccounts": true,
                "dynamicComputeUnitLimit": true,
                "prioritizationFeeLamports": {
                    "priorityLevelWithMaxLamports": {"priorityLevel": "medium", "maxLamports": 5000}
                }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"swapTransaction": STANDARD.encode([1u8, 2, 3])})),
            )
            .mount(&server)
            .await;

        let quote = Quote::from_response(quote_json()).unwrap();
        let bytes = client(&server)
            .get_signable_transaction(&quote, "Wallet111")
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_swap_malformed_response_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/swap"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"swapTransaction": "%%%not-base64"})),
            )
            .mount(&server)
            .await;

        let quote = Quote::from_response(quote_json()).unwrap();
        assert!(client(&server)
            .get_signable_transaction(&quote, "Wallet111")
            .await
            .is_none());
    }
}
