/// JSON-RPC client for the ledger network
use super::types::{Commitment, SignatureStatus};
use super::LedgerRpc;
use crate::apis::client::{HttpClient, RateLimiter, RetryPolicy};
use crate::config::RpcConfig;
use crate::errors::RpcError;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Most ledger responses wrap the payload in {"context": .., "value": ..}
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
struct TokenSupplyValue {
    decimals: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSignatureStatus {
    confirmation_status: Option<String>,
    err: Option<Value>,
}

pub struct RpcClient {
    http: HttpClient,
    url: String,
}

impl RpcClient {
    pub fn new(config: &RpcConfig, per_minute: u32, retry: RetryPolicy) -> Result<Self, RpcError> {
        let http = HttpClient::new(
            "rpc",
            config.timeout_secs,
            RateLimiter::per_minute(per_minute),
            retry,
        )?;

        Ok(Self {
            http,
            url: config.url.clone(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let envelope: RpcEnvelope<T> = self
            .http
            .send_json(method, |client| client.post(&self.url).json(&payload))
            .await?;

        if let Some(error) = envelope.error {
            return Err(RpcError::Node {
                code: error.code,
                message: error.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| RpcError::Malformed(format!("{} returned no result", method)))
    }
}

fn parse_token_amounts(accounts: &[Value]) -> Result<u64, RpcError> {
    let mut total: u64 = 0;
    for account in accounts {
        let amount = account
            .pointer("/account/data/parsed/info/tokenAmount/amount")
            .and_then(|a| a.as_str())
            .ok_or_else(|| RpcError::Malformed("token account without amount".to_string()))?;
        let amount = amount
            .parse::<u64>()
            .map_err(|e| RpcError::Malformed(format!("bad token amount '{}': {}", amount, e)))?;
        total = total.saturating_add(amount);
    }
    Ok(total)
}

#[async_trait]
impl LedgerRpc for RpcClient {
    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        let response: WithContext<BlockhashValue> = self
            .call("getLatestBlockhash", json!([{ "commitment": "confirmed" }]))
            .await?;

        Hash::from_str(&response.value.blockhash)
            .map_err(|e| RpcError::Malformed(format!("invalid blockhash: {}", e)))
    }

    async fn send_transaction(&self, transaction_base64: &str) -> Result<String, RpcError> {
        let signature: String = self
            .call(
                "sendTransaction",
                json!([
                    transaction_base64,
                    {
                        "encoding": "base64",
                        "skipPreflight": true,
                        "maxRetries": 2
                    }
                ]),
            )
            .await?;

        logger::debug(LogTag::Rpc, &format!("sendTransaction accepted: {}", signature));
        Ok(signature)
    }

    async fn signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, RpcError> {
        let response: WithContext<Vec<Option<RawSignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;

        let Some(Some(raw)) = response.value.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(SignatureStatus {
            commitment: raw.confirmation_status.as_deref().and_then(Commitment::parse),
            err: raw.err.filter(|e| !e.is_null()).map(|e| e.to_string()),
        }))
    }

    async fn token_balance(&self, owner: &str, mint: &str) -> Result<u64, RpcError> {
        let response: WithContext<Vec<Value>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner,
                    { "mint": mint },
                    { "encoding": "jsonParsed", "commitment": "confirmed" }
                ]),
            )
            .await?;

        parse_token_amounts(&response.value)
    }

    async fn token_decimals(&self, mint: &str) -> Result<u8, RpcError> {
        let response: WithContext<TokenSupplyValue> =
            self.call("getTokenSupply", json!([mint])).await?;
        Ok(response.value.decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_method(server: &MockServer, rpc_method: &str, result: Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result})),
            )
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> RpcClient {
        let config = RpcConfig {
            url: server.uri(),
            ..Default::default()
        };
        RpcClient::new(&config, 0, RetryPolicy::none()).unwrap()
    }

    #[tokio::test]
    async fn test_latest_blockhash() {
        let server = MockServer::start().await;
        let hash = Hash::new_unique();
        mock_method(
            &server,
            "getLatestBlockhash",
            json!({"context": {"slot": 1}, "value": {"blockhash": hash.to_string(), "lastValidBlockHeight": 9}}),
        )
        .await;

        assert_eq!(client(&server).latest_blockhash().await.unwrap(), hash);
    }

    #[tokio::test]
    async fn test_send_transaction_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "sendTransaction",
                "params": ["AQID", {"encoding": "base64", "skipPreflight": true, "maxRetries": 2}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": "5igSig"})))
            .mount(&server)
            .await;

        assert_eq!(client(&server).send_transaction("AQID").await.unwrap(), "5igSig");
    }

    #[tokio::test]
    async fn test_node_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": -32002, "message": "Blockhash not found"}
            })))
            .mount(&server)
            .await;

        match client(&server).send_transaction("AQID").await {
            Err(RpcError::Node { code, .. }) => assert_eq!(code, -32002),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_signature_status_variants() {
        let server = MockServer::start().await;
        mock_method(
            &server,
            "getSignatureStatuses",
            json!({"context": {"slot": 1}, "value": [{"slot": 1, "confirmations": null, "err": null, "confirmationStatus": "finalized"}]}),
        )
        .await;

        let status = client(&server).signature_status("sig").await.unwrap().unwrap();
        assert_eq!(status.commitment, Some(Commitment::Finalized));
        assert!(status.err.is_none());

        let server = MockServer::start().await;
        mock_method(&server, "getSignatureStatuses", json!({"context": {"slot": 1}, "value": [null]})).await;
        assert!(client(&server).signature_status("sig").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_balance_sums_accounts() {
        let server = MockServer::start().await;
        let account = |amount: &str| {
            json!({"pubkey": "acc", "account": {"data": {"parsed": {"info": {"tokenAmount": {"amount": amount, "decimals": 6}}}}}})
        };
        mock_method(
            &server,
            "getTokenAccountsByOwner",
            json!({"context": {"slot": 1}, "value": [account("1500"), account("500")]}),
        )
        .await;

        assert_eq!(client(&server).token_balance("owner", "mint").await.unwrap(), 2000);
    }

    #[tokio::test]
    async fn test_token_decimals() {
        let server = MockServer::start().await;
        mock_method(
            &server,
            "getTokenSupply",
            json!({"context": {"slot": 1}, "value": {"amount": "1000", "decimals": 9, "uiAmountString": "0.000001"}}),
        )
        .await;

        assert_eq!(client(&server).token_decimals("mint").await.unwrap(), 9);
    }
}
