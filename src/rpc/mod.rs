/// Ledger JSON-RPC access
///
/// `LedgerRpc` is the seam between the signer/controller and the network;
/// `RpcClient` is the HTTP implementation.
pub mod client;
pub mod types;

pub use client::RpcClient;
pub use types::{Commitment, SignatureStatus};

use crate::errors::RpcError;
use async_trait::async_trait;
use solana_sdk::hash::Hash;

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Hash, RpcError>;

    /// Submit a base64 wire transaction, returning the signature the node reports
    async fn send_transaction(&self, transaction_base64: &str) -> Result<String, RpcError>;

    /// None when the node has not seen the signature
    async fn signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, RpcError>;

    /// Raw token balance of `owner` for `mint`, summed over its token accounts
    async fn token_balance(&self, owner: &str, mint: &str) -> Result<u64, RpcError>;

    async fn token_decimals(&self, mint: &str) -> Result<u8, RpcError>;
}

#[cfg(test)]
pub mod testing;
