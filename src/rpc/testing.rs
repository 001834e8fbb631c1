/// Scripted in-memory ledger for tests
use super::types::{Commitment, SignatureStatus};
use super::LedgerRpc;
use crate::errors::RpcError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::Mutex;
use solana_sdk::hash::Hash;
use solana_sdk::transaction::VersionedTransaction;
use std::collections::{HashMap, VecDeque};

/// Fake ledger with scripted responses
///
/// Unscripted sends answer with the transaction's own first signature and
/// unscripted status queries report "finalized".
pub struct FakeLedger {
    pub blockhash: Hash,
    pub fail_blockhash: Mutex<bool>,
    pub sent: Mutex<Vec<VersionedTransaction>>,
    pub send_script: Mutex<VecDeque<Result<String, RpcError>>>,
    pub status_script: Mutex<VecDeque<Result<Option<SignatureStatus>, RpcError>>>,
    pub status_queries: Mutex<u32>,
    pub token_balances: Mutex<HashMap<String, u64>>,
    pub decimals: Mutex<HashMap<String, u8>>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            fail_blockhash: Mutex::new(false),
            sent: Mutex::new(Vec::new()),
            send_script: Mutex::new(VecDeque::new()),
            status_script: Mutex::new(VecDeque::new()),
            status_queries: Mutex::new(0),
            token_balances: Mutex::new(HashMap::new()),
            decimals: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeLedger {
    pub fn script_send(&self, result: Result<String, RpcError>) {
        self.send_script.lock().push_back(result);
    }

    pub fn script_status(&self, result: Result<Option<SignatureStatus>, RpcError>) {
        self.status_script.lock().push_back(result);
    }

    pub fn set_balance(&self, mint: &str, raw: u64) {
        self.token_balances.lock().insert(mint.to_string(), raw);
    }

    pub fn set_decimals(&self, mint: &str, decimals: u8) {
        self.decimals.lock().insert(mint.to_string(), decimals);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn status(commitment: Commitment) -> SignatureStatus {
        SignatureStatus {
            commitment: Some(commitment),
            err: None,
        }
    }
}

#[async_trait]
impl LedgerRpc for FakeLedger {
    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        if *self.fail_blockhash.lock() {
            return Err(RpcError::Transport("connection reset".to_string()));
        }
        Ok(self.blockhash)
    }

    async fn send_transaction(&self, transaction_base64: &str) -> Result<String, RpcError> {
        let bytes = STANDARD
            .decode(transaction_base64)
            .map_err(|e| RpcError::Malformed(e.to_string()))?;
        let tx: VersionedTransaction =
            bincode::deserialize(&bytes).map_err(|e| RpcError::Malformed(e.to_string()))?;
        let own_signature = tx.signatures.first().map(|s| s.to_string()).unwrap_or_default();
        self.sent.lock().push(tx);

        match self.send_script.lock().pop_front() {
            Some(result) => result,
            None => Ok(own_signature),
        }
    }

    async fn signature_status(&self, _signature: &str) -> Result<Option<SignatureStatus>, RpcError> {
        *self.status_queries.lock() += 1;
        match self.status_script.lock().pop_front() {
            Some(result) => result,
            None => Ok(Some(Self::status(Commitment::Finalized))),
        }
    }

    async fn token_balance(&self, _owner: &str, mint: &str) -> Result<u64, RpcError> {
        Ok(self.token_balances.lock().get(mint).copied().unwrap_or(0))
    }

    async fn token_decimals(&self, mint: &str) -> Result<u8, RpcError> {
        self.decimals
            .lock()
            .get(mint)
            .copied()
            .ok_or_else(|| RpcError::Malformed(format!("unknown mint {}", mint)))
    }
}
