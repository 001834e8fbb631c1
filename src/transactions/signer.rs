/// Transaction signing and submission
///
/// A swap transaction from the aggregator is rebuilt with a fresh blockhash
/// and signed right before each send. Signed bytes are never reused across
/// attempts.
use crate::config::{RpcConfig, TraderConfig};
use crate::errors::RpcError;
use crate::logger::{self, LogTag};
use crate::rpc::{Commitment, LedgerRpc};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::message::VersionedMessage;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;
use std::time::Duration;

/// A transaction ready to send
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: VersionedTransaction,
    pub signature: Signature,
    /// base64 wire encoding
    pub encoded: String,
}

/// Result of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Confirmed { signature: String },
    Failed { reason: String },
}

/// Polling and retry settings for submission
#[derive(Debug, Clone, Copy)]
pub struct SubmitSettings {
    pub confirm_poll_attempts: u32,
    pub finality_poll_attempts: u32,
    pub poll_interval: Duration,
    pub retry_backoff: Duration,
}

impl SubmitSettings {
    pub fn from_config(rpc: &RpcConfig, trader: &TraderConfig) -> Self {
        Self {
            confirm_poll_attempts: rpc.confirm_poll_attempts.max(1),
            finality_poll_attempts: rpc.finality_poll_attempts,
            poll_interval: Duration::from_millis(rpc.poll_interval_ms),
            retry_backoff: Duration::from_millis(trader.submit_backoff_ms),
        }
    }
}

enum WaitResult {
    Reached,
    ChainError(String),
    /// Soft error on a signature the node acknowledged
    Soft(String),
    TimedOut,
}

/// Wallet key plus ledger handle, built once at startup
pub struct SigningContext {
    keypair: Keypair,
    rpc: Arc<dyn LedgerRpc>,
    settings: SubmitSettings,
}

impl SigningContext {
    pub fn new(keypair: Keypair, rpc: Arc<dyn LedgerRpc>, settings: SubmitSettings) -> Self {
        Self {
            keypair,
            rpc,
            settings,
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn wallet_address(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    pub fn rpc(&self) -> &Arc<dyn LedgerRpc> {
        &self.rpc
    }

    /// Refresh the blockhash of an unsigned transaction and sign it
    ///
    /// Address table lookups of V0 messages are kept. Any failure is None.
    pub async fn prepare(&self, raw: &[u8]) -> Option<SignedTransaction> {
        let blockhash = match self.rpc.latest_blockhash().await {
            Ok(hash) => hash,
            Err(e) => {
                logger::warning(LogTag::Wallet, &format!("Blockhash fetch failed: {}", e));
                return None;
            }
        };

        let unsigned: VersionedTransaction = match bincode::deserialize(raw) {
            Ok(tx) => tx,
            Err(e) => {
                logger::error(
                    LogTag::Wallet,
                    &format!("Failed to deserialize swap transaction: {}", e),
                );
                return None;
            }
        };

        let mut message = unsigned.message;
        match &mut message {
            VersionedMessage::Legacy(m) => m.recent_blockhash = blockhash,
            VersionedMessage::V0(m) => m.recent_blockhash = blockhash,
        }

        let transaction = match VersionedTransaction::try_new(message, &[&self.keypair]) {
            Ok(tx) => tx,
            Err(e) => {
                logger::error(LogTag::Wallet, &format!("Failed to sign transaction: {}", e));
                return None;
            }
        };

        let signature = *transaction.signatures.first()?;
        let bytes = match bincode::serialize(&transaction) {
            Ok(bytes) => bytes,
            Err(e) => {
                logger::error(
                    LogTag::Wallet,
                    &format!("Failed to serialize signed transaction: {}", e),
                );
                return None;
            }
        };

        logger::debug(
            LogTag::Wallet,
            &format!("Signed transaction {} with blockhash {}", signature, blockhash),
        );

        Some(SignedTransaction {
            transaction,
            encoded: STANDARD.encode(bytes),
            signature,
        })
    }

    /// Send and confirm, retrying the whole cycle with a fresh signature
    ///
    /// Before each retry the previous signature is checked so a transaction
    /// that landed late is not executed twice.
    pub async fn submit(
        &self,
        raw: &[u8],
        signed: SignedTransaction,
        max_retries: u32,
    ) -> SubmitOutcome {
        let attempts = max_retries.max(1);
        let mut next = Some(signed);
        let mut previous: Option<String> = None;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.settings.retry_backoff).await;

                if let Some(sig) = previous.as_deref() {
                    if self.landed(sig).await {
                        logger::info(
                            LogTag::Wallet,
                            &format!("Earlier submission {} landed, not resending", sig),
                        );
                        return SubmitOutcome::Confirmed {
                            signature: sig.to_string(),
                        };
                    }
                }
            }

            let tx = match next.take() {
                Some(tx) => tx,
                None => match self.prepare(raw).await {
                    Some(tx) => tx,
                    None => {
                        last_error = "failed to prepare transaction".to_string();
                        continue;
                    }
                },
            };

            let local_signature = tx.signature.to_string();
            let (signature, acknowledged) = match self.rpc.send_transaction(&tx.encoded).await {
                Ok(sig) => (sig, true),
                Err(e) if e.is_soft_after_submit() => {
                    // Unacknowledged: only an observed status can confirm it
                    logger::warning(
                        LogTag::Wallet,
                        &format!("Soft send error for {}: {}", local_signature, e),
                    );
                    (local_signature, false)
                }
                Err(e) => {
                    logger::warning(
                        LogTag::Wallet,
                        &format!("Send attempt {}/{} failed: {}", attempt, attempts, e),
                    );
                    last_error = e.to_string();
                    previous = Some(local_signature);
                    continue;
                }
            };

            match self
                .wait_for(
                    &signature,
                    Commitment::Confirmed,
                    self.settings.confirm_poll_attempts,
                    acknowledged,
                )
                .await
            {
                WaitResult::Reached => {
                    logger::info(LogTag::Wallet, &format!("Transaction confirmed: {}", signature));
                    self.await_finality(&signature).await;
                    return SubmitOutcome::Confirmed { signature };
                }
                WaitResult::Soft(message) => {
                    logger::warning(
                        LogTag::Wallet,
                        &format!(
                            "Ignoring soft error after acknowledgement of {}: {}",
                            signature, message
                        ),
                    );
                    return SubmitOutcome::Confirmed { signature };
                }
                WaitResult::ChainError(err) => {
                    logger::warning(
                        LogTag::Wallet,
                        &format!("Transaction {} failed on chain: {}", signature, err),
                    );
                    last_error = format!("transaction {} failed: {}", signature, err);
                    // A failed transaction cannot land later
                    previous = None;
                }
                WaitResult::TimedOut => {
                    logger::warning(
                        LogTag::Wallet,
                        &format!(
                            "Transaction {} not confirmed (attempt {}/{})",
                            signature, attempt, attempts
                        ),
                    );
                    last_error = format!("transaction {} not confirmed", signature);
                    previous = Some(signature);
                }
            }
        }

        if let Some(sig) = previous.as_deref() {
            if self.landed(sig).await {
                return SubmitOutcome::Confirmed {
                    signature: sig.to_string(),
                };
            }
        }

        SubmitOutcome::Failed { reason: last_error }
    }

    async fn landed(&self, signature: &str) -> bool {
        matches!(
            self.rpc.signature_status(signature).await,
            Ok(Some(status)) if status.err.is_none() && status.reached(Commitment::Confirmed)
        )
    }

    /// Poll until `target` is reached
    ///
    /// Soft errors end the wait only for a signature the node acknowledged;
    /// otherwise they are treated like any other failed poll.
    async fn wait_for(
        &self,
        signature: &str,
        target: Commitment,
        polls: u32,
        acknowledged: bool,
    ) -> WaitResult {
        for poll in 0..polls {
            if poll > 0 {
                tokio::time::sleep(self.settings.poll_interval).await;
            }

            match self.rpc.signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(err) = status.err {
                        return WaitResult::ChainError(err);
                    }
                    if status.reached(target) {
                        return WaitResult::Reached;
                    }
                }
                Ok(None) => {}
                Err(e) if acknowledged && e.is_soft_after_submit() => {
                    return WaitResult::Soft(e.to_string())
                }
                Err(e) => log_poll_error(signature, &e),
            }
        }
        WaitResult::TimedOut
    }

    /// Finality is logged only; a confirmed transaction is already a success
    async fn await_finality(&self, signature: &str) {
        if self.settings.finality_poll_attempts == 0 {
            return;
        }
        match self
            .wait_for(
                signature,
                Commitment::Finalized,
                self.settings.finality_poll_attempts,
                true,
            )
            .await
        {
            WaitResult::Reached => {
                logger::debug(LogTag::Wallet, &format!("Transaction finalized: {}", signature));
            }
            _ => {
                logger::warning(
                    LogTag::Wallet,
                    &format!("Finality not observed for {}, keeping confirmed result", signature),
                );
            }
        }
    }
}

fn log_poll_error(signature: &str, err: &RpcError) {
    logger::debug(
        LogTag::Rpc,
        &format!("Status poll for {} failed: {}", signature, err),
    );
}

#[cfg(test)]
pub(crate) mod test_support {
    use solana_sdk::hash::Hash;
    use solana_sdk::instruction::{AccountMeta, Instruction};
    use solana_sdk::message::{v0, Message, VersionedMessage};
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::Signature;
    use solana_sdk::transaction::VersionedTransaction;

    /// Unsigned transaction bytes as an aggregator would return them
    pub fn unsigned_swap_bytes(payer: &Pubkey, v0_message: bool) -> Vec<u8> {
        let program = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            program,
            &[7, 1, 2],
            vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(Pubkey::new_unique(), false),
            ],
        );

        let message = if v0_message {
            VersionedMessage::V0(v0::Message::try_compile(payer, &[ix], &[], Hash::default()).unwrap())
        } else {
            VersionedMessage::Legacy(Message::new(&[ix], Some(payer)))
        };

        let tx = VersionedTransaction {
            signatures: vec![Signature::default(); 1],
            message,
        };
        bincode::serialize(&tx).unwrap()
    }
}
