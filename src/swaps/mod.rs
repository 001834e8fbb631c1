/// Swap aggregator access
///
/// - `types`: quote request and quote
/// - `jupiter`: HTTP client for the Jupiter-style aggregator
/// - `validation`: pre-trade checks returning an approved quote
pub mod jupiter;
pub mod types;
pub mod validation;

pub use jupiter::JupiterClient;
pub use types::{Quote, QuoteRequest};
pub use validation::{validate_trade, ValidationLimits};

use async_trait::async_trait;

/// Quote source and swap transaction builder
///
/// Both calls fail closed: any malformed or failed response is None.
#[async_trait]
pub trait SwapRouter: Send + Sync {
    async fn get_quote(&self, request: &QuoteRequest) -> Option<Quote>;

    /// Unsigned swap transaction bytes for `quote`, paid by `wallet`
    async fn get_signable_transaction(&self, quote: &Quote, wallet: &str) -> Option<Vec<u8>>;
}
