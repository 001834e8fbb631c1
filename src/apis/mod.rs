/// External HTTP APIs
///
/// - `client`: shared HTTP client, token-bucket limiter and retry policy
/// - `price_oracle`: primary price source
/// - `dexscreener`: fallback price source (DEX pair aggregator)
pub mod client;
pub mod dexscreener;
pub mod price_oracle;

pub use client::{HttpClient, RateLimiter, RetryPolicy};
pub use dexscreener::DexScreenerClient;
pub use price_oracle::PriceOracleClient;
