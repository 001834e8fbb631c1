pub mod apis;
pub mod arguments;
pub mod config;
pub mod errors;
pub mod logger;
pub mod market_data;
pub mod notifications;
pub mod rpc;
pub mod store;
pub mod swaps;
pub mod trader;
pub mod transactions;
