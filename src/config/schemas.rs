/// Configuration schemas - every section defined once with its defaults
///
/// Each struct is declared with `config_struct!`, so a partial TOML file only
/// needs the keys it wants to override.
use crate::config_struct;

// ============================================================================
// WALLET
// ============================================================================

config_struct! {
    /// Signing wallet
    pub struct WalletConfig {
        /// Base58 secret key or "[1,2,...]" byte array. Overridden by
        /// SIGNALBOT_WALLET_PRIVATE_KEY when that variable is set.
        private_key: String = String::new(),
    }
}

// ============================================================================
// LEDGER RPC
// ============================================================================

config_struct! {
    pub struct RpcConfig {
        url: String = "https://api.mainnet-beta.solana.com".to_string(),
        timeout_secs: u64 = 20,
        /// Polls of getSignatureStatuses while waiting for "confirmed"
        confirm_poll_attempts: u32 = 30,
        /// Polls while waiting for "finalized" after confirmation
        finality_poll_attempts: u32 = 20,
        poll_interval_ms: u64 = 1000,
    }
}

// ============================================================================
// MARKET DATA
// ============================================================================

config_struct! {
    /// Price oracle endpoints
    pub struct MarketDataConfig {
        /// Primary oracle, called as GET {primary_price_url}?address={token}
        primary_price_url: String = "https://public-api.birdeye.so/defi/token_overview".to_string(),
        /// Sent as X-API-KEY when non-empty
        primary_api_key: String = String::new(),
        /// DEX pair aggregator base URL
        fallback_base_url: String = "https://api.dexscreener.com".to_string(),
        timeout_secs: u64 = 10,
    }
}

// ============================================================================
// SWAPS
// ============================================================================

config_struct! {
    /// Swap aggregator configuration
    pub struct SwapsConfig {
        quote_url: String = "https://quote-api.jup.ag/v6/quote".to_string(),
        swap_url: String = "https://quote-api.jup.ag/v6/swap".to_string(),
        /// Quote asset mint (USDC)
        quote_mint: String = "EPjFWJd5AufqSSqeM2qUD1NWEKsJ3ZrLPwg5TQ2yEt1v".to_string(),
        quote_decimals: u8 = 6,
        slippage_bps: u16 = 100,
        /// Maximum accepted price impact, in percent
        max_slippage_pct: f64 = 1.0,
        quote_max_age_secs: u64 = 30,
        max_priority_fee_lamports: u64 = 1_000_000,
        timeout_secs: u64 = 15,
    }
}

// ============================================================================
// TRADER
// ============================================================================

config_struct! {
    /// Lifecycle controller configuration
    pub struct TraderConfig {
        /// Trade size in quote-asset units
        trade_size: f64 = 25.0,
        min_trade_value: f64 = 1.0,
        /// Max distance of the live price from the signal entry, in percent
        entry_tolerance_pct: f64 = 2.0,
        /// Signals below this confidence (0-100) are ignored
        min_confidence: f64 = 60.0,
        scalp_min_profit_pct: f64 = 12.0,
        max_hold_days: i64 = 45,

        // Pacing and execution bounds
        item_interval_ms: u64 = 2000,
        execution_timeout_secs: u64 = 30,
        max_execution_attempts: u32 = 3,
        submit_max_retries: u32 = 3,
        submit_backoff_ms: u64 = 1000,
    }
}

// ============================================================================
// SAFETY
// ============================================================================

config_struct! {
    /// Hard bounds applied when closing trades
    pub struct SafetyConfig {
        /// Trades worth more than this are never swapped automatically
        max_trade_value: f64 = 10_000.0,
        /// Exit value is capped at this multiple of the entry value
        max_exit_multiple: f64 = 5.0,
        roi_min_pct: f64 = -100.0,
        roi_max_pct: f64 = 1000.0,
    }
}

// ============================================================================
// RATE LIMITS
// ============================================================================

config_struct! {
    /// Requests per minute per external dependency, plus HTTP retry policy
    pub struct RateLimitsConfig {
        price_oracle_per_minute: u32 = 120,
        dex_aggregator_per_minute: u32 = 300,
        swap_api_per_minute: u32 = 60,
        rpc_per_minute: u32 = 600,
        http_retry_attempts: u32 = 3,
        http_retry_backoff_ms: u64 = 1000,
    }
}

// ============================================================================
// STORE
// ============================================================================

config_struct! {
    pub struct StoreConfig {
        path: String = "data/trades.db".to_string(),
        /// How many eligible signals / open trades a sweep loads at most
        batch_size: usize = 50,
    }
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

config_struct! {
    /// Trade event notifications
    pub struct NotificationsConfig {
        enabled: bool = true,
        telegram_enabled: bool = false,
        telegram_bot_token: String = String::new(),
        telegram_chat_id: i64 = 0,
    }
}

// ============================================================================
// MAIN CONFIGURATION
// ============================================================================

config_struct! {
    /// Complete signalbot configuration
    pub struct Config {
        wallet: WalletConfig = WalletConfig::default(),
        rpc: RpcConfig = RpcConfig::default(),
        market_data: MarketDataConfig = MarketDataConfig::default(),
        swaps: SwapsConfig = SwapsConfig::default(),
        trader: TraderConfig = TraderConfig::default(),
        safety: SafetyConfig = SafetyConfig::default(),
        rate_limits: RateLimitsConfig = RateLimitsConfig::default(),
        store: StoreConfig = StoreConfig::default(),
        notifications: NotificationsConfig = NotificationsConfig::default(),
    }
}

// ============================================================================
// IMPLEMENTATIONS
// ============================================================================

impl Config {
    /// Reject values that would make the controller misbehave
    pub fn validate(&self) -> Result<(), String> {
        if self.trader.trade_size <= 0.0 {
            return Err("trader.trade_size must be > 0".to_string());
        }
        if self.trader.entry_tolerance_pct < 0.0 {
            return Err("trader.entry_tolerance_pct cannot be negative".to_string());
        }
        if !(0.0..=100.0).contains(&self.trader.min_confidence) {
            return Err("trader.min_confidence must be within 0..=100".to_string());
        }
        if self.trader.max_execution_attempts == 0 {
            return Err("trader.max_execution_attempts must be > 0".to_string());
        }
        if self.safety.max_exit_multiple <= 0.0 {
            return Err("safety.max_exit_multiple must be > 0".to_string());
        }
        if self.safety.roi_min_pct >= self.safety.roi_max_pct {
            return Err("safety.roi_min_pct must be below safety.roi_max_pct".to_string());
        }
        if self.swaps.slippage_bps > 10_000 {
            return Err("swaps.slippage_bps cannot exceed 10000".to_string());
        }
        Ok(())
    }
}
