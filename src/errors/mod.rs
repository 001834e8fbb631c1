/// Error types for signalbot
///
/// One enum per layer. `TradeError` is what the lifecycle controller sees;
/// lower layers convert into it with `?`.
use thiserror::Error;

// =============================================================================
// TRADE ERRORS (controller boundary)
// =============================================================================

#[derive(Error, Debug)]
pub enum TradeError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Quote rejected: {0}")]
    QuoteRejected(String),

    #[error("Slippage too high: {actual:.4}% > {max:.4}%")]
    SlippageTooHigh { actual: f64, max: f64 },

    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Timeout error: operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Safety limit exceeded: {0}")]
    SafetyViolation(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
}

impl TradeError {
    /// Transient failures keep the trade in its current state for another attempt
    pub fn is_recoverable(&self) -> bool {
        match self {
            TradeError::TransientNetwork(_) => true,
            TradeError::Timeout { .. } => true,
            TradeError::Rpc(e) => e.is_recoverable(),
            _ => false,
        }
    }

    pub fn is_safety_violation(&self) -> bool {
        matches!(self, TradeError::SafetyViolation(_))
    }
}

pub type TradeResult<T> = Result<T, TradeError>;

// =============================================================================
// HTTP API ERRORS (price oracles, swap aggregator)
// =============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("HTTP {status} from {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to parse response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },
}

impl ApiError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            ApiError::Request { .. } => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::Parse { .. } => false,
        }
    }
}

impl From<ApiError> for TradeError {
    fn from(err: ApiError) -> Self {
        if err.is_recoverable() {
            TradeError::TransientNetwork(err.to_string())
        } else {
            TradeError::Validation(err.to_string())
        }
    }
}

// =============================================================================
// LEDGER RPC ERRORS
// =============================================================================

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("RPC error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("Malformed RPC response: {0}")]
    Malformed(String),

    #[error("Transaction {signature} failed on chain: {reason}")]
    TransactionFailed { signature: String, reason: String },
}

impl RpcError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            RpcError::Transport(_) => true,
            RpcError::Status { status, .. } => *status == 429 || *status >= 500,
            // Node-side blockhash / rate problems clear up on retry
            RpcError::Node { code, .. } => *code == -32002 || *code == -32005 || *code == 429,
            RpcError::Malformed(_) => false,
            RpcError::TransactionFailed { .. } => false,
        }
    }

    /// Errors a node reports after it already accepted a transaction
    pub fn is_soft_after_submit(&self) -> bool {
        let text = self.to_string().to_lowercase();
        text.contains("transaction version") && text.contains("not supported")
    }
}

impl From<ApiError> for RpcError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Request { message, .. } => RpcError::Transport(message),
            ApiError::Status { status, body, .. } => RpcError::Status { status, body },
            ApiError::Parse { message, .. } => RpcError::Malformed(message),
        }
    }
}

// =============================================================================
// STORE ERRORS
// =============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Trade {0} not found")]
    TradeNotFound(i64),

    #[error("Trade {id} is no longer {expected}")]
    StaleStatus { id: i64, expected: String },

    #[error("Illegal status transition for trade {id}: {from} -> {to}")]
    IllegalTransition { id: i64, from: String, to: String },

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// CONFIGURATION ERRORS
// =============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Wallet private key is not configured (set wallet.private_key or SIGNALBOT_WALLET_PRIVATE_KEY)")]
    MissingWalletKey,

    #[error("Invalid wallet private key: {0}")]
    InvalidWalletKey(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
