/// Configuration loading and wallet key parsing
///
/// Unlike a global config cell, the loaded `Config` is handed to the
/// components that need it at startup.
use super::schemas::Config;
use crate::errors::ConfigError;
use crate::logger::{self, LogTag};
use solana_sdk::signature::Keypair;
use std::path::Path;

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Environment variable that overrides `wallet.private_key`
pub const WALLET_KEY_ENV: &str = "SIGNALBOT_WALLET_PRIVATE_KEY";

/// Load configuration from a TOML file
///
/// A missing file yields the defaults. A present but unreadable or invalid
/// file is an error.
pub fn load_config_from_path(path: &str) -> Result<Config, ConfigError> {
    let mut config = if Path::new(path).exists() {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;

        toml::from_str::<Config>(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?
    } else {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        Config::default()
    };

    if let Ok(key) = std::env::var(WALLET_KEY_ENV) {
        if !key.trim().is_empty() {
            config.wallet.private_key = key.trim().to_string();
        }
    }

    config.validate().map_err(ConfigError::Invalid)?;

    logger::debug(
        LogTag::Config,
        &format!(
            "Loaded config: rpc={} trade_size={} max_trade_value={}",
            config.rpc.url, config.trader.trade_size, config.safety.max_trade_value
        ),
    );

    Ok(config)
}

/// Build the wallet keypair from the configured secret
///
/// Accepts base58 (the usual wallet export) or a JSON-style byte array.
pub fn load_wallet_keypair(config: &Config) -> Result<Keypair, ConfigError> {
    let private_key = config.wallet.private_key.trim();
    if private_key.is_empty() {
        return Err(ConfigError::MissingWalletKey);
    }

    let bytes = if private_key.starts_with('[') && private_key.ends_with(']') {
        parse_byte_array(private_key)?
    } else {
        bs58::decode(private_key)
            .into_vec()
            .map_err(|e| ConfigError::InvalidWalletKey(format!("base58 decode failed: {}", e)))?
    };

    if bytes.len() != 64 {
        return Err(ConfigError::InvalidWalletKey(format!(
            "expected 64 bytes, got {}",
            bytes.len()
        )));
    }

    Keypair::try_from(&bytes[..]).map_err(|e| ConfigError::InvalidWalletKey(e.to_string()))
}

fn parse_byte_array(raw: &str) -> Result<Vec<u8>, ConfigError> {
    raw.trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| ConfigError::InvalidWalletKey(format!("byte array parse failed: {}", e)))
}
