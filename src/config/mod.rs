/// Configuration system
///
/// - `macros`: the `config_struct!` macro
/// - `schemas`: every config section with defaults
/// - `utils`: loading from TOML and wallet key parsing
#[macro_use]
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::{load_config_from_path, load_wallet_keypair, CONFIG_FILE_PATH, WALLET_KEY_ENV};
