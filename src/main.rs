use anyhow::{Context, Result};
use signalbot::{
    apis::{client::RetryPolicy, dexscreener::DexScreenerClient, price_oracle::PriceOracleClient},
    arguments::Arguments,
    config::{self, Config},
    logger::{self, LogTag, LoggerConfig},
    market_data::MarketDataClient,
    notifications,
    rpc::RpcClient,
    store::TradeStore,
    swaps::JupiterClient,
    trader::{RunMode, TradeController},
    transactions::{SigningContext, SubmitSettings},
};
use solana_sdk::signature::Keypair;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const LOGS_DIR: &str = "logs";

/// Main entry point for signalbot
///
/// Exit code 0 when the selected sweep (or repeat loop) completes, 1 on
/// missing configuration, a missing wallet key or any unhandled error.
#[tokio::main]
async fn main() {
    let args = Arguments::from_env();

    logger::init(
        LoggerConfig::from_flags(&args.debug_tags, args.cli.verbose),
        Some(Path::new(LOGS_DIR)),
    );
    logger::info(
        LogTag::System,
        &format!(
            "signalbot {} starting in '{}' mode",
            env!("CARGO_PKG_VERSION"),
            RunMode::from(args.cli.mode).as_str()
        ),
    );

    let code = match run(args).await {
        Ok(()) => {
            logger::info(LogTag::System, "signalbot finished");
            0
        }
        Err(e) => {
            logger::error(LogTag::System, &format!("signalbot failed: {:#}", e));
            1
        }
    };

    logger::flush();
    std::process::exit(code);
}

async fn run(args: Arguments) -> Result<()> {
    let config = config::load_config_from_path(&args.cli.config)
        .with_context(|| format!("loading configuration from {}", args.cli.config))?;
    let keypair = config::load_wallet_keypair(&config).context("loading wallet key")?;
    let controller = build_controller(config, keypair)?;

    if let Some((trade_id, reason)) = args.close_request() {
        let summary = controller
            .close_trade(trade_id, reason)
            .await
            .with_context(|| format!("closing trade {}", trade_id))?;
        logger::info(
            LogTag::Trader,
            &format!("Manual close of trade {} done: {}", trade_id, summary),
        );
        return Ok(());
    }

    let mode = RunMode::from(args.cli.mode);
    let Some(interval_secs) = args.cli.interval else {
        controller.run(mode).await;
        return Ok(());
    };

    let interval = Duration::from_secs(interval_secs.max(1));
    logger::info(
        LogTag::System,
        &format!("Repeating every {}s, press Ctrl-C to stop", interval.as_secs()),
    );
    loop {
        controller.run(mode).await;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    logger::warning(LogTag::System, &format!("Ctrl-C handler failed: {}", e));
                }
                logger::info(LogTag::System, "Shutdown requested, stopping after the last sweep");
                break;
            }
        }
    }
    Ok(())
}

/// Wire the HTTP clients, ledger RPC, wallet and store into a controller
fn build_controller(config: Config, keypair: Keypair) -> Result<TradeController> {
    let limits = config.rate_limits.clone();
    let retry = RetryPolicy::new(limits.http_retry_attempts, limits.http_retry_backoff_ms);

    let oracle = PriceOracleClient::new(&config.market_data, limits.price_oracle_per_minute, retry)
        .context("creating price oracle client")?;
    let dex = DexScreenerClient::new(&config.market_data, limits.dex_aggregator_per_minute, retry)
        .context("creating DEX aggregator client")?;
    let router = JupiterClient::new(&config.swaps, limits.swap_api_per_minute, retry)
        .context("creating swap client")?;
    let rpc = RpcClient::new(&config.rpc, limits.rpc_per_minute, retry)
        .context("creating RPC client")?;

    let signer = SigningContext::new(
        keypair,
        Arc::new(rpc),
        SubmitSettings::from_config(&config.rpc, &config.trader),
    );
    logger::info(
        LogTag::Wallet,
        &format!("Wallet loaded: {}", signer.wallet_address()),
    );

    let store = TradeStore::open(&config.store.path)
        .with_context(|| format!("opening trade store {}", config.store.path))?;
    let notifier = notifications::build_sink(&config.notifications);
    let market = MarketDataClient::new(Arc::new(oracle), Arc::new(dex));

    Ok(TradeController::new(
        config,
        store,
        market,
        Arc::new(router),
        signer,
        notifier,
    ))
}
