//! Trade lifecycle controller
//!
//! Drives signals and trades through PENDING → EXECUTED → CLOSED with the
//! FAILED/ERROR side exits. Items are processed one at a time, paced by a
//! token bucket. The store is re-read on every sweep; nothing about a trade is
//! kept in memory between sweeps except a validated quote waiting for reuse.

use super::evaluator::{self, SignalVerdict};
use super::safety;
use super::types::{
    CloseRecord, Direction, ExecutionRecord, ExitReason, NewTrade, Signal, Trade, TradeStatus,
};
use crate::apis::client::RateLimiter;
use crate::config::Config;
use crate::errors::{StoreError, StoreResult, TradeError, TradeResult};
use crate::logger::{self, LogTag};
use crate::market_data::MarketDataClient;
use crate::notifications::{send_best_effort, Notification, NotificationSink};
use crate::store::TradeStore;
use crate::swaps::{validate_trade, Quote, QuoteRequest, SwapRouter, ValidationLimits};
use crate::transactions::{SignedTransaction, SigningContext, SubmitOutcome};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Writes of a confirmed swap's outcome before falling back to the signature alone
const SETTLEMENT_WRITE_ATTEMPTS: u32 = 3;
const SETTLEMENT_WRITE_BACKOFF: Duration = Duration::from_millis(200);

/// Which sweeps a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Exit-condition sweep
    Monitor,
    /// Signal intake and entry sweep
    Open,
    /// Exit sweep (single trades go through `close_trade`)
    Close,
    /// Entry then exit
    All,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Monitor => "monitor",
            RunMode::Open => "open",
            RunMode::Close => "close",
            RunMode::All => "all",
        }
    }

    fn opens(&self) -> bool {
        matches!(self, RunMode::Open | RunMode::All)
    }

    fn closes(&self) -> bool {
        matches!(self, RunMode::Monitor | RunMode::Close | RunMode::All)
    }
}

/// Counters for one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub signals_seen: u32,
    pub trades_created: u32,
    pub signals_rejected: u32,
    pub signals_skipped: u32,
    pub executed: u32,
    pub closed: u32,
    pub held: u32,
    pub waiting: u32,
    pub retrying: u32,
    pub failed: u32,
    pub errored: u32,
    pub item_errors: u32,
}

impl SweepSummary {
    pub fn has_activity(&self) -> bool {
        self.trades_created + self.executed + self.closed + self.failed + self.errored > 0
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signals={} created={} rejected={} skipped={} executed={} closed={} held={} waiting={} retrying={} failed={} errors={} item_errors={}",
            self.signals_seen,
            self.trades_created,
            self.signals_rejected,
            self.signals_skipped,
            self.executed,
            self.closed,
            self.held,
            self.waiting,
            self.retrying,
            self.failed,
            self.errored,
            self.item_errors
        )
    }
}

/// A swap ready to send
struct PreparedSwap {
    quote: Quote,
    raw: Vec<u8>,
    signed: SignedTransaction,
}

pub struct TradeController {
    config: Config,
    store: TradeStore,
    market: MarketDataClient,
    router: Arc<dyn SwapRouter>,
    signer: SigningContext,
    notifier: Arc<dyn NotificationSink>,
    pacer: RateLimiter,
    /// Quotes approved at intake, keyed by signal id
    approved_quotes: Mutex<HashMap<String, Quote>>,
}

impl TradeController {
    pub fn new(
        config: Config,
        store: TradeStore,
        market: MarketDataClient,
        router: Arc<dyn SwapRouter>,
        signer: SigningContext,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let pacer = RateLimiter::every(Duration::from_millis(config.trader.item_interval_ms));
        Self {
            config,
            store,
            market,
            router,
            signer,
            notifier,
            pacer,
            approved_quotes: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &TradeStore {
        &self.store
    }

    /// Run the sweeps selected by `mode` once
    pub async fn run(&self, mode: RunMode) -> SweepSummary {
        let started = Instant::now();
        let mut summary = SweepSummary::default();

        if mode.opens() {
            self.intake_sweep(&mut summary).await;
            self.entry_sweep(&mut summary).await;
        }
        if mode.closes() {
            self.exit_sweep(&mut summary).await;
        }

        logger::info(
            LogTag::Trader,
            &format!(
                "Run '{}' finished in {:.1}s: {}",
                mode.as_str(),
                started.elapsed().as_secs_f64(),
                summary
            ),
        );
        if summary.has_activity() {
            self.notify(Notification::run_summary(mode.as_str(), summary.to_string()))
                .await;
        }
        summary
    }

    /// Close one EXECUTED trade on request
    pub async fn close_trade(&self, trade_id: i64, reason: ExitReason) -> TradeResult<SweepSummary> {
        let trade = self
            .store
            .get_trade(trade_id)?
            .ok_or(StoreError::TradeNotFound(trade_id))?;

        if trade.status != TradeStatus::Executed {
            return Err(TradeError::Validation(format!(
                "trade {} is {}, only EXECUTED trades can be closed",
                trade.id, trade.status
            )));
        }
        if let Some(signature) = &trade.unsettled_signature {
            return Err(TradeError::Validation(format!(
                "trade {} has an unrecorded swap {}, reconcile it first",
                trade.id, signature
            )));
        }

        let snapshot = self.market.get_price(&trade.token).await;
        if !snapshot.has_price() {
            return Err(TradeError::TransientNetwork(format!(
                "no live price for {}",
                trade.token
            )));
        }

        logger::info(
            LogTag::Exit,
            &format!(
                "Manual close of trade {} ({}) at {:.8}",
                trade.id, reason, snapshot.price
            ),
        );

        let mut summary = SweepSummary::default();
        self.close_position(&trade, reason, snapshot.price, &mut summary)
            .await?;
        Ok(summary)
    }

    // =========================================================================
    // SWEEPS
    // =========================================================================

    async fn intake_sweep(&self, summary: &mut SweepSummary) {
        let signals = match self
            .store
            .list_eligible_signals(Utc::now(), self.config.store.batch_size)
        {
            Ok(signals) => signals,
            Err(e) => {
                logger::error(LogTag::Store, &format!("Failed to load signals: {}", e));
                summary.item_errors += 1;
                return;
            }
        };

        if !signals.is_empty() {
            logger::info(
                LogTag::Entry,
                &format!("Checking {} eligible signals", signals.len()),
            );
        }

        for signal in signals {
            self.pacer.acquire().await;
            summary.signals_seen += 1;
            if let Err(e) = self.intake_signal(&signal, summary).await {
                logger::error(
                    LogTag::Entry,
                    &format!("Intake of signal {} failed: {}", signal.id, e),
                );
                summary.item_errors += 1;
            }
        }
    }

    async fn entry_sweep(&self, summary: &mut SweepSummary) {
        self.trade_sweep(TradeStatus::Pending, summary).await;
    }

    async fn exit_sweep(&self, summary: &mut SweepSummary) {
        self.trade_sweep(TradeStatus::Executed, summary).await;
    }

    async fn trade_sweep(&self, status: TradeStatus, summary: &mut SweepSummary) {
        let trades = match self
            .store
            .list_trades_by_status(status, self.config.store.batch_size)
        {
            Ok(trades) => trades,
            Err(e) => {
                logger::error(
                    LogTag::Store,
                    &format!("Failed to load {} trades: {}", status, e),
                );
                summary.item_errors += 1;
                return;
            }
        };

        for trade in trades {
            self.pacer.acquire().await;
            let result = match (&trade.unsettled_signature, status) {
                (Some(signature), _) => self.abort_unsettled(&trade, signature, summary).await,
                (None, TradeStatus::Pending) => self.process_pending(&trade, summary).await,
                (None, _) => self.process_executed(&trade, summary).await,
            };
            if let Err(e) = result {
                logger::error(
                    LogTag::Trader,
                    &format!(
                        "Trade {} (signal {}) not processed: {}",
                        trade.id, trade.signal_id, e
                    ),
                );
                summary.item_errors += 1;
            }
        }
    }

    // =========================================================================
    // SIGNAL INTAKE
    // =========================================================================

    async fn intake_signal(&self, signal: &Signal, summary: &mut SweepSummary) -> TradeResult<()> {
        match evaluator::evaluate_signal(signal, Utc::now(), &self.config.trader) {
            SignalVerdict::Eligible => {}
            SignalVerdict::Expired => {
                logger::debug(LogTag::Entry, &format!("Signal {} expired", signal.id));
                summary.signals_skipped += 1;
                return Ok(());
            }
            SignalVerdict::Rejected(reason) => {
                logger::info(
                    LogTag::Entry,
                    &format!("Signal {} skipped: {}", signal.id, reason),
                );
                summary.signals_skipped += 1;
                return Ok(());
            }
        }

        let trade_size = self.config.trader.trade_size;
        let validation = self.bounded(async {
            let request = self
                .entry_request(&signal.token, signal.direction, signal.entry_price)
                .await?;
            validate_trade(self.router.as_ref(), &request, trade_size, self.limits()).await
        });
        let quote = match validation.await {
            Ok(quote) => quote,
            Err(e) => {
                logger::info(
                    LogTag::Entry,
                    &format!("Signal {} not opened: {}", signal.id, e),
                );
                summary.signals_rejected += 1;
                return Ok(());
            }
        };

        let new_trade = NewTrade::from_signal(signal, trade_size);
        let Some(trade_id) = self.store.create_pending_trade(&new_trade)? else {
            logger::debug(
                LogTag::Entry,
                &format!("Signal {} already has an open trade", signal.id),
            );
            summary.signals_skipped += 1;
            return Ok(());
        };

        self.approved_quotes.lock().insert(signal.id.clone(), quote);
        summary.trades_created += 1;
        logger::info(
            LogTag::Entry,
            &format!(
                "Trade {} created for signal {}: {} {} entry {} target {} stop {}",
                trade_id,
                signal.id,
                signal.direction,
                signal.token,
                signal.entry_price,
                signal.target_price,
                signal.stop_loss
            ),
        );
        self.notify(Notification::trade_created(
            trade_id,
            &signal.id,
            &signal.token,
            signal.direction,
            trade_size,
        ))
        .await;
        Ok(())
    }

    // =========================================================================
    // PENDING → EXECUTED
    // =========================================================================

    async fn process_pending(&self, trade: &Trade, summary: &mut SweepSummary) -> TradeResult<()> {
        let Some(signal) = self.store.get_signal(&trade.signal_id)? else {
            return self
                .abort(trade, TradeStatus::Failed, "signal not found", None, summary)
                .await;
        };
        if signal.is_expired(Utc::now()) {
            self.approved_quotes.lock().remove(&trade.signal_id);
            return self
                .abort(
                    trade,
                    TradeStatus::Failed,
                    "signal expired before entry",
                    None,
                    summary,
                )
                .await;
        }

        let snapshot = self.market.get_price(&trade.token).await;
        if !snapshot.has_price() {
            logger::debug(
                LogTag::Entry,
                &format!("Trade {}: no price for {}, waiting", trade.id, trade.token),
            );
            summary.waiting += 1;
            return Ok(());
        }

        if !evaluator::entry_condition_met(
            trade.entry_price,
            snapshot.price,
            self.config.trader.entry_tolerance_pct,
        ) {
            logger::debug(
                LogTag::Entry,
                &format!(
                    "Trade {}: price {:.8} outside {:.1}% of entry {:.8}",
                    trade.id, snapshot.price, self.config.trader.entry_tolerance_pct, trade.entry_price
                ),
            );
            summary.waiting += 1;
            return Ok(());
        }

        match self.execute_entry(trade).await {
            Ok(record) => {
                self.persist_settlement(trade, &record.settlement_signature, || {
                    self.store.mark_executed(trade.id, &record)
                })
                .await?;
                summary.executed += 1;
                logger::info(
                    LogTag::Entry,
                    &format!(
                        "Trade {} executed: {} {} amount {} value {:.4} ({})",
                        trade.id,
                        trade.direction,
                        trade.token,
                        record.amount,
                        record.entry_value,
                        record.settlement_signature
                    ),
                );
                self.notify(Notification::trade_executed(
                    trade,
                    record.entry_value,
                    &record.settlement_signature,
                ))
                .await;
                Ok(())
            }
            Err(e) => self.handle_failure(trade, e, summary).await,
        }
    }

    async fn execute_entry(&self, trade: &Trade) -> TradeResult<ExecutionRecord> {
        let prepared = self.bounded(self.prepare_entry(trade)).await?;
        let signature = self.submit(&prepared).await?;

        let quote_decimals = self.config.swaps.quote_decimals;
        let (amount, entry_value) = match trade.direction {
            Direction::Buy => (
                prepared.quote.out_amount,
                to_ui(prepared.quote.in_amount, quote_decimals),
            ),
            Direction::Sell => (
                prepared.quote.in_amount,
                to_ui(prepared.quote.out_amount, quote_decimals),
            ),
        };

        Ok(ExecutionRecord {
            amount,
            entry_value,
            settlement_signature: signature,
            executed_at: Utc::now(),
        })
    }

    async fn prepare_entry(&self, trade: &Trade) -> TradeResult<PreparedSwap> {
        let request = self
            .entry_request(&trade.token, trade.direction, trade.entry_price)
            .await?;

        let quote = match self.take_fresh_quote(&trade.signal_id, &request) {
            Some(quote) => {
                logger::debug(
                    LogTag::Swap,
                    &format!(
                        "Trade {}: reusing quote from {:.1}s ago",
                        trade.id,
                        quote.age().as_secs_f64()
                    ),
                );
                quote
            }
            None => {
                validate_trade(
                    self.router.as_ref(),
                    &request,
                    self.config.trader.trade_size,
                    self.limits(),
                )
                .await?
            }
        };

        let received = match trade.direction {
            Direction::Buy => quote.out_amount,
            Direction::Sell => quote.in_amount,
        };
        if received == 0 {
            return Err(TradeError::QuoteRejected(format!(
                "quote for trade {} yields zero tokens",
                trade.id
            )));
        }

        self.build_swap(quote).await
    }

    /// Quote request for opening a position worth `trade_size`
    ///
    /// BUY spends the quote asset; SELL sells `trade_size / entry_price` tokens.
    async fn entry_request(
        &self,
        token: &str,
        direction: Direction,
        entry_price: f64,
    ) -> TradeResult<QuoteRequest> {
        let swaps = &self.config.swaps;
        let trade_size = self.config.trader.trade_size;

        let (input_mint, output_mint, amount) = match direction {
            Direction::Buy => (
                swaps.quote_mint.clone(),
                token.to_string(),
                to_raw(trade_size, swaps.quote_decimals),
            ),
            Direction::Sell => {
                let decimals = self.signer.rpc().token_decimals(token).await?;
                (
                    token.to_string(),
                    swaps.quote_mint.clone(),
                    to_raw(trade_size / entry_price, decimals),
                )
            }
        };

        let amount = amount.ok_or_else(|| {
            TradeError::Validation(format!(
                "trade size {} at price {} is not a valid swap amount",
                trade_size, entry_price
            ))
        })?;

        Ok(QuoteRequest {
            input_mint,
            output_mint,
            amount,
            slippage_bps: swaps.slippage_bps,
        })
    }

    fn take_fresh_quote(&self, signal_id: &str, request: &QuoteRequest) -> Option<Quote> {
        let quote = self.approved_quotes.lock().remove(signal_id)?;
        let max_age = Duration::from_secs(self.config.swaps.quote_max_age_secs);
        if quote.is_stale(max_age) || !quote.matches(request) {
            return None;
        }
        Some(quote)
    }

    // =========================================================================
    // EXECUTED → CLOSED
    // =========================================================================

    async fn process_executed(&self, trade: &Trade, summary: &mut SweepSummary) -> TradeResult<()> {
        let snapshot = self.market.get_price(&trade.token).await;
        if !snapshot.has_price() {
            logger::warning(
                LogTag::Exit,
                &format!("Trade {}: no price for {}, cannot evaluate exit", trade.id, trade.token),
            );
            summary.waiting += 1;
            return Ok(());
        }

        match evaluator::evaluate_exit(trade, snapshot.price, Utc::now(), &self.config.trader) {
            Some(reason) => {
                logger::info(
                    LogTag::Exit,
                    &format!(
                        "Trade {} exit signal {} at {:.8} (entry {:.8})",
                        trade.id, reason, snapshot.price, trade.entry_price
                    ),
                );
                self.close_position(trade, reason, snapshot.price, summary)
                    .await
            }
            None => {
                logger::debug(
                    LogTag::Exit,
                    &format!(
                        "Trade {} holding at {:.8} ({:+.2}%)",
                        trade.id,
                        snapshot.price,
                        evaluator::gain_pct(trade.direction, trade.entry_price, snapshot.price)
                    ),
                );
                summary.held += 1;
                Ok(())
            }
        }
    }

    async fn close_position(
        &self,
        trade: &Trade,
        reason: ExitReason,
        price: f64,
        summary: &mut SweepSummary,
    ) -> TradeResult<()> {
        let value = match self.position_value(trade, price).await {
            Ok(value) => value,
            Err(e) => return self.handle_failure(trade, e, summary).await,
        };
        if let Err(e) = safety::check_value_ceiling(value, &self.config.safety) {
            return self.handle_failure(trade, e, summary).await;
        }

        match self.execute_exit(trade, price).await {
            Ok((signature, raw_exit_value)) => {
                let settlement = safety::settle(
                    trade.direction,
                    trade.entry_value,
                    raw_exit_value,
                    &self.config.safety,
                );
                if settlement.exit_value != raw_exit_value {
                    logger::warning(
                        LogTag::Exit,
                        &format!(
                            "Trade {}: exit value {:.4} clamped to {:.4}",
                            trade.id, raw_exit_value, settlement.exit_value
                        ),
                    );
                }

                let record = CloseRecord {
                    exit_price: price,
                    exit_value: settlement.exit_value,
                    realized_pnl: settlement.realized_pnl,
                    roi: settlement.roi,
                    exit_reason: reason,
                    settlement_signature: signature,
                    closed_at: Utc::now(),
                };
                self.persist_settlement(trade, &record.settlement_signature, || {
                    self.store.mark_closed(trade.id, &record)
                })
                .await?;
                summary.closed += 1;
                logger::info(
                    LogTag::Exit,
                    &format!(
                        "Trade {} closed ({}): exit value {:.4}, PnL {:+.4} ({:+.2}%)",
                        trade.id, reason, record.exit_value, record.realized_pnl, record.roi
                    ),
                );
                self.notify(Notification::trade_closed(
                    trade,
                    reason,
                    record.exit_value,
                    record.realized_pnl,
                    record.roi,
                    &record.settlement_signature,
                ))
                .await;
                Ok(())
            }
            Err(e) => self.handle_failure(trade, e, summary).await,
        }
    }

    /// Current quote-asset value of the position
    async fn position_value(&self, trade: &Trade, price: f64) -> TradeResult<f64> {
        let decimals = self.signer.rpc().token_decimals(&trade.token).await?;
        Ok(to_ui(trade.amount, decimals) * price)
    }

    /// Returns the settlement signature and the raw exit value in quote units
    async fn execute_exit(&self, trade: &Trade, price: f64) -> TradeResult<(String, f64)> {
        let prepared = self.bounded(self.prepare_exit(trade, price)).await?;
        let signature = self.submit(&prepared).await?;

        let quote_decimals = self.config.swaps.quote_decimals;
        let exit_value = match trade.direction {
            Direction::Buy => to_ui(prepared.quote.out_amount, quote_decimals),
            Direction::Sell => to_ui(prepared.quote.in_amount, quote_decimals),
        };
        Ok((signature, exit_value))
    }

    /// BUY sells `min(balance, amount)` tokens; SELL buys them back with at
    /// most the quote balance.
    async fn prepare_exit(&self, trade: &Trade, price: f64) -> TradeResult<PreparedSwap> {
        let rpc = self.signer.rpc();
        let wallet = self.signer.wallet_address();
        let swaps = &self.config.swaps;
        let decimals = rpc.token_decimals(&trade.token).await?;

        let (request, value) = match trade.direction {
            Direction::Buy => {
                let balance = rpc.token_balance(&wallet, &trade.token).await?;
                let amount = balance.min(trade.amount);
                if amount == 0 {
                    return Err(TradeError::Validation(format!(
                        "no {} balance left to sell for trade {}",
                        trade.token, trade.id
                    )));
                }
                if amount < trade.amount {
                    logger::warning(
                        LogTag::Exit,
                        &format!(
                            "Trade {}: wallet holds {} of {} tokens, selling what is left",
                            trade.id, amount, trade.amount
                        ),
                    );
                }
                (
                    QuoteRequest {
                        input_mint: trade.token.clone(),
                        output_mint: swaps.quote_mint.clone(),
                        amount,
                        slippage_bps: swaps.slippage_bps,
                    },
                    to_ui(amount, decimals) * price,
                )
            }
            Direction::Sell => {
                let needed = to_ui(trade.amount, decimals) * price;
                let planned = to_raw(needed, swaps.quote_decimals).ok_or_else(|| {
                    TradeError::Validation(format!(
                        "buy-back value {} for trade {} is not a valid swap amount",
                        needed, trade.id
                    ))
                })?;
                let balance = rpc.token_balance(&wallet, &swaps.quote_mint).await?;
                let amount = balance.min(planned);
                if amount == 0 {
                    return Err(TradeError::Validation(format!(
                        "no quote balance to buy back trade {}",
                        trade.id
                    )));
                }
                (
                    QuoteRequest {
                        input_mint: swaps.quote_mint.clone(),
                        output_mint: trade.token.clone(),
                        amount,
                        slippage_bps: swaps.slippage_bps,
                    },
                    to_ui(amount, swaps.quote_decimals),
                )
            }
        };

        let quote = validate_trade(self.router.as_ref(), &request, value, self.limits()).await?;
        self.build_swap(quote).await
    }

    // =========================================================================
    // SHARED STEPS
    // =========================================================================

    async fn build_swap(&self, quote: Quote) -> TradeResult<PreparedSwap> {
        let wallet = self.signer.wallet_address();
        let raw = self
            .router
            .get_signable_transaction(&quote, &wallet)
            .await
            .ok_or_else(|| {
                TradeError::QuoteRejected(format!(
                    "no swap transaction for route {}",
                    quote.route()
                ))
            })?;

        let signed = self
            .signer
            .prepare(&raw)
            .await
            .ok_or_else(|| TradeError::Signing("could not prepare swap transaction".to_string()))?;

        Ok(PreparedSwap { quote, raw, signed })
    }

    /// Submission runs outside the execution timeout so a sent transaction is
    /// always followed to a confirmed or failed outcome.
    async fn submit(&self, prepared: &PreparedSwap) -> TradeResult<String> {
        let outcome = self
            .signer
            .submit(
                &prepared.raw,
                prepared.signed.clone(),
                self.config.trader.submit_max_retries,
            )
            .await;
        match outcome {
            SubmitOutcome::Confirmed { signature } => Ok(signature),
            SubmitOutcome::Failed { reason } => Err(TradeError::Submission(reason)),
        }
    }

    /// Write the outcome of a confirmed swap
    ///
    /// The write is retried a few times. If it keeps failing the signature is
    /// kept on the trade so no later sweep repeats the swap.
    async fn persist_settlement(
        &self,
        trade: &Trade,
        signature: &str,
        write: impl Fn() -> StoreResult<()>,
    ) -> TradeResult<()> {
        let mut attempt = 1;
        let error = loop {
            match write() {
                Ok(()) => return Ok(()),
                Err(e) if attempt < SETTLEMENT_WRITE_ATTEMPTS => {
                    logger::warning(
                        LogTag::Store,
                        &format!(
                            "Trade {}: recording swap {} failed (attempt {}/{}): {}",
                            trade.id, signature, attempt, SETTLEMENT_WRITE_ATTEMPTS, e
                        ),
                    );
                    attempt += 1;
                    tokio::time::sleep(SETTLEMENT_WRITE_BACKOFF).await;
                }
                Err(e) => break e,
            }
        };

        logger::error(
            LogTag::Store,
            &format!(
                "Trade {} (signal {}): swap {} confirmed but not recorded: {}",
                trade.id, trade.signal_id, signature, error
            ),
        );
        if let Err(e) = self
            .store
            .record_unsettled_signature(trade.id, trade.status, signature)
        {
            logger::error(
                LogTag::Store,
                &format!(
                    "Trade {} (signal {}): could not keep signature {}: {}",
                    trade.id, trade.signal_id, signature, e
                ),
            );
        }
        Err(error.into())
    }

    async fn bounded<T>(&self, future: impl Future<Output = TradeResult<T>>) -> TradeResult<T> {
        let seconds = self.config.trader.execution_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(seconds), future).await {
            Ok(result) => result,
            Err(_) => Err(TradeError::Timeout { seconds }),
        }
    }

    fn limits(&self) -> ValidationLimits {
        ValidationLimits {
            min_trade_value: self.config.trader.min_trade_value,
            max_slippage_pct: self.config.swaps.max_slippage_pct,
        }
    }

    // =========================================================================
    // FAILURES
    // =========================================================================

    /// Record a failed step
    ///
    /// Transient errors, and any error on an open position, count an attempt
    /// and keep the trade in place until the attempts run out. Safety
    /// violations and other entry errors end the trade at once.
    async fn handle_failure(
        &self,
        trade: &Trade,
        error: TradeError,
        summary: &mut SweepSummary,
    ) -> TradeResult<()> {
        let message = error.to_string();

        if error.is_safety_violation() {
            return self
                .abort(
                    trade,
                    TradeStatus::Error,
                    &message,
                    Some(ExitReason::SafetyLimit),
                    summary,
                )
                .await;
        }

        // An EXECUTED trade holds tokens, keep checking it
        if error.is_recoverable() || trade.status == TradeStatus::Executed {
            let attempts = self.store.record_attempt(trade.id, trade.status, &message)?;
            let max_attempts = self.config.trader.max_execution_attempts;
            if attempts < max_attempts {
                logger::warning(
                    LogTag::Trader,
                    &format!(
                        "Trade {} (signal {}) attempt {}/{} failed, will retry: {}",
                        trade.id, trade.signal_id, attempts, max_attempts, message
                    ),
                );
                summary.retrying += 1;
                return Ok(());
            }
            let message = format!("{} (gave up after {} attempts)", message, attempts);
            return self
                .abort(trade, TradeStatus::Error, &message, None, summary)
                .await;
        }

        self.abort(trade, TradeStatus::Error, &message, None, summary)
            .await
    }

    async fn abort_unsettled(
        &self,
        trade: &Trade,
        signature: &str,
        summary: &mut SweepSummary,
    ) -> TradeResult<()> {
        let message = format!(
            "swap {} confirmed but never recorded, reconcile manually",
            signature
        );
        self.abort(trade, TradeStatus::Error, &message, None, summary)
            .await
    }

    async fn abort(
        &self,
        trade: &Trade,
        to: TradeStatus,
        message: &str,
        exit_reason: Option<ExitReason>,
        summary: &mut SweepSummary,
    ) -> TradeResult<()> {
        self.store
            .mark_terminal(trade.id, trade.status, to, message, exit_reason)?;
        match to {
            TradeStatus::Failed => summary.failed += 1,
            _ => summary.errored += 1,
        }
        logger::error(
            LogTag::Trader,
            &format!(
                "Trade {} (signal {}) {} -> {}: {}",
                trade.id, trade.signal_id, trade.status, to, message
            ),
        );
        self.notify(Notification::trade_aborted(trade, to.as_str(), message))
            .await;
        Ok(())
    }

    async fn notify(&self, notification: Notification) {
        send_best_effort(self.notifier.as_ref(), notification).await;
    }
}

/// Whole base units for `amount` of an asset with `decimals`
///
/// None when the result is below one unit or not representable.
pub fn to_raw(amount: f64, decimals: u8) -> Option<u64> {
    let raw = (amount * 10f64.powi(decimals as i32)).floor();
    if raw.is_finite() && raw >= 1.0 && raw < u64::MAX as f64 {
        Some(raw as u64)
    } else {
        None
    }
}

pub fn to_ui(raw: u64, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}
