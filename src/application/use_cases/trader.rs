//! Trader core: sell/buy decisioning and order-book/backend orchestration
//! for the live (non-simulated) path.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::application::ports::{
    BackendPort, ExchangeError, ExchangeOrderRecord, ExchangeRestPort, OrderBucket,
    OrderClosedEvent, OrderConfirmedEvent, OrderRequest, WalletEntry,
};
use crate::domain::order_execution::{OpenOrder, OrderBook, OrderBookError};
use crate::domain::shared::{
    calc_fee, DomainError, ExchangeOrderId, GroupId, Money, Side, Symbol, Timestamp,
};
use crate::observability::record_order_submitted;

/// Volatility buffer subtracted from a sell amount to avoid "insufficient
/// balance" rejects on a position whose value has drifted slightly (§4.5).
const SELL_AMOUNT_EPSILON: f64 = 2e-8;

/// Errors raised by the trader use case, named after the §7 error-kind
/// taxonomy that applies to this bounded context.
#[derive(Debug, Error)]
pub enum TraderError {
    /// Startup could not derive an investment size.
    #[error("configuration fatal: {0}")]
    ConfigurationFatal(String),

    /// A backend mirror write failed; the in-memory book remains
    /// authoritative.
    #[error("persistence non-fatal: {0}")]
    PersistenceNonfatal(String),

    /// An order submission was rejected or could not be sent.
    #[error("exchange non-fatal: {0}")]
    ExchangeNonfatal(String),

    /// An event referenced an order the book doesn't know about.
    #[error("lookup miss: {0}")]
    LookupMiss(String),

    /// An order-book invariant was violated.
    #[error(transparent)]
    OrderBook(#[from] OrderBookError),

    /// A domain invariant was violated.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Validated trading configuration consumed by the trader (subset of
/// [`crate::config::TradingConfig`] relevant to decisioning).
#[derive(Debug, Clone)]
pub struct TraderConfig {
    /// Base (fiat) currency, e.g. `"USD"`.
    pub base_currency: Symbol,
    /// Current available budget.
    pub budget: Money,
    /// Fixed fiat amount invested per buy, once finalized.
    pub amount_invest_fiat: Option<Money>,
    /// Fraction of budget invested per buy, if using relative sizing.
    pub amount_invest_relative: Option<f64>,
    /// Whether to derive `asset_buy_limit` from budget / invest size.
    pub buy_limit_strategy: bool,
    /// Maximum concurrent open positions, once finalized.
    pub asset_buy_limit: Option<usize>,
    /// Maker fee percentage (applied to sells).
    pub maker_fee_pct: f64,
    /// Taker fee percentage (applied to buys).
    pub taker_fee_pct: f64,
    /// Multiplier applied to the buy price to derive the sell target.
    pub profit_factor_target: f64,
}

/// Derive `amount_invest_fiat`/`asset_buy_limit` from `budget` at startup
/// (§4.5).
///
/// # Errors
///
/// Returns [`TraderError::ConfigurationFatal`] if neither
/// `amount_invest_fiat` nor `amount_invest_relative` is set.
pub fn finalize_trading_config(config: &mut TraderConfig) -> Result<(), TraderError> {
    if config.amount_invest_fiat.is_none() {
        if let (Some(relative), true) = (config.amount_invest_relative, config.budget.is_positive())
        {
            let amount = (config.budget.amount() * Decimal::try_from(relative).map_err(|e| {
                TraderError::ConfigurationFatal(format!("invalid amount_invest_relative: {e}"))
            })?)
            .round_dp(2);
            config.amount_invest_fiat = Some(Money::new(amount));
        }
    }

    let Some(invest_fiat) = config.amount_invest_fiat else {
        return Err(TraderError::ConfigurationFatal(
            "neither amount_invest_fiat nor amount_invest_relative is set".to_string(),
        ));
    };

    if config.buy_limit_strategy && config.budget.is_positive() && !invest_fiat.is_zero() {
        let limit = (config.budget.amount() / invest_fiat.amount())
            .floor()
            .to_string()
            .parse::<usize>()
            .unwrap_or(0);
        config.asset_buy_limit = Some(limit);
    }

    Ok(())
}

/// Orchestrates the sell-then-buy decision loop and order-book mutations
/// for the live trading path.
pub struct Trader {
    order_book: OrderBook,
    config: TraderConfig,
    backend: Arc<dyn BackendPort>,
    exchange: Arc<dyn ExchangeRestPort>,
    wallets: BTreeMap<Symbol, WalletEntry>,
}

impl Trader {
    /// Construct a trader over an empty order book.
    #[must_use]
    pub fn new(
        config: TraderConfig,
        backend: Arc<dyn BackendPort>,
        exchange: Arc<dyn ExchangeRestPort>,
    ) -> Self {
        Self {
            order_book: OrderBook::new(),
            config,
            backend,
            exchange,
            wallets: BTreeMap::new(),
        }
    }

    /// The underlying order book.
    #[must_use]
    pub fn order_book(&self) -> &OrderBook {
        &self.order_book
    }

    /// Current budget.
    #[must_use]
    pub fn budget(&self) -> Money {
        self.config.budget
    }

    /// Sum of `profit_fiat` across closed orders, rounded to 2 decimals.
    #[must_use]
    pub fn get_profit(&self) -> Money {
        self.order_book.total_profit()
    }

    /// One tick: evaluate and submit sells, then evaluate and submit buys
    /// (§4.5 — this order is strict, to free budget before new buys).
    #[instrument(skip(self, latest_prices), fields(asset_count = latest_prices.len()))]
    pub async fn update(
        &mut self,
        latest_prices: &BTreeMap<Symbol, Money>,
        timestamp: Timestamp,
    ) -> Result<(), TraderError> {
        self.evaluate_sells(latest_prices).await?;
        self.evaluate_buys(latest_prices, timestamp).await?;
        Ok(())
    }

    async fn evaluate_sells(
        &mut self,
        latest_prices: &BTreeMap<Symbol, Money>,
    ) -> Result<(), TraderError> {
        let candidates: Vec<OpenOrder> = self
            .order_book
            .open()
            .iter()
            .filter(|o| o.sell_order_id.is_none())
            .filter(|o| {
                latest_prices
                    .get(&o.asset)
                    .is_some_and(|price| *price >= o.price_profit)
            })
            .cloned()
            .collect();

        for order in candidates {
            self.submit_sell_order(&order).await?;
        }
        Ok(())
    }

    /// Place a sell at `price_profit` for `buy_volume_crypto − ε` (§4.5).
    #[instrument(skip(self, order), fields(asset = %order.asset, gid = %order.gid))]
    pub async fn submit_sell_order(&self, order: &OpenOrder) -> Result<(), TraderError> {
        let amount = Decimal::try_from(order.buy_volume_crypto - SELL_AMOUNT_EPSILON)
            .map_err(|e| TraderError::ExchangeNonfatal(format!("invalid sell amount: {e}")))?;
        let request = OrderRequest {
            asset: order.asset.clone(),
            price: order.price_profit.amount(),
            amount: -amount,
            gid: order.gid.clone(),
        };
        match self.exchange.order(Side::Sell, request).await {
            Ok(()) => {
                record_order_submitted("sell");
                Ok(())
            }
            Err(ExchangeError::Transport(msg) | ExchangeError::Rejected(msg)) => {
                warn!(asset = %order.asset, error = %msg, "sell order submission failed");
                Err(TraderError::ExchangeNonfatal(msg))
            }
        }
    }

    /// One-open-position-per-asset buy decision (§4.5A), mirroring the
    /// simulator buy loop's budget/limit bookkeeping. Debits `budget`
    /// immediately on acceptance; the [`OpenOrder`] itself is only created
    /// once the exchange confirms the fill (`order_closed` → `buy_confirmed`).
    async fn evaluate_buys(
        &mut self,
        latest_prices: &BTreeMap<Symbol, Money>,
        _timestamp: Timestamp,
    ) -> Result<(), TraderError> {
        let assets: Vec<(Symbol, Money)> = latest_prices
            .iter()
            .filter(|(asset, _)| !self.order_book.open().iter().any(|o| &o.asset == *asset))
            .map(|(a, p)| (a.clone(), *p))
            .collect();

        for (asset, price) in assets {
            let Some(invest_fiat) = self.config.amount_invest_fiat else {
                continue;
            };
            if self.config.budget < invest_fiat || price.is_zero() {
                continue;
            }
            if let Some(limit) = self.config.asset_buy_limit {
                if self.order_book.open().len() >= limit {
                    continue;
                }
            }

            let volume_crypto = (invest_fiat.amount() / price.amount())
                .to_string()
                .parse::<f64>()
                .unwrap_or(0.0);
            let request = OrderRequest {
                asset: asset.clone(),
                price: price.amount(),
                amount: Decimal::try_from(volume_crypto).unwrap_or(Decimal::ZERO),
                gid: GroupId::generate(),
            };

            match self.exchange.order(Side::Buy, request).await {
                Ok(()) => {
                    self.config.budget = self.config.budget - invest_fiat;
                    record_order_submitted("buy");
                    info!(%asset, %invest_fiat, "buy order submitted");
                }
                Err(ExchangeError::Transport(msg) | ExchangeError::Rejected(msg)) => {
                    warn!(%asset, error = %msg, "buy order submission failed");
                }
            }
        }
        Ok(())
    }

    /// Apply the wallet snapshot (§4.6): find the base-currency entry, use
    /// `balance_available` when present, else `balance`, and assign to
    /// `budget`.
    pub fn set_budget(&mut self, entries: &[(Symbol, WalletEntry)]) {
        self.wallets = entries.iter().cloned().collect();
        if let Some(entry) = self.wallets.get(&self.config.base_currency) {
            let amount = entry.balance_available.unwrap_or(entry.balance);
            self.config.budget = Money::new(amount);
        }
    }

    /// Apply a single-currency wallet update (§4.6).
    pub fn update_wallet(&mut self, currency: Symbol, entry: WalletEntry) {
        if currency == self.config.base_currency {
            let amount = entry.balance_available.unwrap_or(entry.balance);
            self.config.budget = Money::new(amount);
        }
        self.wallets.insert(currency, entry);
    }

    /// `order_confirmed` handler (§4.6): a buy ack is a no-op here (buy
    /// persistence happens on `order_closed`); a sell ack stamps the
    /// matching open order with its `sell_order_id`.
    pub fn order_confirmed(&mut self, event: &OrderConfirmedEvent) -> Result<(), TraderError> {
        if event.amount_orig.is_sign_positive() {
            return Ok(());
        }
        let Some(existing) = self
            .order_book
            .open()
            .iter()
            .find(|o| o.asset == event.symbol && o.gid == event.gid)
            .cloned()
        else {
            warn!(asset = %event.symbol, gid = %event.gid, "order_confirmed sell without matching open order");
            return Err(TraderError::LookupMiss(format!(
                "no open order for asset={} gid={}",
                event.symbol, event.gid
            )));
        };
        let mut edited = existing;
        edited.sell_order_id = Some(event.id.clone());
        self.order_book.edit(edited)?;
        Ok(())
    }

    /// `order_closed` handler (§4.6): on a filled buy, create an
    /// [`OpenOrder`]; on a filled sell, move it into the closed bucket.
    pub async fn order_closed(
        &mut self,
        event: &OrderClosedEvent,
        timestamp: Timestamp,
    ) -> Result<(), TraderError> {
        let filled = (event.amount_orig.abs() - event.amount_filled.abs()).abs()
            < Decimal::new(1, 6);
        if !filled {
            return Ok(());
        }

        if event.amount_orig.is_sign_positive() {
            self.buy_confirmed(event, timestamp).await
        } else {
            self.sell_confirmed(event, timestamp).await
        }
    }

    async fn buy_confirmed(
        &mut self,
        event: &OrderClosedEvent,
        timestamp: Timestamp,
    ) -> Result<(), TraderError> {
        let price_buy = Money::new(event.price_avg);
        let volume_crypto = event.amount_filled.abs().to_string().parse::<f64>().unwrap_or(0.0);
        let fee = calc_fee(
            volume_crypto,
            self.config.maker_fee_pct,
            self.config.taker_fee_pct,
            event.price_avg.to_string().parse::<f64>().unwrap_or(0.0),
            Side::Buy,
        );
        let price_profit = Money::new(
            price_buy.amount()
                * Decimal::try_from(self.config.profit_factor_target).unwrap_or(Decimal::ONE),
        );
        let open_order = OpenOrder {
            asset: event.symbol.clone(),
            buy_order_id: event.id.clone(),
            gid: event.gid.clone(),
            sell_order_id: None,
            price_buy,
            price_profit,
            buy_volume_fiat: Money::new(event.amount_filled.abs() * event.price_avg),
            buy_volume_crypto: fee.volume_after_fee,
            fee_buy_fiat: Money::new(
                Decimal::try_from(fee.fee_fiat).unwrap_or(Decimal::ZERO),
            ),
            timestamp_buy: timestamp,
        };
        open_order.check_invariants()?;
        self.order_book.new_open(open_order.clone())?;
        if let Err(e) = self
            .backend
            .order_new(&open_order, OrderBucket::Open)
            .await
        {
            warn!(error = %e, "persistence non-fatal: order_new failed");
        }
        Ok(())
    }

    async fn sell_confirmed(
        &mut self,
        event: &OrderClosedEvent,
        timestamp: Timestamp,
    ) -> Result<(), TraderError> {
        let price_sell = Money::new(event.price_avg);
        let volume_crypto = event.amount_filled.abs().to_string().parse::<f64>().unwrap_or(0.0);
        let fee = calc_fee(
            volume_crypto,
            self.config.maker_fee_pct,
            self.config.taker_fee_pct,
            event.price_avg.to_string().parse::<f64>().unwrap_or(0.0),
            Side::Sell,
        );
        // Gross proceeds before the fee, matching `buy_volume_fiat`'s gross
        // convention so profit is a simple proceeds-minus-cost subtraction.
        let sell_volume_fiat = Money::new(event.amount_filled.abs() * event.price_avg);

        let asset = event.symbol.clone();
        let mut found_id: Option<ExchangeOrderId> = None;
        for order in self.order_book.open() {
            if order.sell_order_id.as_ref() == Some(&event.id) {
                found_id = Some(order.buy_order_id.clone());
                break;
            }
        }
        let Some(buy_order_id) = found_id else {
            warn!(asset = %asset, sell_id = %event.id, "sell_confirmed without matching open order");
            return Err(TraderError::LookupMiss(format!(
                "no open order with sell_order_id {}",
                event.id
            )));
        };

        let mut profit = Money::ZERO;
        self.order_book.close(&buy_order_id, |open| {
            let fee_sell_fiat = Money::new(
                Decimal::try_from(fee.fee_fiat).unwrap_or(Decimal::ZERO),
            );
            // Cash conservation: budget was debited `buy_volume_fiat` at the
            // buy and credited `sell_volume_fiat - fee_sell_fiat` here, so
            // profit is exactly that net delta (§8 property 3).
            profit = (sell_volume_fiat - fee_sell_fiat) - open.buy_volume_fiat;
            open.into_closed(
                price_sell,
                sell_volume_fiat,
                fee.volume_after_fee,
                fee_sell_fiat,
                profit,
                timestamp,
            )
        })?;

        if let Some(closed) = self.order_book.closed().last().cloned() {
            if let Err(e) = self.backend.order_del(&closed.open, OrderBucket::Open).await {
                warn!(error = %e, "persistence non-fatal: order_del failed");
            }
        }
        Ok(())
    }

    /// Fetch exchange order history and intersect by `sell_order_id` with
    /// locally-known sells; any exchange-side executed match not yet
    /// settled locally is logged for reconciliation (§4.5).
    #[instrument(skip(self))]
    pub async fn check_sold_orders(&mut self) -> Result<(), TraderError> {
        let history: Vec<ExchangeOrderRecord> = match self.exchange.get_order_history().await {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "exchange non-fatal: get_order_history failed");
                return Err(TraderError::ExchangeNonfatal(e.to_string()));
            }
        };

        for record in history.into_iter().filter(|r| r.executed) {
            let has_local = self
                .order_book
                .open()
                .iter()
                .any(|o| o.sell_order_id.as_ref() == Some(&record.id));
            if has_local {
                info!(sell_id = %record.id, "reconciled executed sell from order history");
            }
        }
        Ok(())
    }
}

/// Remove every open order for `asset` and mirror the deletion to the
/// backend.
///
/// Preserved as-is from the original implementation: this keys by `asset`,
/// matching [`OrderBook::delete_by_asset`]'s documented asymmetry with
/// `edit` (§9).
pub async fn delete_orders_for_asset(
    trader: &mut Trader,
    asset: &Symbol,
) -> Result<(), TraderError> {
    let to_remove: Vec<OpenOrder> = trader
        .order_book
        .open()
        .iter()
        .filter(|o| &o.asset == asset)
        .cloned()
        .collect();
    trader.order_book.delete_by_asset(asset);
    for order in to_remove {
        if let Err(e) = trader.backend.order_del(&order, OrderBucket::Open).await {
            warn!(error = %e, "persistence non-fatal: order_del failed");
        }
    }
    Ok(())
}
