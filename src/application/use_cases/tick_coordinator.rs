//! WS coordinator: the per-tick state machine driving the candle cache,
//! sync detection, and trader invocation (§4.6).

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, info_span, instrument, warn};

use crate::application::ports::{
    BackendPort, ExchangePublicPort, PrivateEvent, PublicEvent, TimestampPosition,
};
use crate::application::use_cases::trader::Trader;
use crate::domain::market_data::{
    missing_range, CandleCache, RacePreventionList, DEFAULT_CACHE_CAP, RACE_PREVENTION_CAP,
};
use crate::domain::shared::{Money, Symbol, Timestamp};
use crate::observability::{
    record_sync_patch, record_tick, update_budget, update_candle_cache_size, update_open_orders,
};

/// Connection/priming phase of the tick state machine (§4.6, §4.6B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickState {
    /// Just constructed; subscribe requests not yet all acknowledged.
    Connecting,
    /// Every configured asset has a matching `subscribed` event.
    Subscribed,
    /// At least two distinct timestamps observed in the candle cache.
    Primed,
    /// Steady state: ticks fire on new completed-candle boundaries.
    Ticking,
}

/// Errors raised by the tick coordinator, named after the §7 taxonomy kinds
/// applicable to the sync/tick-coordinator context.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A history-patch fetch could not complete.
    #[error("sync recoverable: {0}")]
    SyncRecoverable(String),

    /// The candle-row at `last_completed_ts` had no asset entries.
    #[error("empty tick at {0}")]
    EmptyTick(i64),
}

/// Drives the public/private WS event streams into candle-cache mutations,
/// gap-triggered history patches, and trader ticks.
pub struct TickCoordinator {
    state: TickState,
    assets: Vec<Symbol>,
    subscribed: BTreeSet<Symbol>,
    candle_cache: CandleCache,
    race_prevention: RacePreventionList,
    last_completed_ts: Option<i64>,
    history_sync_patch_running: bool,
    interval_ms: i64,
    is_simulation: bool,
    public: Arc<dyn ExchangePublicPort>,
    backend: Arc<dyn BackendPort>,
}

impl TickCoordinator {
    /// Construct a coordinator in the `Connecting` state for `assets`.
    #[must_use]
    pub fn new(
        assets: Vec<Symbol>,
        interval_ms: i64,
        is_simulation: bool,
        public: Arc<dyn ExchangePublicPort>,
        backend: Arc<dyn BackendPort>,
    ) -> Self {
        Self {
            state: TickState::Connecting,
            assets,
            subscribed: BTreeSet::new(),
            candle_cache: CandleCache::new(DEFAULT_CACHE_CAP),
            race_prevention: RacePreventionList::new(RACE_PREVENTION_CAP),
            last_completed_ts: None,
            history_sync_patch_running: false,
            interval_ms,
            is_simulation,
            public,
            backend,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TickState {
        self.state
    }

    /// Handle a `subscribed`/`unsubscribed`/`error` public event outside the
    /// candle path; `new_candle` goes through [`Self::on_new_candle`].
    pub fn on_public_event(&mut self, event: &PublicEvent) {
        match event {
            PublicEvent::Connected => {}
            PublicEvent::Subscribed { symbol } => {
                self.subscribed.insert(symbol.clone());
                if self.state == TickState::Connecting
                    && self.assets.iter().all(|a| self.subscribed.contains(a))
                {
                    self.state = TickState::Subscribed;
                    info!("all assets subscribed");
                }
            }
            PublicEvent::Unsubscribed { symbol } | PublicEvent::Error { symbol: Some(symbol), .. } => {
                // §4.6B: a dropped asset logs and flips its bit without
                // resetting last_completed_ts or re-running PRIMED.
                self.subscribed.remove(symbol);
                warn!(%symbol, "asset subscription dropped");
            }
            PublicEvent::Error { symbol: None, message } => {
                warn!(%message, "public channel error");
            }
            PublicEvent::StatusUpdate { message } => {
                info!(%message, "exchange status update");
            }
            PublicEvent::NewCandle { .. } => unreachable!("routed via on_new_candle"),
        }
    }

    /// A `subscribed` event for an asset that had dropped resumes without
    /// re-running the PRIMED transition (§4.6B).
    pub fn resume_subscription(&mut self, symbol: Symbol) {
        self.subscribed.insert(symbol);
    }

    /// Handle one `new_candle` event: upsert into the cache, evaluate the
    /// PRIMED transition, and fire a tick if all gating conditions hold.
    #[instrument(skip(self, trader), fields(%symbol, %timestamp_ms))]
    pub async fn on_new_candle(
        &mut self,
        timestamp_ms: i64,
        symbol: Symbol,
        ohlcv: crate::domain::market_data::Ohlcv,
        trader: &mut Trader,
    ) -> Result<(), SyncError> {
        self.candle_cache.put(timestamp_ms, symbol, ohlcv);

        if self.state == TickState::Subscribed && self.candle_cache.len() >= 2 {
            let completed = self.candle_cache.timestamps().into_iter().max().unwrap_or(timestamp_ms);
            self.last_completed_ts = Some(completed);
            self.state = TickState::Primed;
            self.run_sync_patch(completed).await?;
            self.state = TickState::Ticking;
        }

        self.try_fire_tick(timestamp_ms, trader).await
    }

    async fn run_sync_patch(&mut self, completed_ts: i64) -> Result<(), SyncError> {
        let local_latest = self
            .backend
            .get_local_candle_timestamp(TimestampPosition::Latest)
            .await
            .ok()
            .flatten();
        let Some(local_latest) = local_latest else {
            return Ok(());
        };

        let gap = missing_range(local_latest, completed_ts, self.interval_ms);
        if gap.len() <= 1 {
            return Ok(());
        }

        self.history_sync_patch_running = true;
        let (start, end) = (
            *gap.first().expect("non-empty"),
            *gap.last().expect("non-empty"),
        );
        let result = self.public.request_history(start, end).await;
        self.history_sync_patch_running = false;

        if result.is_ok() {
            record_sync_patch();
        }

        result
            .map(|_candles| ())
            .map_err(|e| SyncError::SyncRecoverable(e.to_string()))
    }

    async fn try_fire_tick(
        &mut self,
        candle_ts: i64,
        trader: &mut Trader,
    ) -> Result<(), SyncError> {
        let Some(last_completed) = self.last_completed_ts else {
            return Ok(());
        };
        let fires = self.state == TickState::Ticking
            && !self.race_prevention.contains(candle_ts)
            && candle_ts > last_completed;

        if !fires {
            return Ok(());
        }

        let span = info_span!("tick", ts = last_completed);
        let _guard = span.enter();

        self.race_prevention.push(candle_ts);

        let row = self
            .candle_cache
            .row(last_completed)
            .cloned()
            .ok_or(SyncError::EmptyTick(last_completed))?;
        if row.is_empty() {
            warn!(ts = last_completed, "empty tick: no assets reported, skipping persist");
            return Err(SyncError::EmptyTick(last_completed));
        }

        self.last_completed_ts = Some(candle_ts);
        record_tick();
        update_candle_cache_size(self.candle_cache.len());

        if let Err(e) = trader.check_sold_orders().await {
            warn!(error = %e, "check_sold_orders failed during tick");
        }

        if !self.history_sync_patch_running && !self.is_simulation {
            let prices = row.iter().map(|(asset, o)| (asset.clone(), Money::usd(o.close))).collect();
            if let Err(e) = trader.update(&prices, Timestamp::now()).await {
                warn!(error = %e, "trader.update failed during tick");
            } else {
                info!(profit = %trader.get_profit(), "tick processed");
            }
        }

        update_open_orders(trader.order_book().open().len());
        let budget_f64 = trader.budget().amount().to_string().parse::<f64>().unwrap_or(0.0);
        update_budget(budget_f64);
        self.candle_cache.prune();
        Ok(())
    }

    /// Dispatch a private-channel event to the appropriate trader handler.
    pub async fn on_private_event(&mut self, event: PrivateEvent, trader: &mut Trader) {
        match event {
            PrivateEvent::WalletSnapshot(entries) => trader.set_budget(&entries),
            PrivateEvent::WalletUpdate { currency, entry } => {
                trader.update_wallet(currency, entry);
            }
            PrivateEvent::OrderConfirmed(event) => {
                if let Err(e) = trader.order_confirmed(&event) {
                    warn!(error = %e, "order_confirmed failed");
                }
            }
            PrivateEvent::OrderClosed(event) => {
                if let Err(e) = trader.order_closed(&event, Timestamp::now()).await {
                    warn!(error = %e, "order_closed failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        BackendError, ExchangeError, ExchangeOrderRecord, ExchangePublicError,
        ExchangeRestPort, HistoricalCandle, OrderBucket, OrderRequest, PersistedTraderState,
        StatusUpdate,
    };
    use crate::application::use_cases::trader::TraderConfig;
    use crate::domain::order_execution::OpenOrder;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct NoopBackend;

    #[async_trait]
    impl BackendPort for NoopBackend {
        async fn db_sync_trader_state(&self) -> Result<PersistedTraderState, BackendError> {
            Ok(PersistedTraderState::default())
        }
        async fn order_new(&self, _o: &OpenOrder, _b: OrderBucket) -> Result<(), BackendError> {
            Ok(())
        }
        async fn order_edit(&self, _o: &OpenOrder) -> Result<(), BackendError> {
            Ok(())
        }
        async fn order_del(&self, _o: &OpenOrder, _b: OrderBucket) -> Result<(), BackendError> {
            Ok(())
        }
        async fn db_add_history(
            &self,
            _rows: crate::application::ports::HistoryRows,
        ) -> Result<(), BackendError> {
            Ok(())
        }
        async fn update_status(&self, _status: StatusUpdate) -> Result<(), BackendError> {
            Ok(())
        }
        async fn get_local_candle_timestamp(
            &self,
            _position: TimestampPosition,
        ) -> Result<Option<i64>, BackendError> {
            Ok(None)
        }
    }

    struct NoopPublic;

    #[async_trait]
    impl ExchangePublicPort for NoopPublic {
        async fn subscribe_candles(&self, _symbol: &Symbol) -> Result<(), ExchangePublicError> {
            Ok(())
        }
        async fn next_event(&self) -> Result<PublicEvent, ExchangePublicError> {
            Ok(PublicEvent::Connected)
        }
        async fn request_history(
            &self,
            _start_ms: i64,
            _end_ms: i64,
        ) -> Result<Vec<HistoricalCandle>, ExchangePublicError> {
            Ok(Vec::new())
        }
    }

    struct NoopExchange;

    #[async_trait]
    impl ExchangeRestPort for NoopExchange {
        async fn order(
            &self,
            _side: crate::domain::shared::Side,
            _req: OrderRequest,
        ) -> Result<(), ExchangeError> {
            Ok(())
        }
        async fn get_order_history(&self) -> Result<Vec<ExchangeOrderRecord>, ExchangeError> {
            Ok(Vec::new())
        }
        async fn get_min_order_sizes(&self) -> Result<HashMap<Symbol, Decimal>, ExchangeError> {
            Ok(HashMap::new())
        }
        async fn get_latest_remote_candle_timestamp(
            &self,
            _minus_delta_ms: i64,
        ) -> Result<i64, ExchangeError> {
            Ok(0)
        }
    }

    fn trader() -> Trader {
        Trader::new(
            TraderConfig {
                base_currency: Symbol::new("USD"),
                budget: Money::new(dec!(1000)),
                amount_invest_fiat: Some(Money::new(dec!(100))),
                amount_invest_relative: None,
                buy_limit_strategy: false,
                asset_buy_limit: None,
                maker_fee_pct: 0.1,
                taker_fee_pct: 0.2,
                profit_factor_target: 1.1,
            },
            Arc::new(NoopBackend),
            Arc::new(NoopExchange),
        )
    }

    fn coordinator() -> TickCoordinator {
        TickCoordinator::new(
            vec![Symbol::new("BTC")],
            5,
            false,
            Arc::new(NoopPublic),
            Arc::new(NoopBackend),
        )
    }

    fn ohlcv(close: f64) -> crate::domain::market_data::Ohlcv {
        crate::domain::market_data::Ohlcv {
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[tokio::test]
    async fn subscribed_transition_requires_every_asset() {
        let mut coord = coordinator();
        coord.on_public_event(&PublicEvent::Subscribed {
            symbol: Symbol::new("BTC"),
        });
        assert_eq!(coord.state(), TickState::Subscribed);
    }

    #[tokio::test]
    async fn primed_transition_on_second_distinct_timestamp() {
        let mut coord = coordinator();
        coord.on_public_event(&PublicEvent::Subscribed {
            symbol: Symbol::new("BTC"),
        });
        let mut t = trader();
        coord
            .on_new_candle(1000, Symbol::new("BTC"), ohlcv(100.0), &mut t)
            .await
            .unwrap();
        coord
            .on_new_candle(1005, Symbol::new("BTC"), ohlcv(101.0), &mut t)
            .await
            .unwrap();
        assert_eq!(coord.state(), TickState::Ticking);
    }

    #[tokio::test]
    async fn race_prevention_bounds_duplicate_ticks_for_same_boundary() {
        let mut coord = coordinator();
        coord.on_public_event(&PublicEvent::Subscribed {
            symbol: Symbol::new("BTC"),
        });
        let mut t = trader();
        coord
            .on_new_candle(1000, Symbol::new("BTC"), ohlcv(100.0), &mut t)
            .await
            .unwrap();
        coord
            .on_new_candle(1005, Symbol::new("BTC"), ohlcv(101.0), &mut t)
            .await
            .unwrap();
        // A second candle at the same completed boundary must not re-tick.
        let before = coord.last_completed_ts;
        coord
            .on_new_candle(1005, Symbol::new("ETH"), ohlcv(50.0), &mut t)
            .await
            .unwrap();
        assert_eq!(coord.last_completed_ts, before);
    }

    #[tokio::test]
    async fn unsubscribed_drops_asset_without_resetting_last_completed_ts() {
        let mut coord = coordinator();
        coord.on_public_event(&PublicEvent::Subscribed {
            symbol: Symbol::new("BTC"),
        });
        let mut t = trader();
        coord
            .on_new_candle(1000, Symbol::new("BTC"), ohlcv(100.0), &mut t)
            .await
            .unwrap();
        coord
            .on_new_candle(1005, Symbol::new("BTC"), ohlcv(101.0), &mut t)
            .await
            .unwrap();
        let before = coord.last_completed_ts;
        coord.on_public_event(&PublicEvent::Unsubscribed {
            symbol: Symbol::new("BTC"),
        });
        assert_eq!(coord.last_completed_ts, before);
        assert_eq!(coord.state(), TickState::Ticking);
    }
}
