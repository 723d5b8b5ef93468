use crate::connector::PrivateConnector;
use crate::error::ExecutionError;
use crate::order::{Order, OrderType, TimeInForce};
use crate::registry::OrderRegistry;
use crate::twap::{inter_slice_delay_secs, twap_slices};
use gateway_data::bus::MessageBus;
use gateway_instrument::{AccountType, ExchangeId, InstrumentId, Market, MarketSpec, Side};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{info, warn};

/// Resolves a canonical symbol to its immutable `Market` spec. Implemented
/// by `gateway-core`'s `ExchangeManager`; kept as a trait here to avoid a
/// dependency from this crate back to `gateway-core`.
pub trait MarketResolver: Send + Sync {
    fn resolve(&self, symbol: &InstrumentId) -> Option<Market>;
}

/// Chooses the `AccountType` an order should route to when the caller
/// didn't pin one explicitly (spec §4.M point 4: "resolve from
/// `InstrumentId.subtype` via a per-venue policy").
pub trait AccountTypePolicy: Send + Sync {
    fn resolve(&self, market: &Market) -> AccountType;
}

#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub symbol: InstrumentId,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub reduce_only: bool,
    pub account_type_override: Option<AccountType>,
}

struct SubmitJob {
    order: Order,
}

/// Per-exchange component translating strategy intents into venue-specific
/// requests (spec §4.M). Holds one FIFO `submit_queue` per `AccountType`,
/// each drained by a single consumer task that calls into the matching
/// `PrivateConnector` — this gives per-account FIFO delivery with no
/// cross-account ordering guarantee.
pub struct Ems {
    exchange: ExchangeId,
    markets: Arc<dyn MarketResolver>,
    account_policy: Arc<dyn AccountTypePolicy>,
    connectors: HashMap<AccountType, Arc<dyn PrivateConnector>>,
    registry: Arc<OrderRegistry>,
    bus: Arc<Mutex<MessageBus>>,
    queues: AsyncMutex<HashMap<AccountType, mpsc::UnboundedSender<SubmitJob>>>,
    oid_seq: AtomicU64,
}

fn now_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).expect("clock before epoch").as_millis() as u64
}

impl Ems {
    pub fn new(
        exchange: ExchangeId,
        markets: Arc<dyn MarketResolver>,
        account_policy: Arc<dyn AccountTypePolicy>,
        connectors: HashMap<AccountType, Arc<dyn PrivateConnector>>,
        registry: Arc<OrderRegistry>,
        bus: Arc<Mutex<MessageBus>>,
    ) -> Self {
        Self {
            exchange,
            markets,
            account_policy,
            connectors,
            registry,
            bus,
            queues: AsyncMutex::new(HashMap::new()),
            oid_seq: AtomicU64::new(0),
        }
    }

    pub fn next_oid(&self) -> String {
        format!("{:?}-{}", self.exchange, self.oid_seq.fetch_add(1, Ordering::Relaxed))
    }

    fn publish_order(&self, order: &Order) {
        self.bus.lock().publish(&format!("{}.order", self.exchange.as_str().to_lowercase()), order.clone());
    }

    /// Quantises price/amount, enforces minimums, and picks the account
    /// type, returning either an order ready to submit or a locally
    /// synthesised `FAILED` order (spec §4.M preprocessing steps 1-4).
    fn preprocess(&self, oid: String, req: CreateOrderRequest) -> Result<(Order, AccountType), Order> {
        let Some(market) = self.markets.resolve(&req.symbol) else {
            warn!(oid, symbol = %req.symbol, "unknown symbol, failing order locally");
            return Err(failed_stub(oid, self.exchange, req));
        };

        let marketable = req.order_type == OrderType::Market;
        let price = req.price.map(|p| market.price_to_precision(p, req.side, marketable));
        let amount = market.amount_to_precision(req.amount);

        let notional_price = price.unwrap_or(Decimal::ZERO);
        if amount < market.min_amount() || (req.order_type != OrderType::Market && notional_price * amount < market.min_notional()) {
            warn!(oid, %amount, "order below minimum amount/notional, failing locally");
            let mut order = failed_stub(oid, self.exchange, req);
            order.amount = amount;
            order.price = price;
            return Err(order);
        }

        let account_type = req.account_type_override.unwrap_or_else(|| self.account_policy.resolve(&market));

        let order = Order::new_pending(
            "placeholder",
            self.exchange,
            account_type,
            req.symbol,
            req.side,
            req.order_type,
            amount,
            price,
            req.time_in_force,
            req.reduce_only,
            now_ms(),
        );
        Ok((order, account_type))
    }

    /// Enqueues `order` onto its account-type's submit queue, spawning the
    /// queue's single consumer task the first time that account is used.
    pub async fn create_order(&self, req: CreateOrderRequest) -> Order {
        let oid = self.next_oid();
        match self.preprocess(oid.clone(), req) {
            Err(failed) => {
                self.publish_order(&failed);
                failed
            }
            Ok((mut order, account_type)) => {
                order.oid = oid;
                self.registry.register_tmp_order(order.clone());
                self.enqueue(account_type, order.clone()).await;
                order
            }
        }
    }

    pub async fn create_batch_orders(&self, reqs: Vec<CreateOrderRequest>) -> Vec<Order> {
        let mut out = Vec::with_capacity(reqs.len());
        for req in reqs {
            out.push(self.create_order(req).await);
        }
        out
    }

    pub async fn cancel_order(&self, account_type: AccountType, oid: &str, symbol: &InstrumentId) -> Result<(), ExecutionError> {
        let connector = self.connector_for(account_type)?;
        connector.cancel_order(oid, symbol).await
    }

    pub async fn cancel_all_orders(&self, account_type: AccountType, symbol: Option<&InstrumentId>) -> Result<(), ExecutionError> {
        let connector = self.connector_for(account_type)?;
        connector.cancel_all_orders(symbol).await
    }

    pub async fn modify_order(
        &self,
        account_type: AccountType,
        oid: &str,
        symbol: &InstrumentId,
        price: Option<Decimal>,
        amount: Option<Decimal>,
    ) -> Result<(), ExecutionError> {
        let connector = self.connector_for(account_type)?;
        connector.modify_order(oid, symbol, price, amount).await
    }

    /// `create_tp_sl_order`: submits a primary order plus a linked
    /// reduce-only stop order, both through the normal preprocessing and
    /// queueing path (supplemented feature: TP/SL order).
    pub async fn create_tp_sl_order(
        &self,
        entry: CreateOrderRequest,
        take_profit_price: Option<Decimal>,
        stop_loss_price: Option<Decimal>,
    ) -> Vec<Order> {
        let mut out = vec![self.create_order(entry.clone()).await];

        let opposite = entry.side.opposite();
        for trigger_price in [take_profit_price, stop_loss_price].into_iter().flatten() {
            let protective = CreateOrderRequest {
                symbol: entry.symbol.clone(),
                side: opposite,
                order_type: OrderType::StopMarket,
                amount: entry.amount,
                price: Some(trigger_price),
                time_in_force: TimeInForce::Gtc,
                reduce_only: true,
                account_type_override: entry.account_type_override,
            };
            out.push(self.create_order(protective).await);
        }

        out
    }

    /// `create_twap`: schedules slices per spec §4.M's algorithm, emitting
    /// one market order per slice with `max(duration_s/k, wait_s)` between
    /// them. Returns a handle whose `cancel()` stops scheduling any
    /// not-yet-submitted slice.
    pub fn create_twap(
        self: &Arc<Self>,
        symbol: InstrumentId,
        side: Side,
        total_amount: Decimal,
        duration_s: f64,
        wait_s: f64,
        reduce_only: bool,
        account_type_override: Option<AccountType>,
        min_order_amount: Decimal,
    ) -> TwapHandle {
        let slices = twap_slices(total_amount, min_order_amount, reduce_only);
        let delay = inter_slice_delay_secs(duration_s, slices.len().max(1), wait_s);
        let cancelled = Arc::new(AtomicBool::new(false));

        let ems = self.clone();
        let flag = cancelled.clone();
        tokio::spawn(async move {
            for (i, amount) in slices.iter().enumerate() {
                if flag.load(Ordering::Relaxed) {
                    info!(remaining = slices.len() - i, "twap cancelled, stopping scheduling");
                    break;
                }
                let req = CreateOrderRequest {
                    symbol: symbol.clone(),
                    side,
                    order_type: OrderType::Market,
                    amount: *amount,
                    price: None,
                    time_in_force: TimeInForce::Ioc,
                    reduce_only,
                    account_type_override,
                };
                ems.create_order(req).await;

                if i + 1 < slices.len() {
                    tokio::time::sleep(std::time::Duration::from_secs_f64(delay)).await;
                }
            }
        });

        TwapHandle { cancelled }
    }

    fn connector_for(&self, account_type: AccountType) -> Result<Arc<dyn PrivateConnector>, ExecutionError> {
        self.connectors
            .get(&account_type)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownSymbol(format!("no connector for account type {account_type:?}")))
    }

    async fn enqueue(&self, account_type: AccountType, order: Order) {
        let mut queues = self.queues.lock().await;
        let tx = queues.entry(account_type).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            if let Some(connector) = self.connectors.get(&account_type).cloned() {
                let registry = self.registry.clone();
                let bus = self.bus.clone();
                let exchange = self.exchange;
                tokio::spawn(Self::run_submit_queue(connector, registry, bus, exchange, rx));
            }
            tx
        });
        let _ = tx.send(SubmitJob { order });
    }

    async fn run_submit_queue(
        connector: Arc<dyn PrivateConnector>,
        registry: Arc<OrderRegistry>,
        bus: Arc<Mutex<MessageBus>>,
        exchange: ExchangeId,
        mut rx: mpsc::UnboundedReceiver<SubmitJob>,
    ) {
        while let Some(job) = rx.recv().await {
            match connector.submit_order(&job.order).await {
                Ok(eid) => registry.link(eid, job.order.oid.clone()),
                Err(err) => {
                    warn!(oid = job.order.oid, error = %err, "order submission failed, synthesising FAILED order");
                    let mut failed = job.order.clone();
                    failed.status = crate::order::OrderStatus::Failed;
                    registry.register_tmp_order(failed.clone());
                    bus.lock().publish(&format!("{}.order", exchange.as_str().to_lowercase()), failed);
                }
            }
        }
    }
}

/// Handle to a running TWAP scheduler task.
#[derive(Debug, Clone)]
pub struct TwapHandle {
    cancelled: Arc<AtomicBool>,
}

impl TwapHandle {
    /// Stops scheduling any slice not already submitted. Already-submitted
    /// slices are not affected (spec §4.M).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

fn failed_stub(oid: String, exchange: ExchangeId, req: CreateOrderRequest) -> Order {
    Order::new_pending(
        oid,
        exchange,
        req.account_type_override.unwrap_or(AccountType::Mock),
        req.symbol,
        req.side,
        req.order_type,
        req.amount,
        req.price,
        req.time_in_force,
        req.reduce_only,
        now_ms(),
    )
    .failed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_instrument::{MarketSpec, SpotMarket};
    use rust_decimal_macros::dec;

    struct FixedMarket(Market);
    impl MarketResolver for FixedMarket {
        fn resolve(&self, _symbol: &InstrumentId) -> Option<Market> {
            Some(self.0.clone())
        }
    }

    struct SpotPolicy;
    impl AccountTypePolicy for SpotPolicy {
        fn resolve(&self, _market: &Market) -> AccountType {
            AccountType::BinanceSpot
        }
    }

    fn market() -> Market {
        Market::Spot(SpotMarket {
            symbol: "BTCUSDT".into(),
            base: "BTC".into(),
            quote: "USDT".into(),
            price_tick: dec!(0.1),
            amount_lot: dec!(0.001),
            min_amount: dec!(0.001),
            min_notional: dec!(10),
        })
    }

    fn ems() -> Arc<Ems> {
        Arc::new(Ems::new(
            ExchangeId::Binance,
            Arc::new(FixedMarket(market())),
            Arc::new(SpotPolicy),
            HashMap::new(),
            Arc::new(OrderRegistry::new()),
            Arc::new(Mutex::new(MessageBus::new())),
        ))
    }

    #[tokio::test]
    async fn below_minimum_notional_fails_locally_without_submitting() {
        let ems = ems();
        let order = ems
            .create_order(CreateOrderRequest {
                symbol: InstrumentId::spot("BTCUSDT", ExchangeId::Binance),
                side: Side::Buy,
                order_type: OrderType::Limit,
                amount: dec!(0.001),
                price: Some(dec!(1)),
                time_in_force: TimeInForce::Gtc,
                reduce_only: false,
                account_type_override: None,
            })
            .await;

        assert_eq!(order.status, crate::order::OrderStatus::Failed);
    }

    #[tokio::test]
    async fn locally_failed_order_is_published_on_the_exchange_topic() {
        let bus = Arc::new(Mutex::new(MessageBus::new()));
        let seen = Arc::new(AtomicBool::new(false));
        let flag = seen.clone();
        bus.lock().subscribe::<Order, _>("binance.order", move |order| {
            assert_eq!(order.status, crate::order::OrderStatus::Failed);
            flag.store(true, Ordering::Relaxed);
        });

        let ems = Arc::new(Ems::new(
            ExchangeId::Binance,
            Arc::new(FixedMarket(market())),
            Arc::new(SpotPolicy),
            HashMap::new(),
            Arc::new(OrderRegistry::new()),
            bus,
        ));

        ems.create_order(CreateOrderRequest {
            symbol: InstrumentId::spot("BTCUSDT", ExchangeId::Binance),
            side: Side::Buy,
            order_type: OrderType::Limit,
            amount: dec!(0.001),
            price: Some(dec!(1)),
            time_in_force: TimeInForce::Gtc,
            reduce_only: false,
            account_type_override: None,
        })
        .await;

        assert!(seen.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn unknown_symbol_fails_locally() {
        struct NoMarket;
        impl MarketResolver for NoMarket {
            fn resolve(&self, _symbol: &InstrumentId) -> Option<Market> {
                None
            }
        }
        let ems = Arc::new(Ems::new(
            ExchangeId::Binance,
            Arc::new(NoMarket),
            Arc::new(SpotPolicy),
            HashMap::new(),
            Arc::new(OrderRegistry::new()),
            Arc::new(Mutex::new(MessageBus::new())),
        ));

        let order = ems
            .create_order(CreateOrderRequest {
                symbol: InstrumentId::spot("BTCUSDT", ExchangeId::Binance),
                side: Side::Buy,
                order_type: OrderType::Limit,
                amount: dec!(1),
                price: Some(dec!(100)),
                time_in_force: TimeInForce::Gtc,
                reduce_only: false,
                account_type_override: None,
            })
            .await;

        assert_eq!(order.status, crate::order::OrderStatus::Failed);
    }
}
