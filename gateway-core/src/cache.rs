//! Authoritative in-memory state for balances, positions and orders, with a
//! pluggable persistence backend (spec §4.I).
//!
//! Reads run lock-free from the runtime task's point of view (single-
//! threaded cooperative model, spec §5) — the `parking_lot::Mutex`es here
//! exist only so `Cache` can be shared behind an `Arc` across the
//! connectors, OMS and EMS that all write through it, not to coordinate
//! concurrent OS threads.

use async_trait::async_trait;
use gateway_data::event::MarketEvent;
use gateway_execution::balance::Balance;
use gateway_execution::oms::OrderSink;
use gateway_execution::order::Order;
use gateway_execution::position::Position;
use gateway_execution::venue::mock::MidPriceSource;
use gateway_instrument::{AccountType, AssetId, ExchangeId, InstrumentId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::GatewayError;

/// Sanitises `(strategy_id, user_id)` into the table-name prefix spec §6.5
/// calls `<prefix>_orders` / `<prefix>_positions` / etc: lower-cased,
/// non-alphanumeric runs collapsed to a single underscore.
pub fn table_prefix(strategy_id: &str, user_id: &str) -> String {
    let sanitize = |s: &str| {
        let mut out = String::with_capacity(s.len());
        let mut last_was_sep = false;
        for c in s.chars().flat_map(|c| c.to_lowercase()) {
            if c.is_ascii_alphanumeric() {
                out.push(c);
                last_was_sep = false;
            } else if !last_was_sep {
                out.push('_');
                last_was_sep = true;
            }
        }
        out.trim_matches('_').to_string()
    };
    format!("{}_{}", sanitize(strategy_id), sanitize(user_id))
}

/// One row as persisted: primary key, a denormalised `symbol` column for
/// indexed lookups, and the canonical JSON encoding (spec §4.I/§6.5:
/// "`data BLOB` is the canonical JSON encoding of the entity").
#[derive(Debug, Clone)]
pub struct PersistedRow {
    pub key: String,
    pub symbol: String,
    pub timestamp_ms: u64,
    pub data: Vec<u8>,
}

/// Backend-agnostic persistence contract (spec §4.I/§6.5). Implementations
/// upsert by primary key into `<prefix>_orders`, `<prefix>_positions`,
/// `<prefix>_balances`, `<prefix>_pnl_snapshots`.
#[async_trait]
pub trait PersistenceBackend: Send + Sync + std::fmt::Debug {
    async fn upsert_order(&self, row: PersistedRow) -> Result<(), GatewayError>;
    async fn upsert_position(&self, row: PersistedRow) -> Result<(), GatewayError>;
    async fn upsert_balance(&self, row: PersistedRow) -> Result<(), GatewayError>;
    async fn snapshot_pnl(&self, row: PersistedRow) -> Result<(), GatewayError>;

    async fn load_orders(&self) -> Result<Vec<PersistedRow>, GatewayError>;
    async fn load_positions(&self) -> Result<Vec<PersistedRow>, GatewayError>;
    async fn load_balances(&self) -> Result<Vec<PersistedRow>, GatewayError>;
}

/// `rusqlite`-backed implementation. `rusqlite::Connection` is `Send` but
/// not `Sync`, so every call hops onto `spawn_blocking` against a shared
/// `Arc<std::sync::Mutex<Connection>>` — the "dedicated task if the
/// backend is not thread-safe" clause in spec §4.I, realised as a blocking
/// pool task per call rather than a single actor thread (no ordering
/// requirement across flush calls justifies the extra plumbing an actor
/// would need).
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<std::sync::Mutex<rusqlite::Connection>>,
    prefix: String,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend").field("prefix", &self.prefix).finish()
    }
}

impl SqliteBackend {
    pub fn open(db_path: &str, prefix: impl Into<String>) -> Result<Self, GatewayError> {
        let conn = rusqlite::Connection::open(db_path)?;
        let prefix = prefix.into();
        for table in ["orders", "positions", "balances", "pnl_snapshots"] {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {prefix}_{table} (
                        key TEXT PRIMARY KEY,
                        symbol TEXT NOT NULL,
                        timestamp INTEGER NOT NULL,
                        data BLOB NOT NULL
                    )"
                ),
                [],
            )?;
        }
        Ok(Self { conn: Arc::new(std::sync::Mutex::new(conn)), prefix })
    }

    async fn upsert(&self, table: &'static str, row: PersistedRow) -> Result<(), GatewayError> {
        let conn = self.conn.clone();
        let prefix = self.prefix.clone();
        tokio::task::spawn_blocking(move || -> Result<(), GatewayError> {
            let guard = conn.lock().expect("sqlite connection mutex poisoned");
            guard.execute(
                &format!(
                    "INSERT INTO {prefix}_{table} (key, symbol, timestamp, data) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(key) DO UPDATE SET symbol = excluded.symbol, timestamp = excluded.timestamp, data = excluded.data"
                ),
                rusqlite::params![row.key, row.symbol, row.timestamp_ms as i64, row.data],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?
    }

    async fn load(&self, table: &'static str) -> Result<Vec<PersistedRow>, GatewayError> {
        let conn = self.conn.clone();
        let prefix = self.prefix.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<PersistedRow>, GatewayError> {
            let guard = conn.lock().expect("sqlite connection mutex poisoned");
            let mut stmt = guard.prepare(&format!("SELECT key, symbol, timestamp, data FROM {prefix}_{table}"))?;
            let rows = stmt
                .query_map([], |r| {
                    Ok(PersistedRow {
                        key: r.get(0)?,
                        symbol: r.get(1)?,
                        timestamp_ms: r.get::<_, i64>(2)? as u64,
                        data: r.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?
    }
}

#[async_trait]
impl PersistenceBackend for SqliteBackend {
    async fn upsert_order(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.upsert("orders", row).await
    }
    async fn upsert_position(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.upsert("positions", row).await
    }
    async fn upsert_balance(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.upsert("balances", row).await
    }
    async fn snapshot_pnl(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.upsert("pnl_snapshots", row).await
    }
    async fn load_orders(&self) -> Result<Vec<PersistedRow>, GatewayError> {
        self.load("orders").await
    }
    async fn load_positions(&self) -> Result<Vec<PersistedRow>, GatewayError> {
        self.load("positions").await
    }
    async fn load_balances(&self) -> Result<Vec<PersistedRow>, GatewayError> {
        self.load("balances").await
    }
}

/// `tokio-postgres`-backed implementation. Natively async, so no
/// `spawn_blocking` hop is needed (spec §4.I: "natively async" backends
/// skip the dedicated task entirely).
#[derive(Debug)]
pub struct PostgresBackend {
    client: tokio_postgres::Client,
    prefix: String,
}

impl PostgresBackend {
    /// Connects and spawns the driver task that must run for the lifetime
    /// of `client`, per `tokio_postgres`'s standard connection pattern.
    pub async fn connect(conninfo: &str, prefix: impl Into<String>) -> Result<Self, GatewayError> {
        let (client, connection) = tokio_postgres::connect(conninfo, tokio_postgres::NoTls).await?;
        tokio::spawn(async move {
            if let Err(error) = connection.await {
                warn!(%error, "postgres connection task ended with an error");
            }
        });

        let prefix = prefix.into();
        for table in ["orders", "positions", "balances", "pnl_snapshots"] {
            client
                .execute(
                    &format!(
                        "CREATE TABLE IF NOT EXISTS {prefix}_{table} (
                            key TEXT PRIMARY KEY,
                            symbol TEXT NOT NULL,
                            timestamp BIGINT NOT NULL,
                            data BYTEA NOT NULL
                        )"
                    ),
                    &[],
                )
                .await?;
        }
        Ok(Self { client, prefix })
    }

    async fn upsert(&self, table: &'static str, row: PersistedRow) -> Result<(), GatewayError> {
        self.client
            .execute(
                &format!(
                    "INSERT INTO {}_{table} (key, symbol, timestamp, data) VALUES ($1, $2, $3, $4)
                     ON CONFLICT (key) DO UPDATE SET symbol = excluded.symbol, timestamp = excluded.timestamp, data = excluded.data",
                    self.prefix
                ),
                &[&row.key, &row.symbol, &(row.timestamp_ms as i64), &row.data],
            )
            .await?;
        Ok(())
    }

    async fn load(&self, table: &'static str) -> Result<Vec<PersistedRow>, GatewayError> {
        let rows = self
            .client
            .query(&format!("SELECT key, symbol, timestamp, data FROM {}_{table}", self.prefix), &[])
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| PersistedRow {
                key: r.get(0),
                symbol: r.get(1),
                timestamp_ms: r.get::<_, i64>(2) as u64,
                data: r.get(3),
            })
            .collect())
    }
}

#[async_trait]
impl PersistenceBackend for PostgresBackend {
    async fn upsert_order(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.upsert("orders", row).await
    }
    async fn upsert_position(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.upsert("positions", row).await
    }
    async fn upsert_balance(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.upsert("balances", row).await
    }
    async fn snapshot_pnl(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.upsert("pnl_snapshots", row).await
    }
    async fn load_orders(&self) -> Result<Vec<PersistedRow>, GatewayError> {
        self.load("orders").await
    }
    async fn load_positions(&self) -> Result<Vec<PersistedRow>, GatewayError> {
        self.load("positions").await
    }
    async fn load_balances(&self) -> Result<Vec<PersistedRow>, GatewayError> {
        self.load("balances").await
    }
}

/// In-memory backend for tests and `is_mock` runs: no I/O, flush is a
/// no-op beyond recording rows so `load_*` can round-trip them within the
/// same process.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    orders: Mutex<HashMap<String, PersistedRow>>,
    positions: Mutex<HashMap<String, PersistedRow>>,
    balances: Mutex<HashMap<String, PersistedRow>>,
    pnl_snapshots: Mutex<Vec<PersistedRow>>,
}

#[async_trait]
impl PersistenceBackend for InMemoryBackend {
    async fn upsert_order(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.orders.lock().insert(row.key.clone(), row);
        Ok(())
    }
    async fn upsert_position(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.positions.lock().insert(row.key.clone(), row);
        Ok(())
    }
    async fn upsert_balance(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.balances.lock().insert(row.key.clone(), row);
        Ok(())
    }
    async fn snapshot_pnl(&self, row: PersistedRow) -> Result<(), GatewayError> {
        self.pnl_snapshots.lock().push(row);
        Ok(())
    }
    async fn load_orders(&self) -> Result<Vec<PersistedRow>, GatewayError> {
        Ok(self.orders.lock().values().cloned().collect())
    }
    async fn load_positions(&self) -> Result<Vec<PersistedRow>, GatewayError> {
        Ok(self.positions.lock().values().cloned().collect())
    }
    async fn load_balances(&self) -> Result<Vec<PersistedRow>, GatewayError> {
        Ok(self.balances.lock().values().cloned().collect())
    }
}

/// Market-data kind half of the `last_market_data` key (spec §4.I), mirroring
/// `gateway_data::subscription::SubKind` but without the subscription-only
/// `BookL2` depth parameter (the cache keeps the latest snapshot regardless
/// of what depth it arrived at).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketDataKind {
    BookL1,
    BookL2,
    Trade,
    Kline(gateway_data::subscription::Interval),
    FundingRate,
    MarkPrice,
    IndexPrice,
}

impl From<&MarketEvent> for MarketDataKind {
    fn from(event: &MarketEvent) -> Self {
        match event {
            MarketEvent::BookL1(_) => MarketDataKind::BookL1,
            MarketEvent::BookL2(_) => MarketDataKind::BookL2,
            MarketEvent::Trade(_) => MarketDataKind::Trade,
            MarketEvent::Kline(k) => MarketDataKind::Kline(k.interval),
            MarketEvent::FundingRate(_) => MarketDataKind::FundingRate,
            MarketEvent::MarkPrice(_) => MarketDataKind::MarkPrice,
            MarketEvent::IndexPrice(_) => MarketDataKind::IndexPrice,
        }
    }
}

#[derive(Default)]
struct State {
    balances: HashMap<AccountType, HashMap<AssetId, Balance>>,
    positions: HashMap<ExchangeId, HashMap<InstrumentId, Position>>,
    orders: HashMap<String, Order>,
    open_orders_by_symbol: HashMap<InstrumentId, HashSet<String>>,
    open_orders_by_exchange: HashMap<ExchangeId, HashSet<String>>,
    last_market_data: HashMap<(ExchangeId, InstrumentId, MarketDataKind), MarketEvent>,
    dirty_orders: HashSet<String>,
    dirty_positions: HashSet<(ExchangeId, InstrumentId)>,
    dirty_balances: HashSet<(AccountType, AssetId)>,
}

/// Authoritative in-memory state for balances, positions, open/closed
/// orders and the last market-data tick per symbol (spec §4.I). Every
/// mutation goes through an `_apply_*` method; everything else in the
/// runtime only reads.
pub struct Cache {
    state: Mutex<State>,
    backend: Arc<dyn PersistenceBackend>,
    order_expired_time_ms: u64,
    order_maxsize: usize,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Cache")
            .field("orders", &state.orders.len())
            .field("positions", &state.positions.values().map(|m| m.len()).sum::<usize>())
            .finish()
    }
}

impl Cache {
    pub fn new(backend: Arc<dyn PersistenceBackend>, order_expired_time_ms: u64, order_maxsize: usize) -> Self {
        Self { state: Mutex::new(State::default()), backend, order_expired_time_ms, order_maxsize }
    }

    /// Reseeds in-memory state from the persistence backend, used at
    /// `Engine` boot and by scenario S6 (spec §8): "Restart the runtime
    /// with the same `strategy_id`/`user_id` ... loads the identical
    /// Position."
    pub async fn load_from_backend(&self) -> Result<(), GatewayError> {
        let orders = self.backend.load_orders().await?;
        let positions = self.backend.load_positions().await?;
        let balances = self.backend.load_balances().await?;

        let mut state = self.state.lock();
        for row in orders {
            if let Ok(order) = serde_json::from_slice::<Order>(&row.data) {
                if !order.status.is_terminal() {
                    state.open_orders_by_symbol.entry(order.symbol.clone()).or_default().insert(order.oid.clone());
                    state.open_orders_by_exchange.entry(order.exchange).or_default().insert(order.oid.clone());
                }
                state.orders.insert(order.oid.clone(), order);
            }
        }
        for row in positions {
            if let Ok(position) = serde_json::from_slice::<Position>(&row.data) {
                state.positions.entry(position.exchange).or_default().insert(position.symbol.clone(), position);
            }
        }
        for row in balances {
            if let Ok((account_type, balance)) = serde_json::from_slice::<(AccountType, Balance)>(&row.data) {
                state.balances.entry(account_type).or_default().insert(balance.asset.clone(), balance);
            }
        }
        info!(orders = state.orders.len(), "cache reseeded from persistence backend");
        Ok(())
    }

    pub fn get_order(&self, oid: &str) -> Option<Order> {
        self.state.lock().orders.get(oid).cloned()
    }

    pub fn open_orders(&self, symbol: &InstrumentId) -> HashSet<String> {
        self.state.lock().open_orders_by_symbol.get(symbol).cloned().unwrap_or_default()
    }

    pub fn open_orders_for_exchange(&self, exchange: ExchangeId) -> HashSet<String> {
        self.state.lock().open_orders_by_exchange.get(&exchange).cloned().unwrap_or_default()
    }

    pub fn get_balance(&self, account_type: AccountType, asset: &AssetId) -> Option<Balance> {
        self.state.lock().balances.get(&account_type).and_then(|m| m.get(asset)).cloned()
    }

    pub fn get_position(&self, exchange: ExchangeId, symbol: &InstrumentId) -> Option<Position> {
        self.state.lock().positions.get(&exchange).and_then(|m| m.get(symbol)).cloned()
    }

    pub fn apply_balance(&self, account_type: AccountType, balance: Balance) {
        let mut state = self.state.lock();
        state.dirty_balances.insert((account_type, balance.asset.clone()));
        state.balances.entry(account_type).or_default().insert(balance.asset.clone(), balance);
    }

    /// Replaces the stored position for `(exchange, symbol)`. Callers
    /// (the OMS fill path, the mock connector) are responsible for
    /// resolving the correct `entry_price`/`signed_amount` before calling
    /// this — the cache just records and marks it dirty for the next
    /// flush.
    pub fn apply_position(&self, exchange: ExchangeId, position: Position) {
        let mut state = self.state.lock();
        state.dirty_positions.insert((exchange, position.symbol.clone()));
        state.positions.entry(exchange).or_default().insert(position.symbol.clone(), position);
    }

    /// Records the latest tick for `(exchange, symbol, kind)`.
    pub fn update_market_data(&self, exchange: ExchangeId, event: MarketEvent) {
        let key = (exchange, event.symbol().clone(), MarketDataKind::from(&event));
        self.state.lock().last_market_data.insert(key, event);
    }

    pub fn last_market_data(&self, exchange: ExchangeId, symbol: &InstrumentId, kind: MarketDataKind) -> Option<MarketEvent> {
        self.state.lock().last_market_data.get(&(exchange, symbol.clone(), kind)).cloned()
    }

    /// Flushes every key mutated since the last flush to the persistence
    /// backend, then evicts terminal orders older than
    /// `order_expired_time_ms` from memory (still retained in storage,
    /// spec §4.I: "Expired orders... are evicted from memory on flush but
    /// retained in storage"). Also enforces `cache_order_maxsize` by
    /// evicting the oldest terminal orders first when memory holds more
    /// than that many.
    pub async fn flush(&self, now_ms: u64) -> Result<(), GatewayError> {
        let (dirty_orders, dirty_positions, dirty_balances, snapshot_orders) = {
            let mut state = self.state.lock();
            let dirty_orders: Vec<Order> = state.dirty_orders.drain().filter_map(|oid| state.orders.get(&oid).cloned()).collect();
            let dirty_positions: Vec<Position> = state
                .dirty_positions
                .drain()
                .filter_map(|(ex, sym)| state.positions.get(&ex).and_then(|m| m.get(&sym)).cloned())
                .collect();
            let dirty_balances: Vec<(AccountType, Balance)> = state
                .dirty_balances
                .drain()
                .filter_map(|(at, asset)| state.balances.get(&at).and_then(|m| m.get(&asset)).map(|b| (at, b.clone())))
                .collect();
            let snapshot: Vec<Order> = state.orders.values().cloned().collect();
            (dirty_orders, dirty_positions, dirty_balances, snapshot)
        };

        for order in &dirty_orders {
            let data = serde_json::to_vec(order).map_err(|e| GatewayError::Persistence(e.to_string()))?;
            self.backend
                .upsert_order(PersistedRow { key: order.oid.clone(), symbol: order.symbol.to_string(), timestamp_ms: order.timestamp_ms, data })
                .await?;
        }
        for position in &dirty_positions {
            let key = format!("{}:{}", position.exchange, position.symbol);
            let data = serde_json::to_vec(position).map_err(|e| GatewayError::Persistence(e.to_string()))?;
            self.backend.upsert_position(PersistedRow { key, symbol: position.symbol.to_string(), timestamp_ms: now_ms, data }).await?;
        }
        for (account_type, balance) in &dirty_balances {
            let key = format!("{account_type:?}:{}", balance.asset);
            let data = serde_json::to_vec(&(account_type, balance)).map_err(|e| GatewayError::Persistence(e.to_string()))?;
            self.backend.upsert_balance(PersistedRow { key, symbol: balance.asset.to_string(), timestamp_ms: now_ms, data }).await?;
        }

        self.evict_expired(now_ms, &snapshot_orders);
        Ok(())
    }

    fn evict_expired(&self, now_ms: u64, snapshot_orders: &[Order]) {
        let mut expired: Vec<&Order> = snapshot_orders
            .iter()
            .filter(|o| o.status.is_terminal() && now_ms.saturating_sub(o.timestamp_ms) > self.order_expired_time_ms)
            .collect();

        let mut state = self.state.lock();
        if state.orders.len() > self.order_maxsize {
            let mut terminal: Vec<&Order> = snapshot_orders.iter().filter(|o| o.status.is_terminal()).collect();
            terminal.sort_by_key(|o| o.timestamp_ms);
            let overflow = state.orders.len() - self.order_maxsize;
            expired.extend(terminal.into_iter().take(overflow));
        }

        for order in expired {
            state.orders.remove(&order.oid);
        }
    }
}

impl OrderSink for Cache {
    fn apply_order(&self, order: &Order) {
        let mut state = self.state.lock();
        state.dirty_orders.insert(order.oid.clone());
        state.orders.insert(order.oid.clone(), order.clone());
        state.open_orders_by_symbol.entry(order.symbol.clone()).or_default().insert(order.oid.clone());
        state.open_orders_by_exchange.entry(order.exchange).or_default().insert(order.oid.clone());
    }

    fn remove_open(&self, order: &Order) {
        let mut state = self.state.lock();
        if let Some(set) = state.open_orders_by_symbol.get_mut(&order.symbol) {
            set.remove(&order.oid);
        }
        if let Some(set) = state.open_orders_by_exchange.get_mut(&order.exchange) {
            set.remove(&order.oid);
        }
    }
}

/// Delegating impl so `Arc<Cache>` can be handed directly to `Oms::new`
/// and shared with connectors/EMS at the same time.
impl OrderSink for Arc<Cache> {
    fn apply_order(&self, order: &Order) {
        self.as_ref().apply_order(order)
    }

    fn remove_open(&self, order: &Order) {
        self.as_ref().remove_open(order)
    }
}

impl MidPriceSource for Cache {
    fn mid_price(&self, symbol: &InstrumentId) -> Option<rust_decimal::Decimal> {
        match self.last_market_data(symbol.exchange, symbol, MarketDataKind::BookL1)? {
            MarketEvent::BookL1(book) => Some(book.mid_price()),
            _ => None,
        }
    }
}

impl MidPriceSource for Arc<Cache> {
    fn mid_price(&self, symbol: &InstrumentId) -> Option<rust_decimal::Decimal> {
        self.as_ref().mid_price(symbol)
    }
}

impl gateway_execution::connector::AccountStateSink for Cache {
    fn apply_balance(&self, account_type: AccountType, balance: Balance) {
        Cache::apply_balance(self, account_type, balance)
    }

    fn apply_position(&self, exchange: ExchangeId, position: Position) {
        Cache::apply_position(self, exchange, position)
    }
}

impl gateway_execution::connector::AccountStateSink for Arc<Cache> {
    fn apply_balance(&self, account_type: AccountType, balance: Balance) {
        self.as_ref().apply_balance(account_type, balance)
    }

    fn apply_position(&self, exchange: ExchangeId, position: Position) {
        self.as_ref().apply_position(exchange, position)
    }
}

/// KV extension for cross-process strategy parameters (spec §4.I optional
/// Redis-like backend), namespaced `<strategy_id>:<user_id>:<name>`.
/// No `redis` crate is in this workspace's dependency set, so only the
/// in-process default is implemented here; a Redis-backed `ParamStore` is a
/// named extension point, not a fabricated dependency.
pub trait ParamStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: String);
}

#[derive(Debug, Default)]
pub struct InMemoryParamStore {
    namespace: String,
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryParamStore {
    pub fn new(strategy_id: &str, user_id: &str) -> Self {
        Self { namespace: format!("{strategy_id}:{user_id}"), values: Mutex::new(HashMap::new()) }
    }

    fn key(&self, name: &str) -> String {
        format!("{}:{name}", self.namespace)
    }
}

impl ParamStore for InMemoryParamStore {
    fn get(&self, name: &str) -> Option<String> {
        self.values.lock().get(&self.key(name)).cloned()
    }

    fn set(&self, name: &str, value: String) {
        self.values.lock().insert(self.key(name), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_execution::order::{OrderStatus, OrderType, TimeInForce};
    use gateway_instrument::Side;
    use rust_decimal_macros::dec;

    fn order(oid: &str, status: OrderStatus, timestamp_ms: u64) -> Order {
        let mut o = Order::new_pending(
            oid,
            ExchangeId::Binance,
            AccountType::BinanceSpot,
            InstrumentId::spot("BTCUSDT", ExchangeId::Binance),
            Side::Buy,
            OrderType::Limit,
            dec!(1),
            Some(dec!(100)),
            TimeInForce::Gtc,
            false,
            timestamp_ms,
        );
        o.status = status;
        o
    }

    #[test]
    fn table_prefix_sanitises_and_joins() {
        assert_eq!(table_prefix("momentum v1", "user#1"), "momentum_v1_user_1");
    }

    #[tokio::test]
    async fn apply_order_is_read_after_write() {
        let cache = Cache::new(Arc::new(InMemoryBackend::default()), 60_000, 10_000);
        let o = order("c1", OrderStatus::Accepted, 0);
        cache.apply_order(&o);
        assert_eq!(cache.get_order("c1"), Some(o));
    }

    #[tokio::test]
    async fn terminal_order_removed_from_open_orders_on_remove_open() {
        let cache = Cache::new(Arc::new(InMemoryBackend::default()), 60_000, 10_000);
        let o = order("c1", OrderStatus::Filled, 0);
        cache.apply_order(&o);
        assert!(cache.open_orders(&o.symbol).contains("c1"));
        cache.remove_open(&o);
        assert!(!cache.open_orders(&o.symbol).contains("c1"));
    }

    #[tokio::test]
    async fn flush_persists_dirty_orders_and_round_trips() {
        let backend = Arc::new(InMemoryBackend::default());
        let cache = Cache::new(backend.clone(), 60_000, 10_000);
        let o = order("c1", OrderStatus::Accepted, 1_000);
        cache.apply_order(&o);
        cache.flush(2_000).await.unwrap();

        let rows = backend.load_orders().await.unwrap();
        assert_eq!(rows.len(), 1);
        let reloaded: Order = serde_json::from_slice(&rows[0].data).unwrap();
        assert_eq!(reloaded, o);
    }

    #[tokio::test]
    async fn expired_terminal_orders_evicted_from_memory_but_kept_in_storage() {
        let backend = Arc::new(InMemoryBackend::default());
        let cache = Cache::new(backend.clone(), 1_000, 10_000);
        let o = order("c1", OrderStatus::Filled, 0);
        cache.apply_order(&o);
        cache.flush(5_000).await.unwrap();

        assert_eq!(cache.get_order("c1"), None);
        assert_eq!(backend.load_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reload_from_backend_restores_open_orders_index() {
        let backend = Arc::new(InMemoryBackend::default());
        {
            let cache = Cache::new(backend.clone(), 60_000, 10_000);
            cache.apply_order(&order("c1", OrderStatus::Accepted, 0));
            cache.flush(0).await.unwrap();
        }

        let reloaded = Cache::new(backend, 60_000, 10_000);
        reloaded.load_from_backend().await.unwrap();
        assert!(reloaded.get_order("c1").is_some());
        assert!(reloaded.open_orders(&InstrumentId::spot("BTCUSDT", ExchangeId::Binance)).contains("c1"));
    }

    #[test]
    fn param_store_namespaces_by_strategy_and_user() {
        let store = InMemoryParamStore::new("momentum", "alice");
        store.set("risk_limit", "100".to_string());
        assert_eq!(store.get("risk_limit"), Some("100".to_string()));

        let other = InMemoryParamStore::new("momentum", "bob");
        assert_eq!(other.get("risk_limit"), None);
    }
}
