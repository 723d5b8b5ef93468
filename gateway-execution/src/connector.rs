use crate::balance::Balance;
use crate::error::ExecutionError;
use crate::order::Order;
use crate::position::Position;
use async_trait::async_trait;
use gateway_instrument::{AccountType, ExchangeId, InstrumentId};
use rust_decimal::Decimal;

/// Write-through target for the balance/position snapshot a
/// `PrivateConnector` seeds on `connect()` (spec §4.K point 1). Implemented
/// by `gateway-core::cache::Cache`; kept as a trait here so this crate
/// doesn't depend on `gateway-core`, mirroring [`crate::oms::OrderSink`].
pub trait AccountStateSink: Send + Sync {
    fn apply_balance(&self, account_type: AccountType, balance: Balance);
    fn apply_position(&self, exchange: ExchangeId, position: Position);
}

/// No-op sink for tests and for connectors run without a Cache attached.
#[derive(Debug, Default)]
pub struct NoopAccountStateSink;

impl AccountStateSink for NoopAccountStateSink {
    fn apply_balance(&self, _account_type: AccountType, _balance: Balance) {}
    fn apply_position(&self, _exchange: ExchangeId, _position: Position) {}
}

/// One instance per `(exchange, account_type)` declared with credentials
/// (spec §4.K). Owns the authenticated WebSocket(s) and REST session for
/// one account; the EMS submits through it, the OMS consumes the order
/// events it decodes.
#[async_trait]
pub trait PrivateConnector: Send + Sync {
    fn exchange(&self) -> ExchangeId;
    fn account_type(&self) -> AccountType;

    /// Seeds the Cache with balances/positions via REST, verifies one-way
    /// position mode (or enforces it), then opens the authenticated
    /// WS(s) and subscribes to order/fill/balance/position streams (spec
    /// §4.K points 1-3).
    async fn connect(&self) -> Result<(), ExecutionError>;

    async fn disconnect(&self) -> Result<(), ExecutionError>;

    /// Submits a single order, returning the venue's `eid` on ack.
    async fn submit_order(&self, order: &Order) -> Result<String, ExecutionError>;

    /// Submits a batch in one venue call where supported; returns one
    /// result per input order, in order (supplemented feature: batch
    /// order submission).
    async fn submit_batch(&self, orders: &[Order]) -> Result<Vec<Result<String, ExecutionError>>, ExecutionError>;

    async fn modify_order(
        &self,
        oid: &str,
        symbol: &InstrumentId,
        price: Option<Decimal>,
        amount: Option<Decimal>,
    ) -> Result<(), ExecutionError>;

    async fn cancel_order(&self, oid: &str, symbol: &InstrumentId) -> Result<(), ExecutionError>;

    async fn cancel_all_orders(&self, symbol: Option<&InstrumentId>) -> Result<(), ExecutionError>;
}
