//! Synchronous facade over the async REST surface, for strategy code that
//! wants straight-line calls instead of `.await` (§9 design note:
//! "Attribute-delegating proxy ... Strategy: a compile-time generated trait
//! or an explicit dispatch enum ... Reflection is not acceptable in the
//! target"). `SyncApiCall` is that explicit enum; [`SyncApiHandle`] pairs it
//! with [`TaskManager::run_sync`] so a call blocks the calling thread and
//! returns a plain `Result`, never a future.

use crate::task::{Blocked, TaskManager};
use gateway_data::connector::PublicConnector;
use gateway_data::event::{BookL1, Kline};
use gateway_data::subscription::Interval;
use gateway_execution::connector::PrivateConnector;
use gateway_execution::error::ExecutionError;
use gateway_execution::order::Order;
use gateway_instrument::InstrumentId;
use gateway_integration::error::IntegrationError;
use rust_decimal::Decimal;
use std::sync::Arc;

/// One variant per REST call a strategy might want synchronously. Mirrors
/// the union of [`PrivateConnector`] and [`PublicConnector`] methods a
/// strategy is expected to call directly rather than through the EMS queue.
#[derive(Debug, Clone)]
pub enum SyncApiCall {
    SubmitOrder(Order),
    ModifyOrder { oid: String, symbol: InstrumentId, price: Option<Decimal>, amount: Option<Decimal> },
    CancelOrder { oid: String, symbol: InstrumentId },
    CancelAllOrders { symbol: Option<InstrumentId> },
    RequestKlines { symbol: InstrumentId, interval: Interval, start_ms: u64, end_ms: u64, limit: u32 },
    RequestTicker(InstrumentId),
}

#[derive(Debug, Clone)]
pub enum SyncApiResponse {
    OrderSubmitted(String),
    Ack,
    Klines(Vec<Kline>),
    Ticker(BookL1),
}

#[derive(Debug, thiserror::Error)]
pub enum SyncApiError {
    #[error(transparent)]
    Blocked(#[from] Blocked),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

/// Binds a [`SyncApiCall`] dispatcher to one exchange's private and public
/// connectors. Constructed once per `(exchange, account_type)` alongside the
/// connectors it wraps; cheap to clone (every field is an `Arc`).
#[derive(Clone)]
pub struct SyncApiHandle {
    tasks: Arc<TaskManager>,
    private: Arc<dyn PrivateConnector>,
    public: Arc<dyn PublicConnector>,
}

impl std::fmt::Debug for SyncApiHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncApiHandle").field("exchange", &self.private.exchange()).finish()
    }
}

impl SyncApiHandle {
    pub fn new(tasks: Arc<TaskManager>, private: Arc<dyn PrivateConnector>, public: Arc<dyn PublicConnector>) -> Self {
        Self { tasks, private, public }
    }

    /// Blocks the calling thread until `call` completes. Returns
    /// `Err(SyncApiError::Blocked(_))` if invoked from inside a task the
    /// `TaskManager` itself supervises (would deadlock the runtime).
    pub fn call(&self, call: SyncApiCall) -> Result<SyncApiResponse, SyncApiError> {
        let private = self.private.clone();
        let public = self.public.clone();

        let result = self.tasks.run_sync(async move {
            match call {
                SyncApiCall::SubmitOrder(order) => private.submit_order(&order).await.map(SyncApiResponse::OrderSubmitted).map_err(SyncApiError::from),
                SyncApiCall::ModifyOrder { oid, symbol, price, amount } => {
                    private.modify_order(&oid, &symbol, price, amount).await.map(|_| SyncApiResponse::Ack).map_err(SyncApiError::from)
                }
                SyncApiCall::CancelOrder { oid, symbol } => private.cancel_order(&oid, &symbol).await.map(|_| SyncApiResponse::Ack).map_err(SyncApiError::from),
                SyncApiCall::CancelAllOrders { symbol } => {
                    private.cancel_all_orders(symbol.as_ref()).await.map(|_| SyncApiResponse::Ack).map_err(SyncApiError::from)
                }
                SyncApiCall::RequestKlines { symbol, interval, start_ms, end_ms, limit } => public
                    .request_klines(&symbol, interval, start_ms, end_ms, limit)
                    .await
                    .map(SyncApiResponse::Klines)
                    .map_err(SyncApiError::from),
                SyncApiCall::RequestTicker(symbol) => public.request_ticker(&symbol).await.map(SyncApiResponse::Ticker).map_err(SyncApiError::from),
            }
        })?;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_data::bus::MessageBus;
    use gateway_data::connector::MockPublicConnector;
    use gateway_execution::error::ExecutionError;
    use gateway_execution::order::{Order, OrderType, TimeInForce};
    use gateway_instrument::{AccountType, ExchangeId, Side};
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    #[derive(Debug)]
    struct StubPrivate;

    #[async_trait::async_trait]
    impl PrivateConnector for StubPrivate {
        fn exchange(&self) -> ExchangeId {
            ExchangeId::Mock
        }

        fn account_type(&self) -> AccountType {
            AccountType::Mock
        }

        async fn connect(&self) -> Result<(), ExecutionError> {
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), ExecutionError> {
            Ok(())
        }

        async fn submit_order(&self, order: &Order) -> Result<String, ExecutionError> {
            Ok(format!("eid-{}", order.oid))
        }

        async fn submit_batch(&self, orders: &[Order]) -> Result<Vec<Result<String, ExecutionError>>, ExecutionError> {
            Ok(orders.iter().map(|o| Ok(format!("eid-{}", o.oid))).collect())
        }

        async fn modify_order(&self, _oid: &str, _symbol: &InstrumentId, _price: Option<Decimal>, _amount: Option<Decimal>) -> Result<(), ExecutionError> {
            Ok(())
        }

        async fn cancel_order(&self, _oid: &str, _symbol: &InstrumentId) -> Result<(), ExecutionError> {
            Ok(())
        }

        async fn cancel_all_orders(&self, _symbol: Option<&InstrumentId>) -> Result<(), ExecutionError> {
            Ok(())
        }
    }

    fn handle() -> SyncApiHandle {
        let tasks = Arc::new(TaskManager::new());
        let bus = Arc::new(Mutex::new(MessageBus::new()));
        let public = Arc::new(MockPublicConnector::new(ExchangeId::Mock, bus));
        SyncApiHandle::new(tasks, Arc::new(StubPrivate), public)
    }

    #[tokio::test]
    async fn submit_order_round_trips_through_run_sync() {
        let handle = handle();
        let order = Order::new_pending(
            "oid-1",
            ExchangeId::Mock,
            AccountType::Mock,
            InstrumentId::spot("BTCUSDT", ExchangeId::Mock),
            Side::Buy,
            OrderType::Market,
            dec!(1),
            None,
            TimeInForce::Gtc,
            false,
            0,
        );

        let response = handle.call(SyncApiCall::SubmitOrder(order)).unwrap();
        match response {
            SyncApiResponse::OrderSubmitted(eid) => assert_eq!(eid, "eid-oid-1"),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_sync_inside_a_supervised_task_is_blocked() {
        let handle = handle();
        let tasks = Arc::new(TaskManager::new());
        let inner_handle = handle.clone();
        let result = Arc::new(Mutex::new(None));
        let result_clone = result.clone();
        let task_handle = tasks
            .create_task(async move {
                let call_result = inner_handle.call(SyncApiCall::RequestTicker(InstrumentId::spot("BTCUSDT", ExchangeId::Mock)));
                *result_clone.lock() = Some(call_result.is_err());
            })
            .await;
        while !task_handle.is_finished() {
            tokio::task::yield_now().await;
        }
        assert_eq!(*result.lock(), Some(true));
    }
}
