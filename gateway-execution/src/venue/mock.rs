use crate::connector::PrivateConnector;
use crate::error::ExecutionError;
use crate::oms::OrderEvent;
use crate::order::{Order, OrderStatus};
use async_trait::async_trait;
use gateway_instrument::{AccountType, ExchangeId, InstrumentId};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::debug;

/// Supplies the mid-price a mock fill executes against — backed by the
/// Cache's `last_market_data[bookl1]` entry in the real engine (spec
/// §4.N.4: "mock connectors... update the Cache directly from mid-price of
/// bookl1").
pub trait MidPriceSource: Send + Sync {
    fn mid_price(&self, symbol: &InstrumentId) -> Option<Decimal>;
}

/// `is_mock` connector (spec §4.N.4): fills every order immediately at the
/// current `bookl1` mid-price rather than talking to a real venue. EMS
/// preprocessing (precision, minimums, account-type selection) still
/// applies upstream — only the fill mechanics are simulated.
pub struct MockConnector {
    account_type: AccountType,
    prices: std::sync::Arc<dyn MidPriceSource>,
    events: mpsc::UnboundedSender<OrderEvent>,
}

impl MockConnector {
    pub fn new(account_type: AccountType, prices: std::sync::Arc<dyn MidPriceSource>, events: mpsc::UnboundedSender<OrderEvent>) -> Self {
        Self { account_type, prices, events }
    }
}

#[async_trait]
impl PrivateConnector for MockConnector {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Mock
    }

    fn account_type(&self) -> AccountType {
        self.account_type
    }

    async fn connect(&self) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn submit_order(&self, order: &Order) -> Result<String, ExecutionError> {
        let Some(mid) = self.prices.mid_price(&order.symbol) else {
            debug!(oid = order.oid, "no cached mid price, mock fill rejected");
            let _ = self.events.send(OrderEvent {
                eid: None,
                client_tag: Some(order.oid.clone()),
                next_status: OrderStatus::Failed,
                filled: Decimal::ZERO,
                average: None,
                fee: Decimal::ZERO,
                cum_cost: Decimal::ZERO,
            });
            return Err(ExecutionError::UnknownSymbol(order.symbol.to_string()));
        };

        let eid = format!("mock-{}", order.oid);
        let cum_cost = mid * order.amount;
        let _ = self.events.send(OrderEvent {
            eid: Some(eid.clone()),
            client_tag: Some(order.oid.clone()),
            next_status: OrderStatus::Filled,
            filled: order.amount,
            average: Some(mid),
            fee: Decimal::ZERO,
            cum_cost,
        });
        Ok(eid)
    }

    async fn submit_batch(&self, orders: &[Order]) -> Result<Vec<Result<String, ExecutionError>>, ExecutionError> {
        let mut out = Vec::with_capacity(orders.len());
        for order in orders {
            out.push(self.submit_order(order).await);
        }
        Ok(out)
    }

    async fn modify_order(
        &self,
        _oid: &str,
        _symbol: &InstrumentId,
        _price: Option<Decimal>,
        _amount: Option<Decimal>,
    ) -> Result<(), ExecutionError> {
        // Mock fills are instantaneous; there is never a resting order left to modify.
        Ok(())
    }

    async fn cancel_order(&self, _oid: &str, _symbol: &InstrumentId) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn cancel_all_orders(&self, _symbol: Option<&InstrumentId>) -> Result<(), ExecutionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderType, TimeInForce};
    use gateway_instrument::Side;
    use rust_decimal_macros::dec;

    struct FixedMid(Decimal);
    impl MidPriceSource for FixedMid {
        fn mid_price(&self, _symbol: &InstrumentId) -> Option<Decimal> {
            Some(self.0)
        }
    }

    #[tokio::test]
    async fn submit_fills_immediately_at_mid_price() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connector = MockConnector::new(AccountType::Mock, std::sync::Arc::new(FixedMid(dec!(100))), tx);

        let order = Order::new_pending(
            "c1",
            ExchangeId::Mock,
            AccountType::Mock,
            InstrumentId::spot("BTCUSDT", ExchangeId::Mock),
            Side::Buy,
            OrderType::Market,
            dec!(1),
            None,
            TimeInForce::Ioc,
            false,
            0,
        );

        let eid = connector.submit_order(&order).await.unwrap();
        assert_eq!(eid, "mock-c1");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.next_status, OrderStatus::Filled);
        assert_eq!(event.average, Some(dec!(100)));
    }
}
