use crate::order::{Order, OrderStatus};
use crate::registry::OrderRegistry;
use gateway_data::bus::MessageBus;
use gateway_instrument::ExchangeId;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

/// Write-through target for canonical order updates (spec §4.L point 4).
/// Implemented by `gateway-core::cache::Cache`; kept as a trait here so
/// this crate doesn't depend on `gateway-core`.
pub trait OrderSink: Send + Sync {
    fn apply_order(&self, order: &Order);

    /// Called once an order reaches a terminal status, so the sink can
    /// drop it from `open_orders[symbol]` (spec §4.L point 5).
    fn remove_open(&self, order: &Order);
}

/// No-op sink for tests and for connectors run without a Cache attached.
#[derive(Debug, Default)]
pub struct NoopSink;

impl OrderSink for NoopSink {
    fn apply_order(&self, _order: &Order) {}
    fn remove_open(&self, _order: &Order) {}
}

/// Inbound order-event fields the `PrivateConnector` hands to the OMS,
/// already decoded from the venue's wire format but not yet resolved to a
/// local `Order` (spec §4.L).
#[derive(Debug, Clone)]
pub struct OrderEvent {
    pub eid: Option<String>,
    /// Venue-echoed client tag. The EMS sets this to `oid` on submit, so
    /// an event that hasn't yet been `link`ed in the Registry can still be
    /// resolved through it.
    pub client_tag: Option<String>,
    pub next_status: OrderStatus,
    pub filled: Decimal,
    pub average: Option<Decimal>,
    pub fee: Decimal,
    pub cum_cost: Decimal,
}

/// Consumes order events from a single exchange's `PrivateConnector`,
/// resolves `oid <-> eid`, applies status transitions, and republishes the
/// canonical `Order` (spec §4.L).
pub struct Oms<S> {
    exchange: ExchangeId,
    registry: Arc<OrderRegistry>,
    bus: Arc<Mutex<MessageBus>>,
    sink: S,
}

impl<S: OrderSink> Oms<S> {
    pub fn new(exchange: ExchangeId, registry: Arc<OrderRegistry>, bus: Arc<Mutex<MessageBus>>, sink: S) -> Self {
        Self { exchange, registry, bus, sink }
    }

    /// Processes a single inbound event. Returns the updated `Order` if one
    /// was resolved and the transition (if any) was applied.
    pub fn handle_event(&self, event: OrderEvent) -> Option<Order> {
        let oid = event
            .eid
            .as_deref()
            .and_then(|eid| self.registry.get_oid(eid))
            .or_else(|| event.client_tag.clone())?;

        let Some(mut order) = self.registry.get_order(&oid) else {
            debug!(oid, "order event for unknown oid, ignoring (benign race)");
            return None;
        };

        if let Some(eid) = &event.eid {
            if order.eid.is_none() {
                self.registry.link(eid.clone(), oid.clone());
                order.eid = Some(eid.clone());
            }
        }

        if !order.try_transition(event.next_status) {
            warn!(oid, from = ?order.status, to = ?event.next_status, "dropping illegal order status transition");
            return None;
        }

        order.merge_fill_fields(event.filled, event.average, event.fee, event.cum_cost);

        self.registry.register_tmp_order(order.clone());
        self.sink.apply_order(&order);
        self.bus.lock().publish(&format!("{}.order", self.exchange.as_str().to_lowercase()), order.clone());

        if order.status.is_terminal() {
            self.sink.remove_open(&order);
            self.registry.remove(&oid);
        }

        Some(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderType, TimeInForce};
    use gateway_instrument::{AccountType, InstrumentId, Side};

    fn new_order(oid: &str) -> Order {
        Order::new_pending(
            oid,
            ExchangeId::Binance,
            AccountType::BinanceSpot,
            InstrumentId::spot("BTCUSDT", ExchangeId::Binance),
            Side::Buy,
            OrderType::Limit,
            rust_decimal_macros::dec!(1),
            Some(rust_decimal_macros::dec!(100)),
            TimeInForce::Gtc,
            false,
            0,
        )
    }

    #[test]
    fn resolves_by_client_tag_before_eid_is_linked() {
        let registry = Arc::new(OrderRegistry::new());
        registry.register_tmp_order(new_order("c1"));
        let bus = Arc::new(Mutex::new(MessageBus::new()));
        let oms = Oms::new(ExchangeId::Binance, registry.clone(), bus, NoopSink);

        let updated = oms
            .handle_event(OrderEvent {
                eid: Some("e1".into()),
                client_tag: Some("c1".into()),
                next_status: OrderStatus::Accepted,
                filled: rust_decimal_macros::dec!(0),
                average: None,
                fee: rust_decimal_macros::dec!(0),
                cum_cost: rust_decimal_macros::dec!(0),
            })
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Accepted);
        assert_eq!(registry.get_eid("c1").as_deref(), Some("e1"));
    }

    #[test]
    fn unknown_oid_is_ignored() {
        let registry = Arc::new(OrderRegistry::new());
        let bus = Arc::new(Mutex::new(MessageBus::new()));
        let oms = Oms::new(ExchangeId::Binance, registry, bus, NoopSink);

        let result = oms.handle_event(OrderEvent {
            eid: None,
            client_tag: Some("ghost".into()),
            next_status: OrderStatus::Accepted,
            filled: rust_decimal_macros::dec!(0),
            average: None,
            fee: rust_decimal_macros::dec!(0),
            cum_cost: rust_decimal_macros::dec!(0),
        });
        assert!(result.is_none());
    }

    #[test]
    fn illegal_transition_is_dropped_and_order_unchanged() {
        let registry = Arc::new(OrderRegistry::new());
        registry.register_tmp_order(new_order("c1"));
        registry.link("e1", "c1");
        let bus = Arc::new(Mutex::new(MessageBus::new()));
        let oms = Oms::new(ExchangeId::Binance, registry.clone(), bus, NoopSink);

        oms.handle_event(OrderEvent {
            eid: Some("e1".into()),
            client_tag: None,
            next_status: OrderStatus::Accepted,
            filled: rust_decimal_macros::dec!(0),
            average: None,
            fee: rust_decimal_macros::dec!(0),
            cum_cost: rust_decimal_macros::dec!(0),
        })
        .unwrap();

        // Accepted -> Pending is not an edge in the status graph.
        let illegal = oms.handle_event(OrderEvent {
            eid: Some("e1".into()),
            client_tag: None,
            next_status: OrderStatus::Pending,
            filled: rust_decimal_macros::dec!(0),
            average: None,
            fee: rust_decimal_macros::dec!(0),
            cum_cost: rust_decimal_macros::dec!(0),
        });
        assert!(illegal.is_none());
        assert_eq!(registry.get_order("c1").unwrap().status, OrderStatus::Accepted);
    }

    #[test]
    fn terminal_status_removes_from_registry() {
        let registry = Arc::new(OrderRegistry::new());
        registry.register_tmp_order(new_order("c1"));
        registry.link("e1", "c1");
        let bus = Arc::new(Mutex::new(MessageBus::new()));
        let oms = Oms::new(ExchangeId::Binance, registry.clone(), bus, NoopSink);

        oms.handle_event(OrderEvent {
            eid: Some("e1".into()),
            client_tag: None,
            next_status: OrderStatus::Canceled,
            filled: rust_decimal_macros::dec!(0),
            average: None,
            fee: rust_decimal_macros::dec!(0),
            cum_cost: rust_decimal_macros::dec!(0),
        });

        assert_eq!(registry.get_eid("c1"), None);
    }
}
