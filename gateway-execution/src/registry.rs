use crate::order::Order;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;

#[derive(Default)]
struct State {
    oid_to_eid: HashMap<String, String>,
    eid_to_oid: HashMap<String, String>,
    temp_orders: HashMap<String, Order>,
    waiters: HashMap<String, oneshot::Sender<String>>,
}

/// Bridges the gap between a strategy learning a local `oid` (immediately
/// on submit) and the venue revealing the `eid`, which may arrive via the
/// REST ack or an async WS event — whichever comes first (spec §4.H).
///
/// Invariant: for any `oid`, either both directions of the mapping exist,
/// or the order is still in the temp (pre-`eid`) state. Never one-sided
/// permanently.
///
/// Internally synchronised with a plain [`parking_lot::Mutex`] rather than
/// requiring external locking: every method locks only for the duration of
/// its own bookkeeping, never across an `.await`, so `wait_for_eid` can
/// block on its oneshot without holding anything else up.
#[derive(Default)]
pub struct OrderRegistry {
    state: Mutex<State>,
}

impl std::fmt::Debug for OrderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("OrderRegistry")
            .field("tracked", &state.oid_to_eid.len())
            .field("pending", &state.temp_orders.len())
            .finish()
    }
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `oid -> Order` before an `eid` is known.
    pub fn register_tmp_order(&self, order: Order) {
        self.state.lock().temp_orders.insert(order.oid.clone(), order);
    }

    /// Establishes the `oid <-> eid` mapping, completes any waiter blocked
    /// in [`Self::wait_for_eid`], and promotes the temp order.
    pub fn link(&self, eid: impl Into<String>, oid: impl Into<String>) {
        let eid = eid.into();
        let oid = oid.into();
        let mut state = self.state.lock();

        if let Some(order) = state.temp_orders.get_mut(&oid) {
            order.eid = Some(eid.clone());
        }

        state.oid_to_eid.insert(oid.clone(), eid.clone());
        state.eid_to_oid.insert(eid.clone(), oid.clone());

        if let Some(waiter) = state.waiters.remove(&oid) {
            let _ = waiter.send(eid);
        }
    }

    pub fn get_eid(&self, oid: &str) -> Option<String> {
        self.state.lock().oid_to_eid.get(oid).cloned()
    }

    pub fn get_oid(&self, eid: &str) -> Option<String> {
        self.state.lock().eid_to_oid.get(eid).cloned()
    }

    pub fn get_order(&self, oid: &str) -> Option<Order> {
        self.state.lock().temp_orders.get(oid).cloned()
    }

    /// Completes when [`Self::link`] fires for `oid`, or fails on timeout.
    pub async fn wait_for_eid(&self, oid: &str, timeout_ms: u64) -> Result<String, WaitError> {
        let rx = {
            let mut state = self.state.lock();
            if let Some(eid) = state.oid_to_eid.get(oid) {
                return Ok(eid.clone());
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.insert(oid.to_string(), tx);
            rx
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), rx).await {
            Ok(Ok(eid)) => Ok(eid),
            Ok(Err(_)) => Err(WaitError::Dropped),
            Err(_) => {
                self.state.lock().waiters.remove(oid);
                warn!(oid, "timed out waiting for venue order id");
                Err(WaitError::Timeout)
            }
        }
    }

    /// Called when an order reaches a terminal status; drops both
    /// directions of the mapping and the temp order, if still present.
    pub fn remove(&self, oid: &str) {
        let mut state = self.state.lock();
        if let Some(eid) = state.oid_to_eid.remove(oid) {
            state.eid_to_oid.remove(&eid);
        }
        state.temp_orders.remove(oid);
        state.waiters.remove(oid);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("timed out waiting for eid")]
    Timeout,
    #[error("registry dropped before eid arrived")]
    Dropped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderType, TimeInForce};
    use gateway_instrument::{AccountType, ExchangeId, InstrumentId, Side};

    fn order(oid: &str) -> Order {
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

    #[tokio::test]
    async fn wait_for_eid_returns_immediately_when_already_linked() {
        let registry = OrderRegistry::new();
        registry.register_tmp_order(order("c1"));
        registry.link("e1", "c1");
        let eid = registry.wait_for_eid("c1", 1_000).await.unwrap();
        assert_eq!(eid, "e1");
    }

    #[tokio::test]
    async fn link_wakes_a_waiter_blocked_before_it_arrives() {
        let registry = std::sync::Arc::new(OrderRegistry::new());
        registry.register_tmp_order(order("c1"));

        let waiter = tokio::spawn({
            let registry = registry.clone();
            async move { registry.wait_for_eid("c1", 1_000).await }
        });

        tokio::task::yield_now().await;
        registry.link("e1", "c1");

        assert_eq!(waiter.await.unwrap().unwrap(), "e1");
    }

    #[tokio::test]
    async fn wait_for_eid_times_out_when_never_linked() {
        let registry = OrderRegistry::new();
        registry.register_tmp_order(order("c1"));
        let result = registry.wait_for_eid("c1", 10).await;
        assert_eq!(result, Err(WaitError::Timeout));
    }

    #[test]
    fn remove_drops_both_directions() {
        let registry = OrderRegistry::new();
        registry.register_tmp_order(order("c1"));
        registry.link("e1", "c1");
        registry.remove("c1");
        assert_eq!(registry.get_eid("c1"), None);
        assert_eq!(registry.get_oid("e1"), None);
    }
}
