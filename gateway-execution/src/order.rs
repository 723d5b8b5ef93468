use gateway_instrument::{AccountType, ExchangeId, InstrumentId, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Limit,
    Market,
    PostOnly,
    StopLimit,
    StopMarket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    Gtc,
    Ioc,
    Fok,
    /// ALO / POST_ONLY: reject rather than take liquidity.
    Alo,
}

/// Canonical order status (spec §4.L directed graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    PartiallyFilled,
    Filled,
    Canceled,
    Expired,
    Failed,
    Replaced,
    ReplaceFailed,
    Canceling,
    CancelFailed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Expired | OrderStatus::Failed)
    }

    /// Whether `self -> next` is a legal edge in the spec §4.L graph.
    /// Terminal states are sticky: nothing transitions out of them.
    /// `Pending` can jump straight to a fill or terminal status, since a
    /// venue is free to deliver its first update already filled/cancelled
    /// with no intermediate `ACCEPTED` in between.
    /// `Replaced`/`ReplaceFailed`/`Canceling`/`CancelFailed` are transient
    /// modifiers reachable from any non-terminal state and returning to
    /// `Accepted` (or, for cancel, proceeding to `Canceled`).
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Pending, Accepted) => true,
            (Pending, Failed) => true,
            (Pending, PartiallyFilled) => true,
            (Pending, Filled) => true,
            (Pending, Canceled) => true,
            (Pending, Expired) => true,
            (Accepted, PartiallyFilled) => true,
            (Accepted, Filled) => true,
            (Accepted, Canceled) => true,
            (Accepted, Expired) => true,
            (PartiallyFilled, PartiallyFilled) => true,
            (PartiallyFilled, Filled) => true,
            (PartiallyFilled, Canceled) => true,
            (PartiallyFilled, Expired) => true,
            (_, Replaced) => true,
            (_, ReplaceFailed) => true,
            (_, Canceling) => true,
            (_, CancelFailed) => true,
            (Replaced, Accepted) => true,
            (ReplaceFailed, Accepted) => true,
            (Canceling, Canceled) => true,
            (Canceling, PartiallyFilled) => true,
            (CancelFailed, Accepted) => true,
            (CancelFailed, PartiallyFilled) => true,
            _ => false,
        }
    }
}

/// Canonical order representation shared across Registry, Cache, OMS, EMS
/// and the strategy-facing API (spec §3 Order entity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Client order id, assigned locally at submit time.
    pub oid: String,
    /// Venue order id, known only once the venue acknowledges the order.
    pub eid: Option<String>,
    pub exchange: ExchangeId,
    pub account_type: AccountType,
    pub symbol: InstrumentId,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub filled: Decimal,
    pub remaining: Decimal,
    pub average: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub reduce_only: bool,
    pub status: OrderStatus,
    pub timestamp_ms: u64,
    pub fee: Decimal,
    pub fee_currency: Option<String>,
    pub cum_cost: Decimal,
}

impl Order {
    pub fn new_pending(
        oid: impl Into<String>,
        exchange: ExchangeId,
        account_type: AccountType,
        symbol: InstrumentId,
        side: Side,
        order_type: OrderType,
        amount: Decimal,
        price: Option<Decimal>,
        time_in_force: TimeInForce,
        reduce_only: bool,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            oid: oid.into(),
            eid: None,
            exchange,
            account_type,
            symbol,
            side,
            order_type,
            amount,
            price,
            filled: Decimal::ZERO,
            remaining: amount,
            average: None,
            time_in_force,
            reduce_only,
            status: OrderStatus::Pending,
            timestamp_ms,
            fee: Decimal::ZERO,
            fee_currency: None,
            cum_cost: Decimal::ZERO,
        }
    }

    pub fn failed(mut self) -> Self {
        self.status = OrderStatus::Failed;
        self
    }

    /// Applies an inbound merge of mutable fields, never decreasing
    /// `filled` or `cum_cost` (spec §4.L point 3).
    pub fn merge_fill_fields(&mut self, filled: Decimal, average: Option<Decimal>, fee: Decimal, cum_cost: Decimal) {
        if filled > self.filled {
            self.filled = filled;
            self.remaining = (self.amount - self.filled).max(Decimal::ZERO);
        }
        if let Some(avg) = average {
            self.average = Some(avg);
        }
        self.fee = self.fee.max(fee);
        self.cum_cost = self.cum_cost.max(cum_cost);
    }

    /// Attempts the transition, applying it and returning `true` iff legal;
    /// illegal transitions are left untouched for the caller (OMS) to log.
    pub fn try_transition(&mut self, next: OrderStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_reject_every_transition() {
        for terminal in [OrderStatus::Filled, OrderStatus::Canceled, OrderStatus::Expired, OrderStatus::Failed] {
            assert!(!terminal.can_transition_to(OrderStatus::Accepted));
            assert!(!terminal.can_transition_to(OrderStatus::PartiallyFilled));
        }
    }

    #[test]
    fn happy_path_graph() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Accepted));
        assert!(OrderStatus::Accepted.can_transition_to(OrderStatus::PartiallyFilled));
        assert!(OrderStatus::PartiallyFilled.can_transition_to(OrderStatus::Filled));
        assert!(OrderStatus::Accepted.can_transition_to(OrderStatus::Canceled));
    }

    #[test]
    fn pending_can_jump_straight_to_a_fill_or_terminal_status() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::PartiallyFilled));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Filled));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Canceled));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Expired));
    }

    #[test]
    fn merge_never_decreases_filled_or_cum_cost() {
        let mut order = Order::new_pending(
            "c1",
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
        );
        order.merge_fill_fields(rust_decimal_macros::dec!(0.5), None, rust_decimal_macros::dec!(0.01), rust_decimal_macros::dec!(50));
        order.merge_fill_fields(rust_decimal_macros::dec!(0.3), None, rust_decimal_macros::dec!(0.01), rust_decimal_macros::dec!(30));
        assert_eq!(order.filled, rust_decimal_macros::dec!(0.5));
        assert_eq!(order.cum_cost, rust_decimal_macros::dec!(50));
    }
}
