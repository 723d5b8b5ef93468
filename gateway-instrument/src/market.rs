use crate::{asset::AssetId, side::Side};
use chrono::NaiveDate;
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shared precision/limit helpers every [`Market`] variant exposes.
///
/// A trait implemented by each tagged-union leaf struct rather than a base
/// class, so a shared base/derived inheritance chain is never needed.
pub trait MarketSpec {
    fn symbol(&self) -> &str;
    fn base(&self) -> &AssetId;
    fn quote(&self) -> &AssetId;
    fn price_tick(&self) -> Decimal;
    fn amount_lot(&self) -> Decimal;
    fn min_amount(&self) -> Decimal;
    fn min_notional(&self) -> Decimal;

    /// 1 for spot and linear contracts; face value per contract for inverse
    /// (e.g. 100 USD/contract on many coin-margined venues).
    fn contract_multiplier(&self) -> Decimal {
        Decimal::ONE
    }

    fn max_leverage(&self) -> Decimal {
        Decimal::ONE
    }

    fn min_leverage(&self) -> Decimal {
        Decimal::ONE
    }

    /// Quantise `price` to an integer multiple of [`MarketSpec::price_tick`].
    ///
    /// When `marketable` is true the order is meant to cross the book
    /// immediately, so a buy rounds *up* and a sell rounds *down* to avoid
    /// rounding the order away from a fill; otherwise the nearest tick is
    /// used (spec §4.M preprocessing step 2).
    fn price_to_precision(&self, price: Decimal, side: Side, marketable: bool) -> Decimal {
        let tick = self.price_tick();
        if tick.is_zero() {
            return price;
        }
        let units = price / tick;
        let rounded_units = if marketable {
            match side {
                Side::Buy => units.ceil(),
                Side::Sell => units.floor(),
            }
        } else {
            units.round()
        };
        rounded_units * tick
    }

    /// Quantise `amount` down to an integer multiple of
    /// [`MarketSpec::amount_lot`] (spec §4.M: "round down unless explicitly
    /// requested otherwise").
    fn amount_to_precision(&self, amount: Decimal) -> Decimal {
        let lot = self.amount_lot();
        if lot.is_zero() {
            return amount;
        }
        (amount / lot).floor() * lot
    }

    /// `true` if `price * amount` clears [`MarketSpec::min_notional`] and
    /// `amount` clears [`MarketSpec::min_amount`] (spec §4.M preprocessing
    /// step 3).
    fn meets_minimums(&self, price: Decimal, amount: Decimal) -> bool {
        amount >= self.min_amount() && price * amount * self.contract_multiplier() >= self.min_notional()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Constructor, Serialize, Deserialize)]
pub struct SpotMarket {
    pub symbol: String,
    pub base: AssetId,
    pub quote: AssetId,
    pub price_tick: Decimal,
    pub amount_lot: Decimal,
    pub min_amount: Decimal,
    pub min_notional: Decimal,
}

impl MarketSpec for SpotMarket {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn base(&self) -> &AssetId {
        &self.base
    }
    fn quote(&self) -> &AssetId {
        &self.quote
    }
    fn price_tick(&self) -> Decimal {
        self.price_tick
    }
    fn amount_lot(&self) -> Decimal {
        self.amount_lot
    }
    fn min_amount(&self) -> Decimal {
        self.min_amount
    }
    fn min_notional(&self) -> Decimal {
        self.min_notional
    }
}

/// A USDT/USDC-margined ("linear") perpetual or dated future.
#[derive(Debug, Clone, PartialEq, Eq, Constructor, Serialize, Deserialize)]
pub struct LinearMarket {
    pub symbol: String,
    pub base: AssetId,
    pub quote: AssetId,
    pub price_tick: Decimal,
    pub amount_lot: Decimal,
    pub min_amount: Decimal,
    pub min_notional: Decimal,
    pub contract_multiplier: Decimal,
    pub max_leverage: Decimal,
    pub min_leverage: Decimal,
    pub expiry: Option<NaiveDate>,
}

impl MarketSpec for LinearMarket {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn base(&self) -> &AssetId {
        &self.base
    }
    fn quote(&self) -> &AssetId {
        &self.quote
    }
    fn price_tick(&self) -> Decimal {
        self.price_tick
    }
    fn amount_lot(&self) -> Decimal {
        self.amount_lot
    }
    fn min_amount(&self) -> Decimal {
        self.min_amount
    }
    fn min_notional(&self) -> Decimal {
        self.min_notional
    }
    fn contract_multiplier(&self) -> Decimal {
        self.contract_multiplier
    }
    fn max_leverage(&self) -> Decimal {
        self.max_leverage
    }
    fn min_leverage(&self) -> Decimal {
        self.min_leverage
    }
}

/// A coin-margined ("inverse") perpetual or dated future.
#[derive(Debug, Clone, PartialEq, Eq, Constructor, Serialize, Deserialize)]
pub struct InverseMarket {
    pub symbol: String,
    pub base: AssetId,
    pub quote: AssetId,
    pub price_tick: Decimal,
    pub amount_lot: Decimal,
    pub min_amount: Decimal,
    pub min_notional: Decimal,
    pub contract_multiplier: Decimal,
    pub max_leverage: Decimal,
    pub min_leverage: Decimal,
    pub expiry: Option<NaiveDate>,
}

impl MarketSpec for InverseMarket {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn base(&self) -> &AssetId {
        &self.base
    }
    fn quote(&self) -> &AssetId {
        &self.quote
    }
    fn price_tick(&self) -> Decimal {
        self.price_tick
    }
    fn amount_lot(&self) -> Decimal {
        self.amount_lot
    }
    fn min_amount(&self) -> Decimal {
        self.min_amount
    }
    fn min_notional(&self) -> Decimal {
        self.min_notional
    }
    fn contract_multiplier(&self) -> Decimal {
        self.contract_multiplier
    }
    fn max_leverage(&self) -> Decimal {
        self.max_leverage
    }
    fn min_leverage(&self) -> Decimal {
        self.min_leverage
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionKind {
    Call,
    Put,
}

#[derive(Debug, Clone, PartialEq, Eq, Constructor, Serialize, Deserialize)]
pub struct OptionMarket {
    pub symbol: String,
    pub base: AssetId,
    pub quote: AssetId,
    pub price_tick: Decimal,
    pub amount_lot: Decimal,
    pub min_amount: Decimal,
    pub min_notional: Decimal,
    pub strike: Decimal,
    pub expiry: NaiveDate,
    pub kind: OptionKind,
}

impl MarketSpec for OptionMarket {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn base(&self) -> &AssetId {
        &self.base
    }
    fn quote(&self) -> &AssetId {
        &self.quote
    }
    fn price_tick(&self) -> Decimal {
        self.price_tick
    }
    fn amount_lot(&self) -> Decimal {
        self.amount_lot
    }
    fn min_amount(&self) -> Decimal {
        self.min_amount
    }
    fn min_notional(&self) -> Decimal {
        self.min_notional
    }
}

/// Tagged union of every instrument subtype the gateway understands (spec
/// §9 REDESIGN FLAG: replaces `BaseMarket <- BinanceMarket` inheritance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    Spot(SpotMarket),
    Linear(LinearMarket),
    Inverse(InverseMarket),
    Option(OptionMarket),
}

impl Market {
    pub fn is_linear(&self) -> bool {
        matches!(self, Market::Linear(_))
    }

    pub fn is_inverse(&self) -> bool {
        matches!(self, Market::Inverse(_))
    }

    pub fn is_spot(&self) -> bool {
        matches!(self, Market::Spot(_))
    }
}

impl MarketSpec for Market {
    fn symbol(&self) -> &str {
        match self {
            Market::Spot(m) => m.symbol(),
            Market::Linear(m) => m.symbol(),
            Market::Inverse(m) => m.symbol(),
            Market::Option(m) => m.symbol(),
        }
    }
    fn base(&self) -> &AssetId {
        match self {
            Market::Spot(m) => m.base(),
            Market::Linear(m) => m.base(),
            Market::Inverse(m) => m.base(),
            Market::Option(m) => m.base(),
        }
    }
    fn quote(&self) -> &AssetId {
        match self {
            Market::Spot(m) => m.quote(),
            Market::Linear(m) => m.quote(),
            Market::Inverse(m) => m.quote(),
            Market::Option(m) => m.quote(),
        }
    }
    fn price_tick(&self) -> Decimal {
        match self {
            Market::Spot(m) => m.price_tick(),
            Market::Linear(m) => m.price_tick(),
            Market::Inverse(m) => m.price_tick(),
            Market::Option(m) => m.price_tick(),
        }
    }
    fn amount_lot(&self) -> Decimal {
        match self {
            Market::Spot(m) => m.amount_lot(),
            Market::Linear(m) => m.amount_lot(),
            Market::Inverse(m) => m.amount_lot(),
            Market::Option(m) => m.amount_lot(),
        }
    }
    fn min_amount(&self) -> Decimal {
        match self {
            Market::Spot(m) => m.min_amount(),
            Market::Linear(m) => m.min_amount(),
            Market::Inverse(m) => m.min_amount(),
            Market::Option(m) => m.min_amount(),
        }
    }
    fn min_notional(&self) -> Decimal {
        match self {
            Market::Spot(m) => m.min_notional(),
            Market::Linear(m) => m.min_notional(),
            Market::Inverse(m) => m.min_notional(),
            Market::Option(m) => m.min_notional(),
        }
    }
    fn contract_multiplier(&self) -> Decimal {
        match self {
            Market::Spot(m) => m.contract_multiplier(),
            Market::Linear(m) => m.contract_multiplier(),
            Market::Inverse(m) => m.contract_multiplier(),
            Market::Option(m) => m.contract_multiplier(),
        }
    }
    fn max_leverage(&self) -> Decimal {
        match self {
            Market::Spot(m) => m.max_leverage(),
            Market::Linear(m) => m.max_leverage(),
            Market::Inverse(m) => m.max_leverage(),
            Market::Option(m) => m.max_leverage(),
        }
    }
    fn min_leverage(&self) -> Decimal {
        match self {
            Market::Spot(m) => m.min_leverage(),
            Market::Linear(m) => m.min_leverage(),
            Market::Inverse(m) => m.min_leverage(),
            Market::Option(m) => m.min_leverage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market() -> Market {
        Market::Linear(LinearMarket::new(
            "BTCUSDT".to_string(),
            AssetId::from("BTC"),
            AssetId::from("USDT"),
            dec!(0.1),
            dec!(0.001),
            dec!(0.001),
            dec!(5),
            dec!(1),
            dec!(125),
            dec!(1),
            None,
        ))
    }

    #[test]
    fn price_to_precision_rounds_to_tick() {
        let m = market();
        // S1 scenario from spec §8: tick 0.1, price 29_123.456 -> 29123.5
        let rounded = m.price_to_precision(dec!(29123.456), Side::Buy, false);
        assert_eq!(rounded, dec!(29123.5));
    }

    #[test]
    fn marketable_buy_rounds_up_sell_rounds_down() {
        let m = market();
        assert_eq!(m.price_to_precision(dec!(100.03), Side::Buy, true), dec!(100.1));
        assert_eq!(m.price_to_precision(dec!(100.03), Side::Sell, true), dec!(100.0));
    }

    #[test]
    fn amount_to_precision_rounds_down() {
        let m = market();
        assert_eq!(m.amount_to_precision(dec!(0.0019)), dec!(0.001));
    }

    #[test]
    fn meets_minimums() {
        let m = market();
        assert!(m.meets_minimums(dec!(100), dec!(0.1)));
        assert!(!m.meets_minimums(dec!(100), dec!(0.00001)));
        assert!(!m.meets_minimums(dec!(1), dec!(0.001))); // notional = 0.001 < 5
    }
}
