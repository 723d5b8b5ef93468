use gateway_instrument::{ExchangeId, InstrumentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
    Flat,
}

/// Spec §3 Position entity. `side` is derived from `signed_amount` and kept
/// only as a cached convenience — [`Position::new`] enforces the invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: InstrumentId,
    pub exchange: ExchangeId,
    pub side: PositionSide,
    pub signed_amount: Decimal,
    pub entry_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
}

impl Position {
    pub fn new(symbol: InstrumentId, exchange: ExchangeId, signed_amount: Decimal, entry_price: Decimal) -> Self {
        Self {
            symbol,
            exchange,
            side: side_for(signed_amount),
            signed_amount,
            entry_price,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
        }
    }

    pub fn set_signed_amount(&mut self, signed_amount: Decimal) {
        self.signed_amount = signed_amount;
        self.side = side_for(signed_amount);
    }

    pub fn is_flat(&self) -> bool {
        self.side == PositionSide::Flat
    }
}

fn side_for(signed_amount: Decimal) -> PositionSide {
    if signed_amount > Decimal::ZERO {
        PositionSide::Long
    } else if signed_amount < Decimal::ZERO {
        PositionSide::Short
    } else {
        PositionSide::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn side_tracks_sign_of_amount() {
        let mut pos = Position::new(
            InstrumentId::spot("BTCUSDT", ExchangeId::Binance),
            ExchangeId::Binance,
            dec!(1),
            dec!(100),
        );
        assert_eq!(pos.side, PositionSide::Long);
        pos.set_signed_amount(dec!(-1));
        assert_eq!(pos.side, PositionSide::Short);
        pos.set_signed_amount(dec!(0));
        assert!(pos.is_flat());
    }
}
