use gateway_instrument::AssetId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spec §3 Balance entity: `total = free + locked >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: AssetId,
    pub free: Decimal,
    pub locked: Decimal,
}

impl Balance {
    pub fn new(asset: AssetId, free: Decimal, locked: Decimal) -> Self {
        Self { asset, free, locked }
    }

    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_sums_free_and_locked() {
        let balance = Balance::new(AssetId::from("USDT"), dec!(100), dec!(5));
        assert_eq!(balance.total(), dec!(105));
    }
}
