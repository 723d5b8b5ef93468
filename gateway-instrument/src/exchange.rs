use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::InstrumentError;

/// Identifies a trading venue integrated by the gateway.
///
/// `Mock` is not a real venue: it is the target `PrivateConnector`/
/// `PublicConnector` pair the `Engine` wires up when `is_mock = true`
/// (spec §4.N.4), filling orders off the cached `bookl1` mid-price.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum ExchangeId {
    Binance,
    Bybit,
    Okx,
    Hyperliquid,
    Kucoin,
    Bitget,
    Mock,
}

impl ExchangeId {
    pub const ALL: [ExchangeId; 7] = [
        ExchangeId::Binance,
        ExchangeId::Bybit,
        ExchangeId::Okx,
        ExchangeId::Hyperliquid,
        ExchangeId::Kucoin,
        ExchangeId::Bitget,
        ExchangeId::Mock,
    ];

    /// Canonical upper-case tag used in symbol strings and config keys.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Binance => "BINANCE",
            ExchangeId::Bybit => "BYBIT",
            ExchangeId::Okx => "OKX",
            ExchangeId::Hyperliquid => "HYPERLIQUID",
            ExchangeId::Kucoin => "KUCOIN",
            ExchangeId::Bitget => "BITGET",
            ExchangeId::Mock => "MOCK",
        }
    }

    pub const fn is_mock(&self) -> bool {
        matches!(self, ExchangeId::Mock)
    }
}

impl FromStr for ExchangeId {
    type Err = InstrumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BINANCE" => Ok(ExchangeId::Binance),
            "BYBIT" => Ok(ExchangeId::Bybit),
            "OKX" => Ok(ExchangeId::Okx),
            "HYPERLIQUID" => Ok(ExchangeId::Hyperliquid),
            "KUCOIN" => Ok(ExchangeId::Kucoin),
            "BITGET" => Ok(ExchangeId::Bitget),
            "MOCK" => Ok(ExchangeId::Mock),
            other => Err(InstrumentError::UnknownExchange(other.to_string())),
        }
    }
}

impl Display for ExchangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        for exchange in ExchangeId::ALL {
            let parsed: ExchangeId = exchange.as_str().parse().unwrap();
            assert_eq!(parsed, exchange);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("binance".parse::<ExchangeId>().unwrap(), ExchangeId::Binance);
        assert_eq!("Bybit".parse::<ExchangeId>().unwrap(), ExchangeId::Bybit);
    }

    #[test]
    fn unknown_tag_errors() {
        assert!("COINBASE".parse::<ExchangeId>().is_err());
    }
}
