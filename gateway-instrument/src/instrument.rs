use crate::{error::InstrumentError, exchange::ExchangeId};
use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// The part of the canonical symbol string that distinguishes a spot pair
/// from a linear perpetual or a dated future (spec §3/§6.1).
///
/// This is *not* the fully resolved [`crate::market::Market`] variant:
/// parsing `BTCUSD-PERP.BYBIT` alone cannot tell linear from inverse (both
/// use the `-PERP` suffix on different venues) — that distinction only
/// exists once the symbol is resolved against a loaded `Market`. See the
/// [`InstrumentId`] doc for the two-step resolution this implies.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SymbolSuffix {
    Spot,
    Perpetual,
    Dated(NaiveDate),
}

impl Display for SymbolSuffix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SymbolSuffix::Spot => Ok(()),
            SymbolSuffix::Perpetual => write!(f, "-PERP"),
            SymbolSuffix::Dated(date) => write!(f, "-{}", date.format("%Y%m%d")),
        }
    }
}

/// Canonical, venue-agnostic instrument identifier.
///
/// String form: `<symbol_prefix>[-PERP|-<YYYYMMDD>].<EXCHANGE_TAG>`, e.g.
/// `BTCUSDT-PERP.BINANCE`, `BTCUSDT.BINANCE` (spot), `BTCUSD-20251226.OKX`
/// (dated future). Two `InstrumentId`s are equal iff their symbol prefix,
/// suffix and exchange all match — this is the key the runtime uses to
/// guarantee "every symbol used resolves to exactly one market entry per
/// exchange" (spec §3 invariant).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct InstrumentId {
    pub symbol: String,
    pub suffix: SymbolSuffix,
    pub exchange: ExchangeId,
}

impl InstrumentId {
    pub fn spot(symbol: impl Into<String>, exchange: ExchangeId) -> Self {
        Self {
            symbol: symbol.into(),
            suffix: SymbolSuffix::Spot,
            exchange,
        }
    }

    pub fn perpetual(symbol: impl Into<String>, exchange: ExchangeId) -> Self {
        Self {
            symbol: symbol.into(),
            suffix: SymbolSuffix::Perpetual,
            exchange,
        }
    }

    pub fn dated_future(symbol: impl Into<String>, exchange: ExchangeId, expiry: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            suffix: SymbolSuffix::Dated(expiry),
            exchange,
        }
    }

    pub fn is_spot(&self) -> bool {
        matches!(self.suffix, SymbolSuffix::Spot)
    }
}

impl Display for InstrumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}", self.symbol, self.suffix, self.exchange)
    }
}

impl FromStr for InstrumentId {
    type Err = InstrumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (body, exchange_tag) = s
            .rsplit_once('.')
            .ok_or_else(|| InstrumentError::MissingExchangeTag(s.to_string()))?;
        let exchange = exchange_tag.parse()?;

        if body.is_empty() {
            return Err(InstrumentError::EmptySymbol(s.to_string()));
        }

        let (symbol, suffix) = match body.rsplit_once('-') {
            None => (body, SymbolSuffix::Spot),
            Some((symbol, "PERP")) => (symbol, SymbolSuffix::Perpetual),
            Some((symbol, date_part)) if date_part.len() == 8 && date_part.bytes().all(|b| b.is_ascii_digit()) => {
                let expiry = NaiveDate::parse_from_str(date_part, "%Y%m%d")
                    .map_err(|_| InstrumentError::MalformedExpiry(date_part.to_string()))?;
                (symbol, SymbolSuffix::Dated(expiry))
            }
            // A plain hyphen that isn't -PERP or -<date> is part of the symbol
            // itself (unusual, but some venues hyphenate option symbols) rather
            // than a suffix we understand; treat the whole body as spot.
            Some(_) => (body, SymbolSuffix::Spot),
        };

        if symbol.is_empty() {
            return Err(InstrumentError::EmptySymbol(s.to_string()));
        }

        Ok(InstrumentId {
            symbol: symbol.to_string(),
            suffix,
            exchange,
        })
    }
}

impl Serialize for InstrumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for InstrumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spot() {
        let id: InstrumentId = "BTCUSDT.BINANCE".parse().unwrap();
        assert_eq!(id.symbol, "BTCUSDT");
        assert_eq!(id.suffix, SymbolSuffix::Spot);
        assert_eq!(id.exchange, ExchangeId::Binance);
        assert!(id.is_spot());
    }

    #[test]
    fn parses_linear_perpetual() {
        let id: InstrumentId = "BTCUSDT-PERP.BINANCE".parse().unwrap();
        assert_eq!(id.symbol, "BTCUSDT");
        assert_eq!(id.suffix, SymbolSuffix::Perpetual);
    }

    #[test]
    fn parses_dated_future() {
        let id: InstrumentId = "BTCUSD-20251226.OKX".parse().unwrap();
        assert_eq!(id.symbol, "BTCUSD");
        assert_eq!(
            id.suffix,
            SymbolSuffix::Dated(NaiveDate::from_ymd_opt(2025, 12, 26).unwrap())
        );
    }

    #[test]
    fn display_round_trips() {
        for raw in ["BTCUSDT.BINANCE", "BTCUSDT-PERP.BYBIT", "BTCUSD-20251226.OKX"] {
            let id: InstrumentId = raw.parse().unwrap();
            assert_eq!(id.to_string(), raw);
        }
    }

    #[test]
    fn missing_exchange_tag_errors() {
        assert!(matches!(
            "BTCUSDT".parse::<InstrumentId>(),
            Err(InstrumentError::MissingExchangeTag(_))
        ));
    }

    #[test]
    fn malformed_expiry_errors() {
        // 8 digits but not a valid calendar date (month 13).
        assert!(matches!(
            "BTCUSD-20251399.OKX".parse::<InstrumentId>(),
            Err(InstrumentError::MalformedExpiry(_))
        ));
    }

    #[test]
    fn json_round_trip() {
        let id: InstrumentId = "BTCUSDT-PERP.BYBIT".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"BTCUSDT-PERP.BYBIT\"");
        let back: InstrumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
