use gateway_instrument::InstrumentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kline bucket width. Venue adapters map these to their own string
/// encodings (e.g. Binance's `"1m"`/`"4h"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    OneMinute,
    ThreeMinutes,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    FourHours,
    OneDay,
}

impl Interval {
    pub fn as_seconds(&self) -> u64 {
        match self {
            Interval::OneMinute => 60,
            Interval::ThreeMinutes => 180,
            Interval::FiveMinutes => 300,
            Interval::FifteenMinutes => 900,
            Interval::ThirtyMinutes => 1_800,
            Interval::OneHour => 3_600,
            Interval::FourHours => 14_400,
            Interval::OneDay => 86_400,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Interval::OneMinute => "1m",
            Interval::ThreeMinutes => "3m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::FourHours => "4h",
            Interval::OneDay => "1d",
        };
        f.write_str(s)
    }
}

/// The kind half of a subscription key (spec §3 "Subscription key":
/// `(topic_kind, symbol_id[, interval|depth|tif])`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubKind {
    Trade,
    BookL1,
    BookL2 { depth: u32 },
    Kline(Interval),
    FundingRate,
    MarkPrice,
    IndexPrice,
}

impl SubKind {
    pub fn topic(&self) -> &'static str {
        match self {
            SubKind::Trade => "trade",
            SubKind::BookL1 => "bookl1",
            SubKind::BookL2 { .. } => "bookl2",
            SubKind::Kline(_) => "kline",
            SubKind::FundingRate => "funding_rate",
            SubKind::MarkPrice => "mark_price",
            SubKind::IndexPrice => "index_price",
        }
    }
}

/// A single `(topic_kind, symbol_id)` subscription, as tracked by the
/// `PublicConnector` and replayed by the `WsClient` after reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    pub symbol: InstrumentId,
    pub kind: SubKind,
}

impl Subscription {
    pub fn new(symbol: InstrumentId, kind: SubKind) -> Self {
        Self { symbol, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_round_trips_through_display() {
        assert_eq!(Interval::OneHour.to_string(), "1h");
        assert_eq!(Interval::OneHour.as_seconds(), 3_600);
    }
}
