use gateway_instrument::{ExchangeId, InstrumentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::subscription::Interval;

/// Common envelope carried by every canonical market-data event (spec §3
/// "All carry `(exchange, symbol)`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMeta {
    pub exchange: ExchangeId,
    pub ts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookL1 {
    pub meta: MarketMeta,
    pub symbol: InstrumentId,
    pub bid: Decimal,
    pub bid_size: Decimal,
    pub ask: Decimal,
    pub ask_size: Decimal,
}

impl BookL1 {
    pub fn mid_price(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookL2 {
    pub meta: MarketMeta,
    pub symbol: InstrumentId,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub meta: MarketMeta,
    pub symbol: InstrumentId,
    pub price: Decimal,
    pub size: Decimal,
    pub side: TradeSide,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kline {
    pub meta: MarketMeta,
    pub symbol: InstrumentId,
    pub interval: Interval,
    pub start: u64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// Whether this candle has closed (`false` for the still-forming
    /// latest bar some venues stream live).
    pub confirm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRate {
    pub meta: MarketMeta,
    pub symbol: InstrumentId,
    pub rate: Decimal,
    pub next_funding_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPrice {
    pub meta: MarketMeta,
    pub symbol: InstrumentId,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkPrice {
    pub meta: MarketMeta,
    pub symbol: InstrumentId,
    pub price: Decimal,
}

/// Union of every canonical market-data event kind, used where a single
/// channel carries mixed events (e.g. the Cache's `last_market_data`
/// write path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    BookL1(BookL1),
    BookL2(BookL2),
    Trade(Trade),
    Kline(Kline),
    FundingRate(FundingRate),
    IndexPrice(IndexPrice),
    MarkPrice(MarkPrice),
}

impl MarketEvent {
    pub fn symbol(&self) -> &InstrumentId {
        match self {
            MarketEvent::BookL1(e) => &e.symbol,
            MarketEvent::BookL2(e) => &e.symbol,
            MarketEvent::Trade(e) => &e.symbol,
            MarketEvent::Kline(e) => &e.symbol,
            MarketEvent::FundingRate(e) => &e.symbol,
            MarketEvent::IndexPrice(e) => &e.symbol,
            MarketEvent::MarkPrice(e) => &e.symbol,
        }
    }

    pub fn topic(&self) -> &'static str {
        match self {
            MarketEvent::BookL1(_) => "bookl1",
            MarketEvent::BookL2(_) => "bookl2",
            MarketEvent::Trade(_) => "trade",
            MarketEvent::Kline(_) => "kline",
            MarketEvent::FundingRate(_) => "funding_rate",
            MarketEvent::IndexPrice(_) => "index_price",
            MarketEvent::MarkPrice(_) => "mark_price",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mid_price_averages_bid_ask() {
        let book = BookL1 {
            meta: MarketMeta { exchange: ExchangeId::Binance, ts: 0 },
            symbol: InstrumentId::spot("BTCUSDT", ExchangeId::Binance),
            bid: dec!(100),
            bid_size: dec!(1),
            ask: dec!(102),
            ask_size: dec!(1),
        };
        assert_eq!(book.mid_price(), dec!(101));
    }
}
