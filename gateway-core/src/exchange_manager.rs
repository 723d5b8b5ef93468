//! Loads and holds the immutable `Market` set for one exchange (spec §3
//! "Markets are loaded once by an ExchangeManager and are immutably
//! shared", spec §4.N step 2).

use gateway_execution::ems::{AccountTypePolicy, MarketResolver};
use gateway_instrument::{AccountType, ExchangeId, InstrumentId, Market};
use std::collections::HashMap;
use tracing::warn;

/// Fetches the market set for one exchange from that venue's REST API.
/// Implemented per venue by the connector crate; `ExchangeManager` only
/// orchestrates the load and caches the result.
#[async_trait::async_trait]
pub trait MarketLoader: Send + Sync {
    async fn load_markets(&self) -> Result<Vec<Market>, crate::error::GatewayError>;
}

/// Immutable, process-lifetime market catalogue for one exchange. Built
/// once at boot via [`MarketLoader::load_markets`] and never mutated
/// afterwards — callers needing a fresher view reload via a new
/// `ExchangeManager`, they do not mutate this one (spec §3: "Immutable
/// after load").
pub struct ExchangeManager {
    exchange: ExchangeId,
    markets: HashMap<String, Market>,
}

impl ExchangeManager {
    pub async fn load(exchange: ExchangeId, loader: &dyn MarketLoader) -> Result<Self, crate::error::GatewayError> {
        let markets = loader.load_markets().await?;
        let mut by_symbol = HashMap::with_capacity(markets.len());
        for market in markets {
            by_symbol.insert(market.symbol().to_string(), market);
        }
        Ok(Self { exchange, markets: by_symbol })
    }

    /// Constructs a manager directly from a pre-built catalogue, bypassing
    /// `MarketLoader` — used for the mock exchange and for tests where the
    /// market set is fixed in advance.
    pub fn from_markets(exchange: ExchangeId, markets: Vec<Market>) -> Self {
        let by_symbol = markets.into_iter().map(|m| (m.symbol().to_string(), m)).collect();
        Self { exchange, markets: by_symbol }
    }

    pub fn exchange(&self) -> ExchangeId {
        self.exchange
    }

    pub fn market(&self, symbol: &str) -> Option<&Market> {
        self.markets.get(symbol)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }
}

impl MarketResolver for ExchangeManager {
    fn resolve(&self, symbol: &InstrumentId) -> Option<Market> {
        if symbol.exchange != self.exchange {
            return None;
        }
        self.markets.get(&symbol.symbol).cloned()
    }
}

/// Default account-type selection: linear/inverse/option markets route to
/// that market's default trading account, spot routes to spot (spec §4.M
/// point 4). Venues with a single account type per market kind need
/// nothing fancier than this; a venue needing unified-margin preference
/// (e.g. routing linear through Bybit's Unified account when enabled)
/// supplies its own `AccountTypePolicy`.
pub struct DefaultAccountTypePolicy {
    exchange: ExchangeId,
}

impl DefaultAccountTypePolicy {
    pub fn new(exchange: ExchangeId) -> Self {
        Self { exchange }
    }
}

impl AccountTypePolicy for DefaultAccountTypePolicy {
    fn resolve(&self, market: &Market) -> AccountType {
        let account = match (self.exchange, market) {
            (ExchangeId::Binance, Market::Spot(_)) => AccountType::BinanceSpot,
            (ExchangeId::Binance, Market::Linear(_)) => AccountType::BinanceLinear,
            (ExchangeId::Binance, Market::Inverse(_)) => AccountType::BinanceInverse,
            (ExchangeId::Bybit, Market::Spot(_)) => AccountType::BybitSpot,
            (ExchangeId::Bybit, Market::Linear(_)) => AccountType::BybitLinear,
            (ExchangeId::Bybit, Market::Inverse(_)) => AccountType::BybitInverse,
            (ExchangeId::Okx, Market::Spot(_)) => AccountType::OkxSpot,
            (ExchangeId::Okx, Market::Linear(_)) => AccountType::OkxLinear,
            (ExchangeId::Okx, Market::Inverse(_)) => AccountType::OkxInverse,
            (ExchangeId::Hyperliquid, _) => AccountType::HyperliquidLinear,
            (ExchangeId::Kucoin, Market::Spot(_)) => AccountType::KucoinSpot,
            (ExchangeId::Kucoin, Market::Linear(_)) => AccountType::KucoinLinear,
            (ExchangeId::Kucoin, Market::Inverse(_)) => AccountType::KucoinInverse,
            (ExchangeId::Bitget, Market::Spot(_)) => AccountType::BitgetSpot,
            (ExchangeId::Bitget, Market::Linear(_)) => AccountType::BitgetLinear,
            (ExchangeId::Bitget, Market::Inverse(_)) => AccountType::BitgetInverse,
            (ExchangeId::Mock, _) => AccountType::Mock,
            (exchange, Market::Option(_)) => {
                warn!(%exchange, "no dedicated option account type, falling back to linear");
                self.linear_fallback()
            }
        };
        account
    }
}

impl DefaultAccountTypePolicy {
    fn linear_fallback(&self) -> AccountType {
        match self.exchange {
            ExchangeId::Binance => AccountType::BinanceLinear,
            ExchangeId::Bybit => AccountType::BybitLinear,
            ExchangeId::Okx => AccountType::OkxLinear,
            ExchangeId::Hyperliquid => AccountType::HyperliquidLinear,
            ExchangeId::Kucoin => AccountType::KucoinLinear,
            ExchangeId::Bitget => AccountType::BitgetLinear,
            ExchangeId::Mock => AccountType::Mock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_instrument::asset::AssetId;
    use gateway_instrument::market::SpotMarket;
    use rust_decimal_macros::dec;

    fn btc_spot() -> Market {
        Market::Spot(SpotMarket::new(
            "BTCUSDT".to_string(),
            AssetId::from("BTC"),
            AssetId::from("USDT"),
            dec!(0.1),
            dec!(0.001),
            dec!(0.001),
            dec!(10),
        ))
    }

    #[test]
    fn resolve_returns_none_for_foreign_exchange() {
        let manager = ExchangeManager::from_markets(ExchangeId::Binance, vec![btc_spot()]);
        let symbol = InstrumentId::spot("BTCUSDT", ExchangeId::Bybit);
        assert!(manager.resolve(&symbol).is_none());
    }

    #[test]
    fn resolve_finds_loaded_market() {
        let manager = ExchangeManager::from_markets(ExchangeId::Binance, vec![btc_spot()]);
        let symbol = InstrumentId::spot("BTCUSDT", ExchangeId::Binance);
        assert!(manager.resolve(&symbol).is_some());
    }

    #[test]
    fn default_policy_routes_spot_and_linear() {
        let policy = DefaultAccountTypePolicy::new(ExchangeId::Binance);
        assert_eq!(policy.resolve(&btc_spot()), AccountType::BinanceSpot);
    }
}
