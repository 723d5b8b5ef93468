use crate::exchange::ExchangeId;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Venue-specific account mode (spec §3 `AccountType`).
///
/// Each variant carries its own REST base URL and WS URL (`base_url`/
/// `ws_url`). Exactly one
/// `AccountType` backs a given `PrivateConnector`; a venue may have several
/// `PublicConnector`s open against different `AccountType`s simultaneously
/// (e.g. Binance spot market data alongside Binance linear market data).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum AccountType {
    BinanceSpot,
    BinanceSpotTestnet,
    BinanceLinear,
    BinanceLinearTestnet,
    BinanceInverse,
    BinanceInverseTestnet,
    BinancePortfolioMargin,

    BybitSpot,
    BybitLinear,
    BybitInverse,
    BybitUnified,
    BybitDemo,

    OkxSpot,
    OkxLinear,
    OkxInverse,
    OkxUnified,
    OkxDemo,

    HyperliquidLinear,
    HyperliquidTestnet,

    KucoinSpot,
    KucoinLinear,
    KucoinInverse,

    BitgetSpot,
    BitgetLinear,
    BitgetInverse,
    BitgetDemo,

    Mock,
}

impl AccountType {
    pub const fn exchange(&self) -> ExchangeId {
        use AccountType::*;
        match self {
            BinanceSpot | BinanceSpotTestnet | BinanceLinear | BinanceLinearTestnet
            | BinanceInverse | BinanceInverseTestnet | BinancePortfolioMargin => ExchangeId::Binance,
            BybitSpot | BybitLinear | BybitInverse | BybitUnified | BybitDemo => ExchangeId::Bybit,
            OkxSpot | OkxLinear | OkxInverse | OkxUnified | OkxDemo => ExchangeId::Okx,
            HyperliquidLinear | HyperliquidTestnet => ExchangeId::Hyperliquid,
            KucoinSpot | KucoinLinear | KucoinInverse => ExchangeId::Kucoin,
            BitgetSpot | BitgetLinear | BitgetInverse | BitgetDemo => ExchangeId::Bitget,
            Mock => ExchangeId::Mock,
        }
    }

    pub const fn is_testnet(&self) -> bool {
        use AccountType::*;
        matches!(
            self,
            BinanceSpotTestnet
                | BinanceLinearTestnet
                | BinanceInverseTestnet
                | BybitDemo
                | OkxDemo
                | HyperliquidTestnet
                | BitgetDemo
        )
    }

    /// REST base URL. `Mock` has no real endpoint; callers must not dial it.
    pub const fn base_url(&self) -> &'static str {
        use AccountType::*;
        match self {
            BinanceSpot | BinancePortfolioMargin => "https://api.binance.com",
            BinanceSpotTestnet => "https://testnet.binance.vision",
            BinanceLinear => "https://fapi.binance.com",
            BinanceLinearTestnet => "https://testnet.binancefuture.com",
            BinanceInverse => "https://dapi.binance.com",
            BinanceInverseTestnet => "https://testnet.binancefuture.com",

            BybitSpot | BybitLinear | BybitInverse | BybitUnified => "https://api.bybit.com",
            BybitDemo => "https://api-demo.bybit.com",

            OkxSpot | OkxLinear | OkxInverse | OkxUnified => "https://www.okx.com",
            OkxDemo => "https://www.okx.com",

            HyperliquidLinear => "https://api.hyperliquid.xyz",
            HyperliquidTestnet => "https://api.hyperliquid-testnet.xyz",

            KucoinSpot => "https://api.kucoin.com",
            KucoinLinear | KucoinInverse => "https://api-futures.kucoin.com",

            BitgetSpot | BitgetLinear | BitgetInverse | BitgetDemo => "https://api.bitget.com",

            Mock => "https://mock.invalid",
        }
    }

    /// WebSocket base URL for this account type's primary stream.
    pub const fn ws_url(&self) -> &'static str {
        use AccountType::*;
        match self {
            BinanceSpot => "wss://stream.binance.com:9443",
            BinanceSpotTestnet => "wss://testnet.binance.vision",
            BinanceLinear | BinancePortfolioMargin => "wss://fstream.binance.com",
            BinanceLinearTestnet => "wss://stream.binancefuture.com",
            BinanceInverse => "wss://dstream.binance.com",
            BinanceInverseTestnet => "wss://dstream.binancefuture.com",

            BybitSpot => "wss://stream.bybit.com/v5/public/spot",
            BybitLinear => "wss://stream.bybit.com/v5/public/linear",
            BybitInverse => "wss://stream.bybit.com/v5/public/inverse",
            BybitUnified => "wss://stream.bybit.com/v5/private",
            BybitDemo => "wss://stream-demo.bybit.com/v5/private",

            OkxSpot | OkxLinear | OkxInverse | OkxUnified | OkxDemo => "wss://ws.okx.com:8443/ws/v5/public",

            HyperliquidLinear => "wss://api.hyperliquid.xyz/ws",
            HyperliquidTestnet => "wss://api.hyperliquid-testnet.xyz/ws",

            KucoinSpot => "wss://ws-api-spot.kucoin.com",
            KucoinLinear | KucoinInverse => "wss://ws-api-futures.kucoin.com",

            BitgetSpot | BitgetLinear | BitgetInverse | BitgetDemo => "wss://ws.bitget.com/v2/ws/public",

            Mock => "wss://mock.invalid/ws",
        }
    }

    pub const fn is_spot(&self) -> bool {
        use AccountType::*;
        matches!(
            self,
            BinanceSpot | BinanceSpotTestnet | BybitSpot | OkxSpot | KucoinSpot | BitgetSpot
        )
    }

    pub const fn is_inverse(&self) -> bool {
        use AccountType::*;
        matches!(
            self,
            BinanceInverse | BinanceInverseTestnet | BybitInverse | OkxInverse | KucoinInverse | BitgetInverse
        )
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_mapping_is_consistent() {
        assert_eq!(AccountType::BinanceLinear.exchange(), ExchangeId::Binance);
        assert_eq!(AccountType::BybitInverse.exchange(), ExchangeId::Bybit);
        assert_eq!(AccountType::Mock.exchange(), ExchangeId::Mock);
    }

    #[test]
    fn testnet_flags() {
        assert!(AccountType::BinanceLinearTestnet.is_testnet());
        assert!(!AccountType::BinanceLinear.is_testnet());
        assert!(AccountType::BybitDemo.is_testnet());
    }

    #[test]
    fn spot_and_inverse_classification() {
        assert!(AccountType::KucoinSpot.is_spot());
        assert!(!AccountType::KucoinLinear.is_spot());
        assert!(AccountType::BybitInverse.is_inverse());
        assert!(!AccountType::BybitLinear.is_inverse());
    }
}
