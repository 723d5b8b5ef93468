use crate::balance::Balance;
use crate::connector::{AccountStateSink, PrivateConnector};
use crate::error::ExecutionError;
use crate::order::{Order, OrderStatus, OrderType, TimeInForce};
use crate::position::Position;
use async_trait::async_trait;
use gateway_instrument::{AccountType, AssetId, ExchangeId, InstrumentId, Side};
use gateway_integration::rest::{now_ms, RestClient, Signer, SigningInput, SigningOutput};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::hmac_hex;

#[derive(Debug, Clone)]
pub struct BinanceCredentials {
    pub api_key: String,
    pub api_secret: String,
}

/// Binance's signing convention: append `timestamp` to the query string
/// exactly as the caller ordered it, HMAC-SHA256 over that string with the
/// API secret, append the hex digest as `signature`, and carry the API key
/// in the `X-MBX-APIKEY` header.
pub struct BinanceSigner {
    credentials: BinanceCredentials,
}

impl Signer for BinanceSigner {
    fn sign(&self, input: SigningInput<'_>) -> SigningOutput {
        let mut query = input.query.to_vec();
        query.push(("timestamp".into(), input.timestamp_ms.to_string()));
        let qs: String = query.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
        let signature = hmac_hex(&self.credentials.api_secret, &qs);

        SigningOutput {
            headers: vec![("X-MBX-APIKEY".to_string(), self.credentials.api_key.clone())],
            extra_query: vec![("timestamp".to_string(), input.timestamp_ms.to_string()), ("signature".to_string(), signature)],
        }
    }
}

#[derive(Debug, Deserialize)]
struct BinanceOrderAck {
    #[serde(rename = "orderId")]
    order_id: u64,
    status: String,
}

#[derive(Debug, Deserialize)]
struct SpotBalanceEntry {
    asset: String,
    free: Decimal,
    locked: Decimal,
}

#[derive(Debug, Deserialize)]
struct SpotAccount {
    balances: Vec<SpotBalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct FuturesAssetBalance {
    asset: String,
    #[serde(rename = "availableBalance")]
    available_balance: Decimal,
    #[serde(rename = "walletBalance")]
    wallet_balance: Decimal,
}

#[derive(Debug, Deserialize)]
struct FuturesPositionEntry {
    symbol: String,
    #[serde(rename = "positionAmt")]
    position_amt: Decimal,
    #[serde(rename = "entryPrice")]
    entry_price: Decimal,
}

#[derive(Debug, Deserialize)]
struct FuturesAccount {
    assets: Vec<FuturesAssetBalance>,
    positions: Vec<FuturesPositionEntry>,
}

#[derive(Debug, Deserialize)]
struct PositionModeResponse {
    #[serde(rename = "dualSidePosition")]
    dual_side_position: bool,
}

pub struct BinanceConnector {
    account_type: AccountType,
    rest: RestClient<BinanceSigner>,
    sink: Arc<dyn AccountStateSink>,
}

impl BinanceConnector {
    pub fn new(
        account_type: AccountType,
        credentials: BinanceCredentials,
        rest_limiter: std::sync::Arc<gateway_integration::ratelimit::AsyncRateLimiter>,
        sink: Arc<dyn AccountStateSink>,
    ) -> Self {
        let rest = RestClient::new(
            account_type.base_url(),
            BinanceSigner { credentials },
            rest_limiter,
            gateway_integration::retry::RetryPolicy::default(),
        );
        Self { account_type, rest, sink }
    }

    fn order_path(&self) -> &'static str {
        match self.account_type {
            AccountType::BinanceSpot | AccountType::BinanceSpotTestnet => "/api/v3/order",
            AccountType::BinanceLinear | AccountType::BinanceLinearTestnet => "/fapi/v1/order",
            AccountType::BinanceInverse | AccountType::BinanceInverseTestnet => "/dapi/v1/order",
            _ => "/api/v3/order",
        }
    }

    fn account_path(&self) -> &'static str {
        match self.account_type {
            AccountType::BinanceSpot | AccountType::BinanceSpotTestnet => "/api/v3/account",
            AccountType::BinanceLinear | AccountType::BinanceLinearTestnet => "/fapi/v2/account",
            AccountType::BinanceInverse | AccountType::BinanceInverseTestnet => "/dapi/v1/account",
            _ => "/api/v3/account",
        }
    }

    /// `None` for spot, which has no concept of position mode.
    fn position_mode_path(&self) -> Option<&'static str> {
        match self.account_type {
            AccountType::BinanceLinear | AccountType::BinanceLinearTestnet => Some("/fapi/v1/positionSide/dual"),
            AccountType::BinanceInverse | AccountType::BinanceInverseTestnet => Some("/dapi/v1/positionSide/dual"),
            _ => None,
        }
    }

    /// Spec §4.K point 2: verify one-way (net) position mode; Binance
    /// reports this as `dualSidePosition` on futures accounts only.
    async fn check_position_mode(&self) -> Result<(), ExecutionError> {
        let Some(path) = self.position_mode_path() else {
            return Ok(());
        };
        let response: PositionModeResponse = self.rest.request(reqwest::Method::GET, path, &[], None, true, "/account").await?;
        if response.dual_side_position {
            return Err(ExecutionError::PositionMode);
        }
        Ok(())
    }

    /// Spec §4.K point 1: fetch balances (and positions, for futures
    /// account types) via REST and apply them to the Cache through the
    /// `AccountStateSink` handed to this connector at construction.
    async fn seed_account_state(&self) -> Result<(), ExecutionError> {
        match self.account_type {
            AccountType::BinanceSpot | AccountType::BinanceSpotTestnet => {
                let account: SpotAccount = self.rest.request(reqwest::Method::GET, self.account_path(), &[], None, true, "/account").await?;
                for entry in account.balances {
                    self.sink.apply_balance(self.account_type, Balance { asset: AssetId::from(entry.asset), free: entry.free, locked: entry.locked });
                }
            }
            _ => {
                let account: FuturesAccount = self.rest.request(reqwest::Method::GET, self.account_path(), &[], None, true, "/account").await?;
                for asset in account.assets {
                    let locked = asset.wallet_balance - asset.available_balance;
                    self.sink.apply_balance(self.account_type, Balance { asset: AssetId::from(asset.asset), free: asset.available_balance, locked });
                }
                for position in account.positions {
                    if position.position_amt.is_zero() {
                        continue;
                    }
                    let symbol = InstrumentId::perpetual(position.symbol, ExchangeId::Binance);
                    self.sink.apply_position(ExchangeId::Binance, Position::new(symbol, ExchangeId::Binance, position.position_amt, position.entry_price));
                }
            }
        }
        Ok(())
    }
}

fn binance_side(side: Side) -> &'static str {
    match side {
        Side::Buy => "BUY",
        Side::Sell => "SELL",
    }
}

fn binance_type(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Limit | OrderType::PostOnly => "LIMIT",
        OrderType::Market => "MARKET",
        OrderType::StopLimit => "STOP",
        OrderType::StopMarket => "STOP_MARKET",
    }
}

fn binance_tif(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::Gtc => "GTC",
        TimeInForce::Ioc => "IOC",
        TimeInForce::Fok => "FOK",
        TimeInForce::Alo => "GTX",
    }
}

#[async_trait]
impl PrivateConnector for BinanceConnector {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Binance
    }

    fn account_type(&self) -> AccountType {
        self.account_type
    }

    async fn connect(&self) -> Result<(), ExecutionError> {
        self.check_position_mode().await?;
        self.seed_account_state().await?;
        info!(account_type = ?self.account_type, "binance connector seeded balances/positions and verified position mode");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn submit_order(&self, order: &Order) -> Result<String, ExecutionError> {
        let mut query = vec![
            ("symbol".to_string(), order.symbol.symbol.clone()),
            ("side".to_string(), binance_side(order.side).to_string()),
            ("type".to_string(), binance_type(order.order_type).to_string()),
            ("quantity".to_string(), order.amount.to_string()),
            ("newClientOrderId".to_string(), order.oid.clone()),
        ];
        if order.order_type != OrderType::Market {
            query.push(("timeInForce".to_string(), binance_tif(order.time_in_force).to_string()));
        }
        if let Some(price) = order.price {
            query.push(("price".to_string(), price.to_string()));
        }
        if order.reduce_only {
            query.push(("reduceOnly".to_string(), "true".to_string()));
        }

        let ack: BinanceOrderAck = self
            .rest
            .request(reqwest::Method::POST, self.order_path(), &query, None, true, "/trade")
            .await?;
        Ok(ack.order_id.to_string())
    }

    async fn submit_batch(&self, orders: &[Order]) -> Result<Vec<Result<String, ExecutionError>>, ExecutionError> {
        let mut out = Vec::with_capacity(orders.len());
        for order in orders {
            out.push(self.submit_order(order).await);
        }
        Ok(out)
    }

    async fn modify_order(
        &self,
        oid: &str,
        symbol: &InstrumentId,
        price: Option<Decimal>,
        amount: Option<Decimal>,
    ) -> Result<(), ExecutionError> {
        let mut query = vec![("symbol".to_string(), symbol.symbol.clone()), ("origClientOrderId".to_string(), oid.to_string())];
        if let Some(price) = price {
            query.push(("price".to_string(), price.to_string()));
        }
        if let Some(amount) = amount {
            query.push(("quantity".to_string(), amount.to_string()));
        }
        let _ack: BinanceOrderAck = self
            .rest
            .request(reqwest::Method::PUT, self.order_path(), &query, None, true, "/trade")
            .await?;
        Ok(())
    }

    async fn cancel_order(&self, oid: &str, symbol: &InstrumentId) -> Result<(), ExecutionError> {
        let query = vec![("symbol".to_string(), symbol.symbol.clone()), ("origClientOrderId".to_string(), oid.to_string())];
        let _ack: BinanceOrderAck = self
            .rest
            .request(reqwest::Method::DELETE, self.order_path(), &query, None, true, "/trade")
            .await?;
        Ok(())
    }

    async fn cancel_all_orders(&self, symbol: Option<&InstrumentId>) -> Result<(), ExecutionError> {
        let mut query = Vec::new();
        if let Some(symbol) = symbol {
            query.push(("symbol".to_string(), symbol.symbol.clone()));
        }
        let path = match self.account_type {
            AccountType::BinanceSpot | AccountType::BinanceSpotTestnet => "/api/v3/openOrders",
            AccountType::BinanceLinear | AccountType::BinanceLinearTestnet => "/fapi/v1/allOpenOrders",
            _ => "/api/v3/openOrders",
        };
        let _ack: serde_json::Value = self.rest.request(reqwest::Method::DELETE, path, &query, None, true, "/trade").await?;
        Ok(())
    }
}

/// Maps Binance's own status strings onto the canonical graph (spec §4.L).
/// Used by the `PrivateConnector`'s WS decode path to build an
/// [`crate::oms::OrderEvent`].
pub fn map_status(binance_status: &str) -> Option<OrderStatus> {
    match binance_status {
        "NEW" => Some(OrderStatus::Accepted),
        "PARTIALLY_FILLED" => Some(OrderStatus::PartiallyFilled),
        "FILLED" => Some(OrderStatus::Filled),
        "CANCELED" | "PENDING_CANCEL" => Some(OrderStatus::Canceled),
        "REJECTED" => Some(OrderStatus::Failed),
        "EXPIRED" => Some(OrderStatus::Expired),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_statuses() {
        assert_eq!(map_status("NEW"), Some(OrderStatus::Accepted));
        assert_eq!(map_status("FILLED"), Some(OrderStatus::Filled));
        assert_eq!(map_status("BOGUS"), None);
    }

    #[test]
    fn signer_appends_timestamp_and_signature() {
        let signer = BinanceSigner { credentials: BinanceCredentials { api_key: "key".into(), api_secret: "secret".into() } };
        let output = signer.sign(SigningInput { method: &reqwest::Method::POST, path: "/api/v3/order", query: &[], body: None, timestamp_ms: now_ms() });
        assert!(output.extra_query.iter().any(|(k, _)| k == "signature"));
        assert_eq!(output.headers, vec![("X-MBX-APIKEY".to_string(), "key".to_string())]);
    }
}
