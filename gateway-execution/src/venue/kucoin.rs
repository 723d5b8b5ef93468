use crate::connector::PrivateConnector;
use crate::error::ExecutionError;
use crate::order::{Order, OrderStatus, OrderType, TimeInForce};
use async_trait::async_trait;
use gateway_instrument::{AccountType, ExchangeId, InstrumentId, Side};
use gateway_integration::rest::{RestClient, Signer, SigningInput, SigningOutput};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::hmac_hex;

#[derive(Debug, Clone)]
pub struct KucoinCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
    /// KuCoin additionally HMACs the passphrase itself ("KC-API-KEY-VERSION: 2").
    pub passphrase_is_signed: bool,
}

/// KuCoin signs `timestamp + method + path + body`, HMAC-SHA256,
/// base64-encoded, in `KC-API-SIGN`; the passphrase is sent either in the
/// clear (v1) or itself HMAC'd with the secret (v2).
pub struct KucoinSigner {
    credentials: KucoinCredentials,
}

impl Signer for KucoinSigner {
    fn sign(&self, input: SigningInput<'_>) -> SigningOutput {
        use base64::Engine;

        let body = input.body.unwrap_or_default();
        let prehash = format!("{}{}{}{body}", input.timestamp_ms, input.method.as_str(), input.path);
        let signature = base64::engine::general_purpose::STANDARD.encode(hex_to_bytes(&hmac_hex(&self.credentials.api_secret, &prehash)));

        let passphrase = if self.credentials.passphrase_is_signed {
            base64::engine::general_purpose::STANDARD.encode(hex_to_bytes(&hmac_hex(&self.credentials.api_secret, &self.credentials.passphrase)))
        } else {
            self.credentials.passphrase.clone()
        };

        SigningOutput {
            headers: vec![
                ("KC-API-KEY".to_string(), self.credentials.api_key.clone()),
                ("KC-API-SIGN".to_string(), signature),
                ("KC-API-TIMESTAMP".to_string(), input.timestamp_ms.to_string()),
                ("KC-API-PASSPHRASE".to_string(), passphrase),
                ("KC-API-KEY-VERSION".to_string(), if self.credentials.passphrase_is_signed { "2" } else { "1" }.to_string()),
            ],
            extra_query: Vec::new(),
        }
    }
}

fn hex_to_bytes(hex_str: &str) -> Vec<u8> {
    hex::decode(hex_str).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct KucoinAck {
    code: String,
    msg: Option<String>,
    data: Option<KucoinAckData>,
}

#[derive(Debug, Deserialize)]
struct KucoinAckData {
    #[serde(rename = "orderId")]
    order_id: String,
}

pub struct KucoinConnector {
    account_type: AccountType,
    rest: RestClient<KucoinSigner>,
}

impl KucoinConnector {
    pub fn new(account_type: AccountType, credentials: KucoinCredentials, rest_limiter: std::sync::Arc<gateway_integration::ratelimit::AsyncRateLimiter>) -> Self {
        let rest = RestClient::new(account_type.base_url(), KucoinSigner { credentials }, rest_limiter, gateway_integration::retry::RetryPolicy::default());
        Self { account_type, rest }
    }

    fn order_path(&self) -> &'static str {
        match self.account_type {
            AccountType::KucoinSpot => "/api/v1/orders",
            _ => "/api/v1/orders",
        }
    }
}

fn kucoin_side(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    }
}

fn kucoin_type(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market | OrderType::StopMarket => "market",
        _ => "limit",
    }
}

fn kucoin_tif(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::Gtc => "GTC",
        TimeInForce::Ioc => "IOC",
        TimeInForce::Fok => "FOK",
        TimeInForce::Alo => "GTC",
    }
}

fn ack_to_eid(ack: KucoinAck) -> Result<String, ExecutionError> {
    if ack.code != "200000" {
        return Err(ExecutionError::Venue(gateway_integration::rest::VenueError {
            status: 200,
            code: Some(ack.code),
            message: ack.msg.unwrap_or_default(),
            payload: String::new(),
        }));
    }
    ack.data.map(|d| d.order_id).ok_or_else(|| {
        ExecutionError::Venue(gateway_integration::rest::VenueError { status: 200, code: None, message: "missing data".into(), payload: String::new() })
    })
}

#[async_trait]
impl PrivateConnector for KucoinConnector {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Kucoin
    }

    fn account_type(&self) -> AccountType {
        self.account_type
    }

    async fn connect(&self) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn submit_order(&self, order: &Order) -> Result<String, ExecutionError> {
        let body = serde_json::json!({
            "clientOid": order.oid,
            "symbol": order.symbol.symbol,
            "side": kucoin_side(order.side),
            "type": kucoin_type(order.order_type),
            "size": order.amount.to_string(),
            "price": order.price.map(|p| p.to_string()),
            "timeInForce": kucoin_tif(order.time_in_force),
            "reduceOnly": order.reduce_only,
        })
        .to_string();
        let ack: KucoinAck = self.rest.request(reqwest::Method::POST, self.order_path(), &[], Some(&body), true, "/orders").await?;
        ack_to_eid(ack)
    }

    async fn submit_batch(&self, orders: &[Order]) -> Result<Vec<Result<String, ExecutionError>>, ExecutionError> {
        let mut out = Vec::with_capacity(orders.len());
        for order in orders {
            out.push(self.submit_order(order).await);
        }
        Ok(out)
    }

    async fn modify_order(&self, oid: &str, symbol: &InstrumentId, price: Option<Decimal>, amount: Option<Decimal>) -> Result<(), ExecutionError> {
        // KuCoin has no in-place amend; emulate by cancel + resubmit.
        self.cancel_order(oid, symbol).await?;
        let mut order = Order::new_pending(oid, self.exchange(), self.account_type, symbol.clone(), Side::Buy, OrderType::Limit, amount.unwrap_or_default(), price, TimeInForce::Gtc, false, 0);
        order.price = price;
        self.submit_order(&order).await.map(|_| ())
    }

    async fn cancel_order(&self, oid: &str, _symbol: &InstrumentId) -> Result<(), ExecutionError> {
        let path = format!("/api/v1/order/client-order/{oid}");
        let ack: KucoinAck = self.rest.request(reqwest::Method::DELETE, &path, &[], None, true, "/orders").await?;
        ack_to_eid(ack).map(|_| ())
    }

    async fn cancel_all_orders(&self, symbol: Option<&InstrumentId>) -> Result<(), ExecutionError> {
        let query = symbol.map(|s| vec![("symbol".to_string(), s.symbol.clone())]).unwrap_or_default();
        let _ack: serde_json::Value = self.rest.request(reqwest::Method::DELETE, "/api/v1/orders", &query, None, true, "/orders").await?;
        Ok(())
    }
}

/// Maps KuCoin's own status strings onto the canonical graph (spec §4.L).
pub fn map_status(kucoin_status: &str) -> Option<OrderStatus> {
    match kucoin_status {
        "open" | "new" => Some(OrderStatus::Accepted),
        "match" => Some(OrderStatus::PartiallyFilled),
        "done" => Some(OrderStatus::Filled),
        "cancel" => Some(OrderStatus::Canceled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_statuses() {
        assert_eq!(map_status("open"), Some(OrderStatus::Accepted));
        assert_eq!(map_status("done"), Some(OrderStatus::Filled));
        assert_eq!(map_status("???"), None);
    }

    #[test]
    fn signer_v2_hmacs_the_passphrase() {
        let signer = KucoinSigner {
            credentials: KucoinCredentials { api_key: "key".into(), api_secret: "secret".into(), passphrase: "pass".into(), passphrase_is_signed: true },
        };
        let output = signer.sign(SigningInput { method: &reqwest::Method::POST, path: "/api/v1/orders", query: &[], body: Some("{}"), timestamp_ms: 1 });
        let passphrase = output.headers.iter().find(|(k, _)| k == "KC-API-PASSPHRASE").unwrap().1.clone();
        assert_ne!(passphrase, "pass");
    }
}
