use crate::connector::PrivateConnector;
use crate::error::ExecutionError;
use crate::order::{Order, OrderStatus, OrderType, TimeInForce};
use async_trait::async_trait;
use gateway_instrument::{AccountType, ExchangeId, InstrumentId, Side};
use gateway_integration::rest::{RestClient, Signer, SigningInput, SigningOutput};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct BitgetCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

/// Bitget signs `timestamp + method + path + body`, HMAC-SHA256,
/// base64-encoded, in `ACCESS-SIGN` (same shape as OKX, which Bitget's API
/// was modelled after).
pub struct BitgetSigner {
    credentials: BitgetCredentials,
}

impl Signer for BitgetSigner {
    fn sign(&self, input: SigningInput<'_>) -> SigningOutput {
        use base64::Engine;
        use hmac::Mac;

        let body = input.body.unwrap_or_default();
        let prehash = format!("{}{}{}{body}", input.timestamp_ms, input.method.as_str(), input.path);
        let mut mac = <super::HmacSha256 as Mac>::new_from_slice(self.credentials.api_secret.as_bytes()).expect("hmac accepts any key length");
        mac.update(prehash.as_bytes());
        let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        SigningOutput {
            headers: vec![
                ("ACCESS-KEY".to_string(), self.credentials.api_key.clone()),
                ("ACCESS-SIGN".to_string(), signature),
                ("ACCESS-TIMESTAMP".to_string(), input.timestamp_ms.to_string()),
                ("ACCESS-PASSPHRASE".to_string(), self.credentials.passphrase.clone()),
            ],
            extra_query: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BitgetAck {
    code: String,
    msg: String,
    data: Option<BitgetAckData>,
}

#[derive(Debug, Deserialize)]
struct BitgetAckData {
    #[serde(rename = "orderId")]
    order_id: String,
}

pub struct BitgetConnector {
    account_type: AccountType,
    rest: RestClient<BitgetSigner>,
}

impl BitgetConnector {
    pub fn new(account_type: AccountType, credentials: BitgetCredentials, rest_limiter: std::sync::Arc<gateway_integration::ratelimit::AsyncRateLimiter>) -> Self {
        let rest = RestClient::new(account_type.base_url(), BitgetSigner { credentials }, rest_limiter, gateway_integration::retry::RetryPolicy::default());
        Self { account_type, rest }
    }

    fn product_path(&self) -> &'static str {
        match self.account_type {
            AccountType::BitgetSpot => "/api/v2/spot/trade/place-order",
            _ => "/api/v2/mix/order/place-order",
        }
    }
}

fn bitget_side(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    }
}

fn bitget_type(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market | OrderType::StopMarket => "market",
        _ => "limit",
    }
}

fn bitget_tif(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::Gtc => "normal",
        TimeInForce::Ioc => "ioc",
        TimeInForce::Fok => "fok",
        TimeInForce::Alo => "post_only",
    }
}

fn ack_to_eid(ack: BitgetAck) -> Result<String, ExecutionError> {
    if ack.code != "00000" {
        return Err(ExecutionError::Venue(gateway_integration::rest::VenueError {
            status: 200,
            code: Some(ack.code),
            message: ack.msg,
            payload: String::new(),
        }));
    }
    ack.data.map(|d| d.order_id).ok_or_else(|| {
        ExecutionError::Venue(gateway_integration::rest::VenueError { status: 200, code: None, message: "missing data".into(), payload: String::new() })
    })
}

#[async_trait]
impl PrivateConnector for BitgetConnector {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Bitget
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
            "symbol": order.symbol.symbol,
            "side": bitget_side(order.side),
            "orderType": bitget_type(order.order_type),
            "size": order.amount.to_string(),
            "price": order.price.map(|p| p.to_string()),
            "force": bitget_tif(order.time_in_force),
            "clientOid": order.oid,
            "reduceOnly": order.reduce_only,
        })
        .to_string();
        let ack: BitgetAck = self.rest.request(reqwest::Method::POST, self.product_path(), &[], Some(&body), true, "/order").await?;
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
        let body = serde_json::json!({
            "symbol": symbol.symbol,
            "clientOid": oid,
            "newPrice": price.map(|p| p.to_string()),
            "newSize": amount.map(|a| a.to_string()),
        })
        .to_string();
        let ack: BitgetAck = self.rest.request(reqwest::Method::POST, "/api/v2/mix/order/modify-order", &[], Some(&body), true, "/order").await?;
        ack_to_eid(ack).map(|_| ())
    }

    async fn cancel_order(&self, oid: &str, symbol: &InstrumentId) -> Result<(), ExecutionError> {
        let body = serde_json::json!({ "symbol": symbol.symbol, "clientOid": oid }).to_string();
        let ack: BitgetAck = self.rest.request(reqwest::Method::POST, "/api/v2/mix/order/cancel-order", &[], Some(&body), true, "/order").await?;
        ack_to_eid(ack).map(|_| ())
    }

    async fn cancel_all_orders(&self, symbol: Option<&InstrumentId>) -> Result<(), ExecutionError> {
        let body = serde_json::json!({ "symbol": symbol.map(|s| s.symbol.clone()) }).to_string();
        let _ack: serde_json::Value = self.rest.request(reqwest::Method::POST, "/api/v2/mix/order/cancel-all-orders", &[], Some(&body), true, "/order").await?;
        Ok(())
    }
}

/// Maps Bitget's own status strings onto the canonical graph (spec §4.L).
pub fn map_status(bitget_status: &str) -> Option<OrderStatus> {
    match bitget_status {
        "live" | "new" => Some(OrderStatus::Accepted),
        "partially_filled" => Some(OrderStatus::PartiallyFilled),
        "filled" | "full_fill" => Some(OrderStatus::Filled),
        "cancelled" | "canceled" => Some(OrderStatus::Canceled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_statuses() {
        assert_eq!(map_status("live"), Some(OrderStatus::Accepted));
        assert_eq!(map_status("full_fill"), Some(OrderStatus::Filled));
        assert_eq!(map_status("bogus"), None);
    }

    #[test]
    fn signer_emits_access_headers() {
        let signer = BitgetSigner { credentials: BitgetCredentials { api_key: "key".into(), api_secret: "secret".into(), passphrase: "pass".into() } };
        let output = signer.sign(SigningInput { method: &reqwest::Method::POST, path: "/api/v2/mix/order/place-order", query: &[], body: Some("{}"), timestamp_ms: 1 });
        assert!(output.headers.iter().any(|(k, _)| k == "ACCESS-SIGN"));
    }
}
