use crate::connector::PrivateConnector;
use crate::error::ExecutionError;
use crate::order::{Order, OrderStatus, OrderType, TimeInForce};
use async_trait::async_trait;
use gateway_instrument::{AccountType, ExchangeId, InstrumentId, Side};
use gateway_integration::rest::{RestClient, Signer, SigningInput, SigningOutput};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{canonical_query, hmac_hex};

#[derive(Debug, Clone)]
pub struct BybitCredentials {
    pub api_key: String,
    pub api_secret: String,
}

/// Bybit v5 signs `timestamp + api_key + recv_window + query_string` (GET)
/// or `+ body` (POST), HMAC-SHA256, carried in the `X-BAPI-SIGN` header
/// alongside `X-BAPI-API-KEY`/`X-BAPI-TIMESTAMP`/`X-BAPI-RECV-WINDOW`.
pub struct BybitSigner {
    credentials: BybitCredentials,
    recv_window_ms: u64,
}

impl Signer for BybitSigner {
    fn sign(&self, input: SigningInput<'_>) -> SigningOutput {
        let qs = canonical_query(input.query);
        let body = input.body.unwrap_or_default();
        let payload = format!("{}{}{}{}{}", input.timestamp_ms, self.credentials.api_key, self.recv_window_ms, qs, body);
        let signature = hmac_hex(&self.credentials.api_secret, &payload);

        SigningOutput {
            headers: vec![
                ("X-BAPI-API-KEY".to_string(), self.credentials.api_key.clone()),
                ("X-BAPI-TIMESTAMP".to_string(), input.timestamp_ms.to_string()),
                ("X-BAPI-RECV-WINDOW".to_string(), self.recv_window_ms.to_string()),
                ("X-BAPI-SIGN".to_string(), signature),
            ],
            extra_query: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BybitAck {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg")]
    ret_msg: String,
    result: BybitAckResult,
}

#[derive(Debug, Deserialize, Default)]
struct BybitAckResult {
    #[serde(rename = "orderId", default)]
    order_id: String,
}

pub struct BybitConnector {
    account_type: AccountType,
    rest: RestClient<BybitSigner>,
}

impl BybitConnector {
    pub fn new(
        account_type: AccountType,
        credentials: BybitCredentials,
        rest_limiter: std::sync::Arc<gateway_integration::ratelimit::AsyncRateLimiter>,
    ) -> Self {
        let rest = RestClient::new(
            account_type.base_url(),
            BybitSigner { credentials, recv_window_ms: 5000 },
            rest_limiter,
            gateway_integration::retry::RetryPolicy::default(),
        );
        Self { account_type, rest }
    }

    fn category(&self) -> &'static str {
        match self.account_type {
            AccountType::BybitSpot => "spot",
            AccountType::BybitLinear | AccountType::BybitUnified => "linear",
            AccountType::BybitInverse => "inverse",
            _ => "linear",
        }
    }
}

fn bybit_side(side: Side) -> &'static str {
    match side {
        Side::Buy => "Buy",
        Side::Sell => "Sell",
    }
}

fn bybit_type(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Limit | OrderType::PostOnly | OrderType::StopLimit => "Limit",
        OrderType::Market | OrderType::StopMarket => "Market",
    }
}

fn bybit_tif(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::Gtc => "GTC",
        TimeInForce::Ioc => "IOC",
        TimeInForce::Fok => "FOK",
        TimeInForce::Alo => "PostOnly",
    }
}

fn ack_to_eid(ack: BybitAck) -> Result<String, ExecutionError> {
    if ack.ret_code != 0 {
        return Err(ExecutionError::Venue(gateway_integration::rest::VenueError {
            status: 200,
            code: Some(ack.ret_code.to_string()),
            message: ack.ret_msg,
            payload: String::new(),
        }));
    }
    Ok(ack.result.order_id)
}

#[async_trait]
impl PrivateConnector for BybitConnector {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Bybit
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
            "category": self.category(),
            "symbol": order.symbol.symbol,
            "side": bybit_side(order.side),
            "orderType": bybit_type(order.order_type),
            "qty": order.amount.to_string(),
            "price": order.price.map(|p| p.to_string()),
            "timeInForce": bybit_tif(order.time_in_force),
            "orderLinkId": order.oid,
            "reduceOnly": order.reduce_only,
        });
        let body = body.to_string();
        let ack: BybitAck = self.rest.request(reqwest::Method::POST, "/v5/order/create", &[], Some(&body), true, "/order").await?;
        ack_to_eid(ack)
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
        let body = serde_json::json!({
            "category": self.category(),
            "symbol": symbol.symbol,
            "orderLinkId": oid,
            "price": price.map(|p| p.to_string()),
            "qty": amount.map(|a| a.to_string()),
        });
        let body = body.to_string();
        let ack: BybitAck = self.rest.request(reqwest::Method::POST, "/v5/order/amend", &[], Some(&body), true, "/order").await?;
        ack_to_eid(ack).map(|_| ())
    }

    async fn cancel_order(&self, oid: &str, symbol: &InstrumentId) -> Result<(), ExecutionError> {
        let body = serde_json::json!({ "category": self.category(), "symbol": symbol.symbol, "orderLinkId": oid }).to_string();
        let ack: BybitAck = self.rest.request(reqwest::Method::POST, "/v5/order/cancel", &[], Some(&body), true, "/order").await?;
        ack_to_eid(ack).map(|_| ())
    }

    async fn cancel_all_orders(&self, symbol: Option<&InstrumentId>) -> Result<(), ExecutionError> {
        let mut body = serde_json::json!({ "category": self.category() });
        if let Some(symbol) = symbol {
            body["symbol"] = serde_json::Value::String(symbol.symbol.clone());
        }
        let body = body.to_string();
        let _ack: serde_json::Value = self.rest.request(reqwest::Method::POST, "/v5/order/cancel-all", &[], Some(&body), true, "/order").await?;
        Ok(())
    }
}

/// Maps Bybit's own status strings onto the canonical graph (spec §4.L).
pub fn map_status(bybit_status: &str) -> Option<OrderStatus> {
    match bybit_status {
        "New" | "Untriggered" => Some(OrderStatus::Accepted),
        "PartiallyFilled" => Some(OrderStatus::PartiallyFilled),
        "Filled" => Some(OrderStatus::Filled),
        "Cancelled" | "PartiallyFilledCanceled" => Some(OrderStatus::Canceled),
        "Rejected" => Some(OrderStatus::Failed),
        "Deactivated" => Some(OrderStatus::Expired),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_statuses() {
        assert_eq!(map_status("New"), Some(OrderStatus::Accepted));
        assert_eq!(map_status("Filled"), Some(OrderStatus::Filled));
        assert_eq!(map_status("Whatever"), None);
    }

    #[test]
    fn signer_hashes_timestamp_key_and_window() {
        let signer = BybitSigner { credentials: BybitCredentials { api_key: "key".into(), api_secret: "secret".into() }, recv_window_ms: 5000 };
        let a = signer.sign(SigningInput { method: &reqwest::Method::POST, path: "/v5/order/create", query: &[], body: Some("{}"), timestamp_ms: 1 });
        let b = signer.sign(SigningInput { method: &reqwest::Method::POST, path: "/v5/order/create", query: &[], body: Some("{}"), timestamp_ms: 2 });
        let sig_a = a.headers.iter().find(|(k, _)| k == "X-BAPI-SIGN").unwrap().1.clone();
        let sig_b = b.headers.iter().find(|(k, _)| k == "X-BAPI-SIGN").unwrap().1.clone();
        assert_ne!(sig_a, sig_b);
    }
}
