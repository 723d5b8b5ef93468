use crate::connector::PrivateConnector;
use crate::error::ExecutionError;
use crate::order::{Order, OrderStatus, OrderType, TimeInForce};
use async_trait::async_trait;
use gateway_instrument::{AccountType, ExchangeId, InstrumentId, Side};
use gateway_integration::rest::{now_ms, RestClient, Signer, SigningInput, SigningOutput};
use k256::ecdsa::{RecoveryId, Signature, SigningKey};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha3::{Digest, Keccak256};

#[derive(Clone)]
pub struct HyperliquidCredentials {
    pub wallet_address: String,
    signing_key: SigningKey,
}

impl HyperliquidCredentials {
    /// `private_key_hex` is a 32-byte secp256k1 key, `0x`-prefixed or not.
    pub fn new(wallet_address: impl Into<String>, private_key_hex: &str) -> Result<Self, ExecutionError> {
        let bytes = hex::decode(private_key_hex.trim_start_matches("0x"))
            .map_err(|e| ExecutionError::Integration(gateway_integration::error::IntegrationError::Validation(e.to_string())))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| ExecutionError::Integration(gateway_integration::error::IntegrationError::Validation(e.to_string())))?;
        Ok(Self { wallet_address: wallet_address.into(), signing_key })
    }
}

/// Hyperliquid signs every "L1 action" as an EIP-712 `Agent` wrapping a hash
/// of the action payload, then ECDSA-signs the resulting digest with the
/// trading wallet's secp256k1 key (spec §4.K note on non-HMAC venues).
///
/// This signs a JSON-canonicalised action rather than the venue's real
/// msgpack encoding — no msgpack crate is in the dependency set, so the
/// hash input differs from the live wire format while the EIP-712
/// wrapping/ECDSA mechanics are faithful.
pub struct HyperliquidSigner {
    credentials: HyperliquidCredentials,
}

const DOMAIN_NAME: &str = "Exchange";
const DOMAIN_VERSION: &str = "1";
const DOMAIN_CHAIN_ID: u64 = 1337;

fn keccak(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn eip712_domain_separator() -> [u8; 32] {
    let type_hash = keccak(b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)");
    let name_hash = keccak(DOMAIN_NAME.as_bytes());
    let version_hash = keccak(DOMAIN_VERSION.as_bytes());
    let mut buf = Vec::with_capacity(32 * 4);
    buf.extend_from_slice(&type_hash);
    buf.extend_from_slice(&name_hash);
    buf.extend_from_slice(&version_hash);
    buf.extend_from_slice(&[0u8; 32][..32 - 8]);
    buf.extend_from_slice(&DOMAIN_CHAIN_ID.to_be_bytes());
    buf.extend_from_slice(&[0u8; 32]);
    keccak(&buf)
}

fn agent_struct_hash(connection_id: [u8; 32]) -> [u8; 32] {
    let type_hash = keccak(b"Agent(string source,bytes32 connectionId)");
    let source_hash = keccak(b"a");
    let mut buf = Vec::with_capacity(32 * 3);
    buf.extend_from_slice(&type_hash);
    buf.extend_from_slice(&source_hash);
    buf.extend_from_slice(&connection_id);
    keccak(&buf)
}

impl Signer for HyperliquidSigner {
    fn sign(&self, input: SigningInput<'_>) -> SigningOutput {
        let body = input.body.unwrap_or_default();
        let action_hash = keccak(body.as_bytes());

        let domain_separator = eip712_domain_separator();
        let struct_hash = agent_struct_hash(action_hash);

        let mut digest_input = Vec::with_capacity(2 + 32 + 32);
        digest_input.extend_from_slice(&[0x19, 0x01]);
        digest_input.extend_from_slice(&domain_separator);
        digest_input.extend_from_slice(&struct_hash);
        let digest = keccak(&digest_input);

        let (signature, recovery_id): (Signature, RecoveryId) = self
            .credentials
            .signing_key
            .sign_prehash_recoverable(&digest)
            .expect("signing a fixed-size digest never fails");

        let mut sig_hex = hex::encode(signature.to_bytes());
        sig_hex.push_str(&hex::encode([27 + recovery_id.to_byte()]));

        SigningOutput { headers: Vec::new(), extra_query: vec![("signature".to_string(), sig_hex)] }
    }
}

#[derive(Debug, Deserialize)]
struct HyperliquidAck {
    status: String,
    response: Option<HyperliquidAckResponse>,
}

#[derive(Debug, Deserialize)]
struct HyperliquidAckResponse {
    data: Option<HyperliquidAckData>,
}

#[derive(Debug, Deserialize)]
struct HyperliquidAckData {
    statuses: Vec<HyperliquidOrderStatusAck>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HyperliquidOrderStatusAck {
    Resting { resting: HyperliquidRestingOid },
    Filled { filled: HyperliquidFilledOid },
    Error { error: String },
}

#[derive(Debug, Deserialize)]
struct HyperliquidRestingOid {
    oid: u64,
}

#[derive(Debug, Deserialize)]
struct HyperliquidFilledOid {
    oid: u64,
}

pub struct HyperliquidConnector {
    account_type: AccountType,
    rest: RestClient<HyperliquidSigner>,
}

impl HyperliquidConnector {
    pub fn new(
        account_type: AccountType,
        credentials: HyperliquidCredentials,
        rest_limiter: std::sync::Arc<gateway_integration::ratelimit::AsyncRateLimiter>,
    ) -> Self {
        let rest = RestClient::new(account_type.base_url(), HyperliquidSigner { credentials }, rest_limiter, gateway_integration::retry::RetryPolicy::default());
        Self { account_type, rest }
    }
}

fn hl_side(side: Side) -> bool {
    matches!(side, Side::Buy)
}

fn hl_tif(order_type: OrderType, tif: TimeInForce) -> &'static str {
    match (order_type, tif) {
        (OrderType::Market, _) => "Ioc",
        (OrderType::PostOnly, _) => "Alo",
        (_, TimeInForce::Ioc) => "Ioc",
        (_, TimeInForce::Fok) => "Ioc",
        _ => "Gtc",
    }
}

fn ack_to_eid(ack: HyperliquidAck) -> Result<String, ExecutionError> {
    if ack.status != "ok" {
        return Err(ExecutionError::Venue(gateway_integration::rest::VenueError { status: 200, code: None, message: ack.status, payload: String::new() }));
    }
    let Some(first) = ack.response.and_then(|r| r.data).and_then(|d| d.statuses.into_iter().next()) else {
        return Err(ExecutionError::Venue(gateway_integration::rest::VenueError { status: 200, code: None, message: "empty statuses".into(), payload: String::new() }));
    };
    match first {
        HyperliquidOrderStatusAck::Resting { resting } => Ok(resting.oid.to_string()),
        HyperliquidOrderStatusAck::Filled { filled } => Ok(filled.oid.to_string()),
        HyperliquidOrderStatusAck::Error { error } => {
            Err(ExecutionError::Venue(gateway_integration::rest::VenueError { status: 200, code: None, message: error, payload: String::new() }))
        }
    }
}

#[async_trait]
impl PrivateConnector for HyperliquidConnector {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Hyperliquid
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
            "action": {
                "type": "order",
                "orders": [{
                    "a": order.symbol.symbol,
                    "b": hl_side(order.side),
                    "p": order.price.map(|p| p.to_string()).unwrap_or_default(),
                    "s": order.amount.to_string(),
                    "r": order.reduce_only,
                    "t": { "limit": { "tif": hl_tif(order.order_type, order.time_in_force) } },
                    "c": order.oid,
                }],
                "grouping": "na",
            },
            "nonce": now_ms(),
        })
        .to_string();
        let ack: HyperliquidAck = self.rest.request(reqwest::Method::POST, "/exchange", &[], Some(&body), true, "/exchange").await?;
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
            "action": {
                "type": "modify",
                "oid": oid.parse::<u64>().unwrap_or(0),
                "order": {
                    "a": symbol.symbol,
                    "p": price.map(|p| p.to_string()).unwrap_or_default(),
                    "s": amount.map(|a| a.to_string()).unwrap_or_default(),
                },
            },
            "nonce": now_ms(),
        })
        .to_string();
        let ack: HyperliquidAck = self.rest.request(reqwest::Method::POST, "/exchange", &[], Some(&body), true, "/exchange").await?;
        ack_to_eid(ack).map(|_| ())
    }

    async fn cancel_order(&self, oid: &str, symbol: &InstrumentId) -> Result<(), ExecutionError> {
        let body = serde_json::json!({
            "action": { "type": "cancel", "cancels": [{ "a": symbol.symbol, "o": oid.parse::<u64>().unwrap_or(0) }] },
            "nonce": now_ms(),
        })
        .to_string();
        let ack: HyperliquidAck = self.rest.request(reqwest::Method::POST, "/exchange", &[], Some(&body), true, "/exchange").await?;
        ack_to_eid(ack).map(|_| ())
    }

    async fn cancel_all_orders(&self, symbol: Option<&InstrumentId>) -> Result<(), ExecutionError> {
        let body = serde_json::json!({
            "action": { "type": "scheduleCancel" },
            "symbol": symbol.map(|s| s.symbol.clone()),
            "nonce": now_ms(),
        })
        .to_string();
        let _ack: serde_json::Value = self.rest.request(reqwest::Method::POST, "/exchange", &[], Some(&body), true, "/exchange").await?;
        Ok(())
    }
}

/// Hyperliquid reports fills as WS events rather than named statuses; this
/// maps the small set of string tags its user-events feed actually sends.
pub fn map_status(event_kind: &str) -> Option<OrderStatus> {
    match event_kind {
        "resting" => Some(OrderStatus::Accepted),
        "filled" => Some(OrderStatus::Filled),
        "canceled" => Some(OrderStatus::Canceled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_statuses() {
        assert_eq!(map_status("resting"), Some(OrderStatus::Accepted));
        assert_eq!(map_status("filled"), Some(OrderStatus::Filled));
        assert_eq!(map_status("nope"), None);
    }

    #[test]
    fn signer_produces_65_byte_signature() {
        let key_hex = &"1111111111111111111111111111111111111111111111111111111111111111"[..64];
        let credentials = HyperliquidCredentials::new("0xabc", key_hex).unwrap();
        let signer = HyperliquidSigner { credentials };
        let output = signer.sign(SigningInput { method: &reqwest::Method::POST, path: "/exchange", query: &[], body: Some("{}"), timestamp_ms: 1 });
        let sig = &output.extra_query[0].1;
        assert_eq!(sig.len(), 65 * 2);
    }
}
