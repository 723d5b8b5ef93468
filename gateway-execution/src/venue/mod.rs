//! Per-venue `PrivateConnector` implementations.
//!
//! [`binance`] and [`mock`] are built out in full per spec §6.4's
//! `VenueAdapter` contract; [`bybit`], [`okx`], [`kucoin`] and [`bitget`]
//! share the same HMAC-over-REST shape with thinner bodies (same auth
//! style, different header names and endpoint paths). Hyperliquid signs
//! with EIP-712 over its L1 action format rather than HMAC and is
//! approximated accordingly (see [`hyperliquid`]).

pub mod binance;
pub mod bitget;
pub mod bybit;
pub mod hyperliquid;
pub mod kucoin;
pub mod mock;
pub mod okx;

pub type HmacSha256 = hmac::Hmac<sha2::Sha256>;

/// Renders `params` as `key=value` pairs joined by `&`, sorted by key,
/// which is the query-string canonicalisation every HMAC-signed venue in
/// this module expects before hashing.
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&")
}

pub fn hmac_hex(secret: &str, message: &str) -> String {
    use hmac::Mac;
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_query_sorts_by_key() {
        let query = canonical_query(&[("b".into(), "2".into()), ("a".into(), "1".into())]);
        assert_eq!(query, "a=1&b=2");
    }

    #[test]
    fn hmac_hex_is_deterministic() {
        let a = hmac_hex("secret", "payload");
        let b = hmac_hex("secret", "payload");
        assert_eq!(a, b);
        assert_ne!(a, hmac_hex("other", "payload"));
    }
}
