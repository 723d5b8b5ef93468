use thiserror::Error;

/// Errors raised while parsing or resolving instrument identity.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum InstrumentError {
    #[error("canonical symbol '{0}' is missing the '.EXCHANGE' suffix")]
    MissingExchangeTag(String),

    #[error("unrecognised exchange tag '{0}'")]
    UnknownExchange(String),

    #[error("malformed dated-future suffix '-{0}' (expected -YYYYMMDD)")]
    MalformedExpiry(String),

    #[error("empty symbol prefix in canonical string '{0}'")]
    EmptySymbol(String),

    #[error("no market entry for instrument '{0}'")]
    UnknownMarket(String),
}
