use gateway_integration::error::IntegrationError;
use gateway_integration::rest::VenueError;
use thiserror::Error;

/// Errors raised by the order/account-management layer.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("order {oid} rejected: amount {amount} below minimum or notional below min_notional")]
    BelowMinimum { oid: String, amount: rust_decimal::Decimal },

    #[error("account is not in one-way (net) position mode")]
    PositionMode,

    #[error("order cancelled")]
    Cancelled,

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error(transparent)]
    Venue(#[from] VenueError),

    #[error("timed out waiting for venue order id for oid {0}")]
    RegistryTimeout(String),
}
