//! Central error type aggregating every subsystem's error into one enum an
//! Engine call site can match on (spec §4.N, §6).

use crate::task::Blocked;
use gateway_execution::error::ExecutionError;
use gateway_instrument::error::InstrumentError;
use gateway_integration::error::IntegrationError;
use thiserror::Error;

/// Top-level error returned from `Engine` construction, boot and shutdown,
/// and from the `run_sync` bridge used by strategy call sites.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Blocked(#[from] Blocked),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("receiver side of an internal channel was dropped")]
    RxDropped,

    #[error("task join failed: {0}")]
    Join(String),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for GatewayError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::RxDropped
    }
}

impl From<tokio::task::JoinError> for GatewayError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Join(value.to_string())
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<tokio_postgres::Error> for GatewayError {
    fn from(value: tokio_postgres::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_error_maps_to_rx_dropped() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u8>(1);
        drop(rx);
        let err = tx.try_send(1).unwrap_err();
        let gateway_err: GatewayError = match err {
            tokio::sync::mpsc::error::TrySendError::Closed(_) => GatewayError::RxDropped,
            tokio::sync::mpsc::error::TrySendError::Full(_) => unreachable!(),
        };
        assert!(matches!(gateway_err, GatewayError::RxDropped));
    }
}
