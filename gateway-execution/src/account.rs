use crate::balance::Balance;
use crate::order::Order;
use crate::position::Position;
use serde::{Deserialize, Serialize};

/// Inbound normalised event handed by a `PrivateConnector` to the OMS, or
/// published by the OMS/Cache on the per-exchange account topics (spec
/// §6.2: `<exchange>.order`, `<exchange>.position`, `<exchange>.balance`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccountEvent {
    Order(Order),
    Position(Position),
    Balance(Balance),
    /// A full balances/positions reseed, issued once on `connect()` (spec
    /// §4.K point 1), as distinct from an incremental update.
    Snapshot { balances: Vec<Balance>, positions: Vec<Position> },
}
