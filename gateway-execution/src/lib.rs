#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # gateway-execution
//!
//! Order/position/balance model and the private, order-management half of
//! the gateway:
//!
//! - [`order`], [`position`], [`balance`], [`account`]: canonical entities
//!   (spec §3).
//! - [`registry`]: `OrderRegistry`, bridging `oid`/`eid` (spec §4.H).
//! - [`oms`]: `Oms`, the order status state machine (spec §4.L).
//! - [`ems`]: `Ems`, preprocessing/queueing/TWAP (spec §4.M).
//! - [`connector`]: the `PrivateConnector` contract (spec §4.K) every venue
//!   adapter under [`venue`] implements.

pub mod account;
pub mod balance;
pub mod connector;
pub mod ems;
pub mod error;
pub mod oms;
pub mod order;
pub mod position;
pub mod registry;
pub mod twap;
pub mod venue;

pub use account::AccountEvent;
pub use connector::{AccountStateSink, PrivateConnector};
pub use ems::Ems;
pub use error::ExecutionError;
pub use oms::Oms;
pub use order::{Order, OrderStatus, OrderType, TimeInForce};
pub use registry::OrderRegistry;
