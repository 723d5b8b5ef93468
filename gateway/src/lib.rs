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

//! # gateway
//!
//! Single-dependency façade over the multi-venue crypto gateway ecosystem:
//! pull in `gateway` and get [`instrument`], [`data`], [`execution`],
//! [`integration`] and [`core`] behind one crate, each re-exported under a
//! short alias matching its crate name.
//!
//! ```no_run
//! use gateway::core::{EngineBuilder, GatewayConfig};
//! ```

pub use gateway_core as core;
pub use gateway_data as data;
pub use gateway_execution as execution;
pub use gateway_instrument as instrument;
pub use gateway_integration as integration;

pub use gateway_core::{Cache, Engine, EngineBuilder, ExchangeManager, GatewayConfig, GatewayError};
pub use gateway_data::{event::MarketEvent, MessageBus, PublicConnector};
pub use gateway_execution::{Ems, Order, OrderRegistry, OrderStatus, Oms, PrivateConnector};
pub use gateway_instrument::{AccountType, ExchangeId, InstrumentId, Market};
