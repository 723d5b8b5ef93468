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

//! # gateway-core
//!
//! Owns everything that doesn't belong to a single venue or a single order:
//! the cooperative [`clock::Clock`], the [`task::TaskManager`] task
//! supervisor, the [`cache::Cache`] read-through/write-behind store, the
//! per-venue [`exchange_manager::ExchangeManager`], runtime
//! [`config::GatewayConfig`], and the [`engine::Engine`] that wires them
//! together with the connectors and OMS/EMS pairs built in
//! `gateway-execution`.

pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod exchange_manager;
pub mod sync_api;
pub mod task;

pub use cache::{Cache, InMemoryParamStore, ParamStore, PersistenceBackend};
pub use clock::Clock;
pub use config::GatewayConfig;
pub use engine::{Engine, EngineBuilder};
pub use error::GatewayError;
pub use exchange_manager::{DefaultAccountTypePolicy, ExchangeManager, MarketLoader};
pub use sync_api::{SyncApiCall, SyncApiHandle};
pub use task::TaskManager;
