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

//! # gateway-instrument
//!
//! Canonical identity types shared by every other crate in the gateway:
//! [`ExchangeId`], [`InstrumentId`], [`AccountType`] and the [`Market`]
//! tagged union. Nothing in this crate talks to the network; it only gives
//! every other component a single, venue-agnostic vocabulary to describe
//! *what* is being traded and *where*.
//!
//! A `Market` is immutable once loaded (see `gateway-core`'s
//! `ExchangeManager`, which owns the load); everything downstream borrows or
//! clones it.

pub mod account;
pub mod asset;
pub mod error;
pub mod exchange;
pub mod instrument;
pub mod market;
pub mod side;

pub use account::AccountType;
pub use asset::AssetId;
pub use error::InstrumentError;
pub use exchange::ExchangeId;
pub use instrument::{InstrumentId, SymbolSuffix};
pub use market::{InverseMarket, LinearMarket, Market, MarketSpec, OptionMarket, SpotMarket};
pub use side::Side;
