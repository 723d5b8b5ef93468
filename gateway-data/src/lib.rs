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

//! # gateway-data
//!
//! Market-data plumbing: the [`bus::MessageBus`] (spec §4.B) and the
//! [`connector::PublicConnector`] contract (spec §4.J) that normalises
//! venue WebSocket streams into the canonical [`event::MarketEvent`] family.

pub mod bus;
pub mod connector;
pub mod event;
pub mod subscription;

pub use bus::MessageBus;
pub use connector::PublicConnector;
