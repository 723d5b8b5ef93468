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

//! # gateway-integration
//!
//! Low-level, venue-agnostic plumbing shared by every connector:
//!
//! - [`ratelimit`]: per-endpoint token-bucket rate limiting (spec §4.D).
//! - [`retry`]: bounded exponential back-off wrapper for fallible async
//!   calls (spec §4.E).
//! - [`ws`]: the auto-reconnecting [`ws::WsClient`] state machine (spec
//!   §4.F) — the single trickiest piece of engineering in this crate.
//! - [`rest`]: a generic signing/rate-limited/retried REST client (spec
//!   §4.G), parameterised over a per-venue [`rest::Signer`].
//! - [`channel`], [`collection`], [`snapshot`]: small generic utilities
//!   reused throughout the workspace.
//!
//! Nothing in this crate knows what a `Binance` or an `Order` is; those
//! live in `gateway-instrument` and `gateway-execution` respectively.

pub mod channel;
pub mod collection;
pub mod error;
pub mod ratelimit;
pub mod rest;
pub mod retry;
pub mod snapshot;
pub mod subscription;
pub mod ws;

/// Types capable of validating their own internal consistency before use.
pub trait Validator {
    fn validate(self) -> Result<Self, error::IntegrationError>
    where
        Self: Sized;
}

/// Communicates whether something (an event, an error) is terminal and the
/// runtime observing it should shut down rather than continue.
pub trait Terminal {
    fn is_terminal(&self) -> bool;
}

/// Indicates an `Iterator`/`Stream` has permanently ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FeedEnded;
