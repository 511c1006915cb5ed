//! Resilient multi-tier HTTP transport.
//!
//! An [`AuthenticatedClient`] attaches the stored session credential and
//! hands each request to a [`TierSequencer`], which tries the configured
//! [`Tier`]s in order. Every failed attempt is diagnosed into a
//! [`relay_diagnosis::DiagnosticReport`]; when all tiers fail the caller gets
//! [`TransportError::Exhausted`] carrying the full attempt chain.

mod client;
pub mod config;
mod error;
mod http;
mod retry;
mod sequencer;
mod tier;

pub use client::AuthenticatedClient;
pub use client::ClientBuilder;
pub use client::SessionEvent;
pub use client::UnauthorizedBehavior;
pub use config::ConfigError;
pub use config::ConfigLoader;
pub use config::Strategy;
pub use config::TierSpec;
pub use config::TransportConfig;
pub use error::Result;
pub use error::TierExhausted;
pub use error::TransportError;
pub use http::OutboundRequest;
pub use http::Response;
pub use retry::RetryPolicy;
pub use retry::RetryStatus;
pub use sequencer::RetryObserver;
pub use sequencer::TierSequencer;
pub use tier::ReqwestTier;
pub use tier::Tier;
pub use tier::TierKind;
pub use tier::from_reqwest;

pub use relay_async_utils::Deadline;
pub use tokio_util::sync::CancellationToken;
