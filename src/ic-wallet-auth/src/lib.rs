//! Wallet authentication for Internet Computer front-ends.
//!
//! Several identity providers and wallets sit behind one [`Aggregator`],
//! which remembers the last used provider in a [`SourceStore`] and restores
//! its session on [`Aggregator::mount`].
pub mod account;
pub mod actor;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod fs;
pub mod json;
pub mod logger;
pub mod provider;
pub mod source;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::{AggregateSnapshot, AggregateState, Aggregator, ProviderSdks};
pub use config::AuthConfig;
pub use provider::{AdapterSnapshot, AuthStatus, LoginContext, ProviderAdapter};
pub use source::{Source, SourceStore, SourceTag};
