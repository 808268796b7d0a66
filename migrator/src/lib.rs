//! Client side of the Darwinia 1.0 to 2.0 account migration.
//!
//! The crate reads migration state from the source chain, the indexer and
//! the destination EVM, reconciles it into one status per account, and
//! submits the migration calls signed with a local keyring.

pub mod account_status;
pub mod approval;
pub mod config;
pub mod destination;
pub mod error;
pub mod evm;
pub mod indexer;
pub mod ledger;
pub mod migration;
pub mod networks;
pub mod poller;
pub mod reconciler;
pub mod registry;
pub mod rpc;
pub mod session;
pub mod share_link;
pub mod signer;
pub mod source_chain;
pub mod store;

#[cfg(test)]
mod mock;

pub use error::{MigrationError, Result};
