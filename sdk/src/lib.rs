//! Primitives shared by the Darwinia account migration tooling.
//!
//! Nothing in this crate performs I/O: it encodes and decodes addresses,
//! pallet storage keys, storage values and calls so that the client
//! crates can talk to a node with plain JSON-RPC.

pub mod account_migration;
pub mod address;

pub use address::{AccountId20, AccountId32, AddressError};
