//! Client side view of the `AccountMigration` pallet that holds the
//! Darwinia 1.0 state on the Darwinia 2.0 chain.

pub mod call;
pub mod message;
pub mod state;
pub mod storage;

pub const PALLET_NAME: &str = "AccountMigration";

/// Signature produced by an sr25519 key over the authorization message.
pub type Signature = [u8; 64];

/// Balance type of both RING and KTON.
pub type Balance = u128;

pub type BlockNumber = u32;
