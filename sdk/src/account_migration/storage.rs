//! Storage key construction for the maps the migration tooling reads.

use {
    super::PALLET_NAME,
    crate::address::{AccountId20, AccountId32},
    sp_crypto_hashing::{blake2_128, twox_128},
    std::str::FromStr,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageHasher {
    #[default]
    Identity,
    Blake2_128Concat,
}

impl StorageHasher {
    pub fn hash(&self, key: &[u8]) -> Vec<u8> {
        match self {
            StorageHasher::Identity => key.to_vec(),
            StorageHasher::Blake2_128Concat => {
                let mut out = blake2_128(key).to_vec();
                out.extend_from_slice(key);
                out
            }
        }
    }
}

impl FromStr for StorageHasher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "identity" => Ok(StorageHasher::Identity),
            "blake2128concat" => Ok(StorageHasher::Blake2_128Concat),
            other => Err(format!("unknown storage hasher {other}")),
        }
    }
}

pub fn storage_prefix(pallet: &str, item: &str) -> Vec<u8> {
    let mut key = twox_128(pallet.as_bytes()).to_vec();
    key.extend_from_slice(&twox_128(item.as_bytes()));
    key
}

pub fn map_key(pallet: &str, item: &str, hasher: StorageHasher, key: &[u8]) -> Vec<u8> {
    let mut out = storage_prefix(pallet, item);
    out.extend(hasher.hash(key));
    out
}

/// Keys of the account-migration maps, all keyed by the legacy account id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationItem {
    Accounts,
    KtonAccounts,
    Ledgers,
    Deposits,
    Multisigs,
}

impl MigrationItem {
    pub fn name(&self) -> &'static str {
        match self {
            MigrationItem::Accounts => "Accounts",
            MigrationItem::KtonAccounts => "KtonAccounts",
            MigrationItem::Ledgers => "Ledgers",
            MigrationItem::Deposits => "Deposits",
            MigrationItem::Multisigs => "Multisigs",
        }
    }

    pub fn key(&self, hasher: StorageHasher, who: &AccountId32) -> Vec<u8> {
        map_key(PALLET_NAME, self.name(), hasher, who.as_bytes())
    }
}

/// `System.Account` entry of an account on the destination chain.
pub fn system_account_key(who: &AccountId20) -> Vec<u8> {
    map_key("System", "Account", StorageHasher::Blake2_128Concat, who.as_bytes())
}

pub fn to_hex_key(key: &[u8]) -> String {
    format!("0x{}", hex::encode(key))
}
