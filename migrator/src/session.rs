//! Per-user application state, passed explicitly to the flows that read or
//! change it.

use {
    crate::{
        error::StoreError,
        networks::{self, NetworkConfig},
        store::{LocalStore, IS_CONNECTED_TO_WALLET, SELECTED_NETWORK, SELECTED_WALLET},
    },
    darwinia_migration_sdk::AccountId32,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub network: NetworkConfig,
    pub selected_account: Option<AccountId32>,
    /// Set once a single account migration is finalized in this session.
    pub just_migrated: bool,
    /// Set once a multisig migration or approval is finalized in this session.
    pub multisig_just_migrated: bool,
}

impl Session {
    pub fn new(network: NetworkConfig) -> Self {
        Self {
            network,
            selected_account: None,
            just_migrated: false,
            multisig_just_migrated: false,
        }
    }

    pub fn prefix(&self) -> u16 {
        self.network.prefix
    }

    /// Switching accounts forgets what the previous account just did.
    pub fn select_account(&mut self, account: AccountId32) {
        if self.selected_account != Some(account) {
            self.just_migrated = false;
        }
        self.selected_account = Some(account);
    }

    pub fn select_network(&mut self, network: NetworkConfig) {
        if self.network != network {
            self.selected_account = None;
            self.just_migrated = false;
            self.multisig_just_migrated = false;
        }
        self.network = network;
    }

    /// Records the wallet connection the way the store layout expects it.
    pub fn persist(&self, store: &LocalStore, wallet: &str) -> Result<(), StoreError> {
        store.set(SELECTED_WALLET, wallet)?;
        store.set(IS_CONNECTED_TO_WALLET, &true)?;
        store.set(SELECTED_NETWORK, &self.network.name)
    }

    /// Network remembered from an earlier run, if it is still supported.
    pub fn restore_network(store: &LocalStore) -> Result<Option<NetworkConfig>, StoreError> {
        let name: Option<String> = store.get(SELECTED_NETWORK)?;
        let supported = networks::supported_networks();
        Ok(name.and_then(|name| networks::find_network(&supported, &name).cloned()))
    }
}
