//! Multisig accounts the user has added, kept in the local store.

use {
    crate::{
        error::{MigrationError, Result},
        source_chain::SourceChain,
        store::{LocalStore, MultisigAccount, MultisigMeta},
    },
    darwinia_migration_sdk::{
        address::{convert_to_ss58, multisig_account_id},
        AccountId32,
    },
    log::*,
    std::sync::Arc,
};

pub struct MultisigRegistry {
    chain: Arc<dyn SourceChain>,
    store: Arc<LocalStore>,
    ss58_prefix: u16,
}

impl MultisigRegistry {
    pub fn new(chain: Arc<dyn SourceChain>, store: Arc<LocalStore>, ss58_prefix: u16) -> Self {
        Self {
            chain,
            store,
            ss58_prefix,
        }
    }

    /// Derives the multisig of `signatories` under `threshold` and stores
    /// it if the account exists on the source chain. The initializer is
    /// listed first; it is added to the signatories when missing.
    pub async fn add(
        &self,
        name: &str,
        initializer: &str,
        signatories: &[String],
        threshold: u16,
    ) -> Result<MultisigAccount> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MigrationError::AddressNotGenerated("the multisig needs a name".to_string()));
        }
        let initializer: AccountId32 = initializer.parse()?;
        let mut members = vec![initializer];
        for signatory in signatories {
            let member: AccountId32 = signatory.parse()?;
            if !members.contains(&member) {
                members.push(member);
            }
        }
        if threshold == 0 || usize::from(threshold) > members.len() {
            return Err(MigrationError::AddressNotGenerated(format!(
                "threshold {} is out of range for {} members",
                threshold,
                members.len()
            )));
        }

        let account = multisig_account_id(&members, threshold);
        let address = account.to_ss58(self.ss58_prefix);
        if self.chain.account_info(&account, None).await?.is_none() {
            return Err(MigrationError::AccountNotFound(address));
        }

        let multisig = MultisigAccount {
            address: address.clone(),
            meta: MultisigMeta {
                name: name.to_string(),
                who: members
                    .iter()
                    .map(|member| member.to_ss58(self.ss58_prefix))
                    .collect(),
                threshold,
                initializer: initializer.to_ss58(self.ss58_prefix),
            },
        };
        self.store.upsert_multisig_account(multisig.clone())?;
        info!("added multisig {} ({}-of-{})", address, threshold, members.len());
        Ok(multisig)
    }

    /// Stored accounts, re-encoded for the current network prefix.
    pub fn list(&self) -> Result<Vec<MultisigAccount>> {
        let prefix = self.ss58_prefix;
        Ok(self
            .store
            .multisig_accounts()?
            .into_iter()
            .map(|account| MultisigAccount {
                address: convert_to_ss58(&account.address, prefix),
                meta: MultisigMeta {
                    who: account
                        .meta
                        .who
                        .iter()
                        .map(|member| convert_to_ss58(member, prefix))
                        .collect(),
                    initializer: convert_to_ss58(&account.meta.initializer, prefix),
                    ..account.meta
                },
            })
            .collect())
    }
}
