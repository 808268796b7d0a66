//! In-memory stand-ins for the chain, indexer and contract seams.

use {
    crate::{
        error::{EvmError, IndexerError, RpcError},
        evm::{CodeProbe, MultisigFactory},
        indexer::{AccountMigration, MigrationIndexer, MultisigAccountMigration, MultisigDestinationAccount},
        signer::EvmKey,
        source_chain::SourceChain,
    },
    async_trait::async_trait,
    darwinia_migration_sdk::{
        account_migration::{
            state::{AccountInfo, Deposit, MultisigMigrationDetail, StakingLedger},
            Balance, BlockNumber,
        },
        AccountId20, AccountId32,
    },
    std::{
        collections::{HashMap, HashSet},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    },
};

#[derive(Default)]
pub struct MockChain {
    pub multisigs: Mutex<HashMap<AccountId32, MultisigMigrationDetail>>,
    pub accounts: Mutex<HashMap<AccountId32, AccountInfo>>,
    pub kton: Mutex<HashMap<AccountId32, Balance>>,
    pub ledgers: Mutex<HashMap<AccountId32, StakingLedger>>,
    pub deposits: Mutex<HashMap<AccountId32, Vec<Deposit>>>,
    pub used_evm_accounts: Mutex<HashSet<AccountId20>>,
    pub block_number: Mutex<BlockNumber>,
    pub submitted: Mutex<Vec<Vec<u8>>>,
    pub fail_submission: Mutex<bool>,
    pub fail_queries: Mutex<bool>,
    pub status_queries: AtomicUsize,
    /// Block hash of every `account_info` query.
    pub balance_blocks: Mutex<Vec<Option<String>>>,
}

impl MockChain {
    fn check_queries(&self) -> Result<(), RpcError> {
        if *self.fail_queries.lock().unwrap() {
            return Err(RpcError::Timeout);
        }
        Ok(())
    }
}

#[async_trait]
impl SourceChain for MockChain {
    async fn multisig_status(&self, who: &AccountId32) -> Result<Option<MultisigMigrationDetail>, RpcError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        self.check_queries()?;
        Ok(self.multisigs.lock().unwrap().get(who).cloned())
    }

    async fn account_info(&self, who: &AccountId32, at: Option<&str>) -> Result<Option<AccountInfo>, RpcError> {
        self.check_queries()?;
        self.balance_blocks.lock().unwrap().push(at.map(str::to_string));
        Ok(self.accounts.lock().unwrap().get(who).cloned())
    }

    async fn kton_balance(&self, who: &AccountId32, _at: Option<&str>) -> Result<Balance, RpcError> {
        self.check_queries()?;
        Ok(self.kton.lock().unwrap().get(who).copied().unwrap_or_default())
    }

    async fn staking_ledger(&self, who: &AccountId32, _at: Option<&str>) -> Result<Option<StakingLedger>, RpcError> {
        self.check_queries()?;
        Ok(self.ledgers.lock().unwrap().get(who).cloned())
    }

    async fn deposits(&self, who: &AccountId32, _at: Option<&str>) -> Result<Vec<Deposit>, RpcError> {
        self.check_queries()?;
        Ok(self.deposits.lock().unwrap().get(who).cloned().unwrap_or_default())
    }

    async fn is_evm_account_free(&self, who: &AccountId20) -> Result<bool, RpcError> {
        self.check_queries()?;
        Ok(!self.used_evm_accounts.lock().unwrap().contains(who))
    }

    async fn spec_name(&self) -> Result<String, RpcError> {
        Ok("darwinia2".to_string())
    }

    async fn best_block_number(&self) -> Result<BlockNumber, RpcError> {
        Ok(*self.block_number.lock().unwrap())
    }

    async fn submit_extrinsic(&self, extrinsic: Vec<u8>) -> Result<String, RpcError> {
        if *self.fail_submission.lock().unwrap() {
            return Err(RpcError::ExtrinsicRejected("invalid".to_string()));
        }
        self.submitted.lock().unwrap().push(extrinsic);
        Ok(format!("0x{:064x}", self.submitted.lock().unwrap().len()))
    }
}

#[derive(Default)]
pub struct MockIndexer {
    pub accounts: Mutex<HashMap<String, AccountMigration>>,
    pub multisigs: Mutex<HashMap<String, MultisigAccountMigration>>,
    pub destinations: Mutex<HashMap<String, MultisigDestinationAccount>>,
    pub fail: Mutex<bool>,
    pub queries: AtomicUsize,
}

impl MockIndexer {
    fn check(&self) -> Result<(), IndexerError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap() {
            return Err(IndexerError::Status(503));
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationIndexer for MockIndexer {
    async fn account_migration(&self, source: &str) -> Result<Option<AccountMigration>, IndexerError> {
        self.check()?;
        Ok(self.accounts.lock().unwrap().get(source).cloned())
    }

    async fn multisig_migration(&self, source: &str) -> Result<Option<MultisigAccountMigration>, IndexerError> {
        self.check()?;
        Ok(self.multisigs.lock().unwrap().get(source).cloned())
    }

    async fn multisig_destination_params(
        &self,
        source: &str,
    ) -> Result<Option<MultisigDestinationAccount>, IndexerError> {
        self.check()?;
        Ok(self.destinations.lock().unwrap().get(source).cloned())
    }
}

/// Stand-in for the factory's address derivation.
pub fn derived_address(public_key: &[u8; 32], threshold: u16) -> AccountId20 {
    let mut address = [0u8; 20];
    address.copy_from_slice(&public_key[..20]);
    address[19] ^= threshold as u8;
    AccountId20(address)
}

#[derive(Default)]
pub struct MockEvm {
    pub deployed: Mutex<HashSet<AccountId20>>,
    pub probes: AtomicUsize,
    /// Arguments of every factory call, in call order.
    pub factory_calls: Mutex<Vec<(String, [u8; 32], Vec<AccountId20>, u16)>>,
}

#[async_trait]
impl CodeProbe for MockEvm {
    async fn has_code(&self, address: &AccountId20) -> Result<bool, EvmError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.deployed.lock().unwrap().contains(address))
    }
}

#[async_trait]
impl MultisigFactory for MockEvm {
    async fn compute_address(
        &self,
        public_key: &[u8; 32],
        members: &[AccountId20],
        threshold: u16,
    ) -> Result<AccountId20, EvmError> {
        self.factory_calls.lock().unwrap().push((
            "computeAddress".to_string(),
            *public_key,
            members.to_vec(),
            threshold,
        ));
        Ok(derived_address(public_key, threshold))
    }

    async fn deploy(
        &self,
        public_key: &[u8; 32],
        members: &[AccountId20],
        threshold: u16,
        _key: &EvmKey,
    ) -> Result<String, EvmError> {
        self.factory_calls.lock().unwrap().push((
            "deploy".to_string(),
            *public_key,
            members.to_vec(),
            threshold,
        ));
        self.deployed
            .lock()
            .unwrap()
            .insert(derived_address(public_key, threshold));
        Ok("0xdeployed".to_string())
    }
}
