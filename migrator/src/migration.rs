//! Submitting migrations.
//!
//! Both flows sign the authorization message for the destination, submit
//! the call and wait for finalization. Nothing is retried; a failure is
//! reported and the user starts over.

use {
    crate::{
        error::{MigrationError, Result},
        session::Session,
        signer::MessageSigner,
        source_chain::SourceChain,
        store::{Destination, LocalStore},
    },
    darwinia_migration_sdk::{
        account_migration::{
            call::{migrate, migrate_multisig, CallIndices, MigrationCall},
            message::authorization_message,
            state::MultisigParams,
            Signature,
        },
        address::multisig_account_id,
        AccountId20, AccountId32,
    },
    log::*,
    std::sync::Arc,
};

/// A multisig migration started by `initializer`. `members` includes the
/// initializer; `destination` is set when the assets go to a multisig
/// contract rather than a general account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigMigrationRequest {
    pub initializer: AccountId32,
    pub members: Vec<AccountId32>,
    pub threshold: u16,
    pub to: AccountId20,
    pub destination: Option<MultisigParams>,
}

impl MultisigMigrationRequest {
    pub fn source(&self) -> AccountId32 {
        multisig_account_id(&self.members, self.threshold)
    }

    pub fn others(&self) -> Vec<AccountId32> {
        self.members
            .iter()
            .filter(|member| **member != self.initializer)
            .copied()
            .collect()
    }

    fn cached_destination(&self) -> Destination {
        match &self.destination {
            Some(params) => Destination::multisig(
                params.address.to_checksum(),
                params.members.iter().map(AccountId20::to_checksum).collect(),
                params.threshold,
            ),
            None => Destination::general(self.to.to_checksum()),
        }
    }
}

pub struct Migrator {
    chain: Arc<dyn SourceChain>,
    signer: Arc<dyn MessageSigner>,
    call_indices: CallIndices,
    store: Option<Arc<LocalStore>>,
}

impl Migrator {
    pub fn new(chain: Arc<dyn SourceChain>, signer: Arc<dyn MessageSigner>, call_indices: CallIndices) -> Self {
        Self {
            chain,
            signer,
            call_indices,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<LocalStore>) -> Self {
        self.store = Some(store);
        self
    }

    async fn authorize(&self, account: &AccountId32, to: &AccountId20) -> Result<Signature> {
        let spec_name = self.chain.spec_name().await?;
        let message = authorization_message(&to.to_checksum(), &spec_name);
        Ok(self.signer.sign_raw(account, message.as_bytes()).await?)
    }

    async fn submit(&self, call: MigrationCall) -> Result<String> {
        let name = call.name();
        self.chain
            .submit_extrinsic(call.to_unsigned_extrinsic(&self.call_indices))
            .await
            .map_err(|e| {
                error!("{} failed: {}", name, e);
                MigrationError::ExtrinsicSubmission(e.to_string())
            })
    }

    async fn ensure_unused(&self, to: &AccountId20) -> Result<()> {
        if !self.chain.is_evm_account_free(to).await? {
            return Err(MigrationError::DestinationInUse(to.to_checksum()));
        }
        Ok(())
    }

    /// Migrates a plain account. Returns the finalized block hash.
    pub async fn init_migration(&self, session: &mut Session, from: &AccountId32, to: &AccountId20) -> Result<String> {
        self.ensure_unused(to).await?;
        let signature = self.authorize(from, to).await?;
        let block = self.submit(migrate(*from, *to, signature)).await?;
        session.just_migrated = true;
        info!("{} migrated to {} in {}", from.to_ss58(session.prefix()), to, block);
        Ok(block)
    }

    /// Starts a multisig migration; the initializer's approval is part of
    /// the call. On success the destination is cached under the multisig's
    /// address until the indexer knows about it.
    pub async fn init_multisig_migration(
        &self,
        session: &mut Session,
        request: &MultisigMigrationRequest,
    ) -> Result<String> {
        let prefix = session.prefix();
        if !request.members.contains(&request.initializer) {
            return Err(MigrationError::NotAMember(request.initializer.to_ss58(prefix)));
        }
        if request.destination.is_none() {
            self.ensure_unused(&request.to).await?;
        }

        session.multisig_just_migrated = false;
        let signature = self.authorize(&request.initializer, &request.to).await?;
        let call = migrate_multisig(
            request.initializer,
            request.others(),
            request.threshold,
            request.to,
            signature,
            request.destination.clone(),
        );
        let block = self.submit(call).await?;
        session.multisig_just_migrated = true;

        let source = request.source().to_ss58(prefix);
        if let Some(store) = &self.store {
            if let Err(e) = store.cache_destination(&source, request.cached_destination()) {
                warn!("could not cache destination of {}: {:?}", source, e);
            }
        }
        info!("multisig {} migration to {} started in {}", source, request.to, block);
        Ok(block)
    }
}
