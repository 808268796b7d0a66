//! Co-signing a pending multisig migration.

use {
    crate::{
        error::{MigrationError, Result},
        reconciler::MemberApproval,
        session::Session,
        signer::MessageSigner,
        source_chain::SourceChain,
    },
    darwinia_migration_sdk::{
        account_migration::{
            call::{complete_multisig_migration, CallIndices},
            message::authorization_message,
            state::MultisigMigrationDetail,
        },
        AccountId20, AccountId32,
    },
    dashmap::DashSet,
    log::*,
    std::sync::Arc,
};

pub struct ApprovalCollector {
    chain: Arc<dyn SourceChain>,
    signer: Arc<dyn MessageSigner>,
    call_indices: CallIndices,
    /// Members whose approval was finalized from here but may not be
    /// visible in the next chain read yet.
    approved: DashSet<AccountId32>,
}

impl ApprovalCollector {
    pub fn new(chain: Arc<dyn SourceChain>, signer: Arc<dyn MessageSigner>, call_indices: CallIndices) -> Self {
        Self {
            chain,
            signer,
            call_indices,
            approved: DashSet::new(),
        }
    }

    pub fn is_locally_approved(&self, member: &AccountId32) -> bool {
        self.approved.contains(member)
    }

    /// Checks that `member` may approve: it belongs to the multisig, has
    /// not approved yet and is one of our own accounts.
    pub fn can_approve(
        &self,
        member: &AccountId32,
        status: &MultisigMigrationDetail,
        own_accounts: &[AccountId32],
    ) -> Result<()> {
        if !status.is_member(member) {
            return Err(MigrationError::NotAMember(member.to_hex()));
        }
        if status.has_approved(member) || self.is_locally_approved(member) {
            return Err(MigrationError::AlreadyApproved(member.to_hex()));
        }
        if !own_accounts.contains(member) {
            return Err(MigrationError::WalletConnectionRejected(member.to_hex()));
        }
        Ok(())
    }

    /// Own accounts that can still approve.
    pub fn approvable_members(&self, status: &MultisigMigrationDetail) -> Vec<AccountId32> {
        let own_accounts = self.signer.accounts();
        status
            .members
            .iter()
            .map(|(member, _)| *member)
            .filter(|member| self.can_approve(member, status, &own_accounts).is_ok())
            .collect()
    }

    /// Signs and submits `signer`'s approval. On finalization the signer is
    /// recorded as approved locally. Nothing is retried.
    pub async fn approve(
        &self,
        session: &mut Session,
        signer: &AccountId32,
        source: &AccountId32,
        destination: &AccountId20,
    ) -> Result<String> {
        let prefix = session.prefix();
        let status = self
            .chain
            .multisig_status(source)
            .await?
            .ok_or_else(|| MigrationError::NotPending(source.to_ss58(prefix)))?;
        self.can_approve(signer, &status, &self.signer.accounts())?;

        let spec_name = self.chain.spec_name().await?;
        let message = authorization_message(&destination.to_checksum(), &spec_name);
        let signature = self.signer.sign_raw(signer, message.as_bytes()).await?;

        session.multisig_just_migrated = false;
        let call = complete_multisig_migration(*source, *signer, signature);
        let extrinsic = call.to_unsigned_extrinsic(&self.call_indices);
        let block = self.chain.submit_extrinsic(extrinsic).await.map_err(|e| {
            error!("approval of {} by {} failed: {}", source.to_ss58(prefix), signer.to_ss58(prefix), e);
            MigrationError::ExtrinsicSubmission(e.to_string())
        })?;

        self.approved.insert(*signer);
        session.multisig_just_migrated = true;
        info!("{} approved the migration of {}", signer.to_ss58(prefix), source.to_ss58(prefix));
        Ok(block)
    }

    /// Marks members approved here as approved, ahead of the next poll.
    pub fn apply_local_approvals(&self, members: &mut [MemberApproval], prefix: u16) {
        for member in members.iter_mut().filter(|member| !member.approved) {
            member.approved = self
                .approved
                .iter()
                .any(|approved| approved.to_ss58(prefix) == member.address);
        }
    }
}
