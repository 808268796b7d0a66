//! Address of a destination that is itself a multisig contract.
//!
//! The factory derives the contract address from the source public key,
//! the member list and the threshold, so the member order has to be
//! reproducible: members are sorted by their raw address bytes before
//! every factory call, whatever case they were typed in.

use {
    crate::{
        error::{MigrationError, Result},
        evm::MultisigFactory,
        signer::EvmKey,
    },
    darwinia_migration_sdk::{address::parse_evm_address, AccountId20, AccountId32},
    log::*,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationRequest {
    /// Source multisig whose public key seeds the contract address.
    pub source: AccountId32,
    /// Prepended to `members` unless they came from a shared link.
    pub own_evm_account: Option<AccountId20>,
    pub members: Vec<String>,
    pub threshold: u16,
}

impl DestinationRequest {
    /// Validates the request and returns the members in factory order.
    pub fn ordered_members(&self) -> Result<Vec<AccountId20>> {
        if self.threshold < 2 {
            return Err(MigrationError::AddressNotGenerated(format!(
                "threshold {} makes a general account, not a multisig",
                self.threshold
            )));
        }
        let total = self.members.len() + usize::from(self.own_evm_account.is_some());
        if total < usize::from(self.threshold) {
            return Err(MigrationError::AddressNotGenerated(format!(
                "{} members cannot reach threshold {}",
                total, self.threshold
            )));
        }

        let mut members = Vec::with_capacity(total);
        members.extend(self.own_evm_account);
        for member in &self.members {
            let address = parse_evm_address(member)
                .map_err(|e| MigrationError::AddressNotGenerated(format!("{member}: {e}")))?;
            members.push(address);
        }
        members.sort();
        Ok(members)
    }
}

pub async fn compute_destination(factory: &dyn MultisigFactory, request: &DestinationRequest) -> Result<AccountId20> {
    let members = request.ordered_members()?;
    let address = factory
        .compute_address(request.source.as_bytes(), &members, request.threshold)
        .await
        .map_err(|e| {
            warn!("computeAddress failed for {}: {}", request.source, e);
            MigrationError::AddressNotGenerated(e.to_string())
        })?;
    debug!("destination of {} is {}", request.source, address);
    Ok(address)
}

/// Deploys the destination contract paid by `key` and returns the
/// transaction hash once the receipt is mined.
pub async fn deploy_destination(
    factory: &dyn MultisigFactory,
    request: &DestinationRequest,
    key: &EvmKey,
) -> Result<String> {
    let members = request.ordered_members()?;
    let hash = factory
        .deploy(request.source.as_bytes(), &members, request.threshold, key)
        .await?;
    info!("deployed destination of {} in {}", request.source, hash);
    Ok(hash)
}
