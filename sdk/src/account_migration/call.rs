use {
    super::{state::MultisigParams, Signature},
    crate::address::{AccountId20, AccountId32},
    codec::{Compact, Encode},
};

/// Extrinsic format version 4 without a signature. Migration calls are
/// authorized by the signature they carry, not by an extrinsic signer.
const UNSIGNED_EXTRINSIC_V4: u8 = 0b0000_0100;

/// Position of the pallet and its dispatchables in the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallIndices {
    pub pallet: u8,
    pub migrate: u8,
    pub migrate_multisig: u8,
    pub complete_multisig_migration: u8,
}

impl Default for CallIndices {
    fn default() -> Self {
        Self {
            pallet: 41,
            migrate: 0,
            migrate_multisig: 1,
            complete_multisig_migration: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationCall {
    /// Move a plain account to an EVM address.
    Migrate {
        from: AccountId32,
        to: AccountId20,
        signature: Signature,
    },
    /// Start the migration of a multisig; the submitter's approval counts.
    MigrateMultisig {
        submitter: AccountId32,
        others: Vec<AccountId32>,
        threshold: u16,
        to: AccountId20,
        signature: Signature,
        new_multisig_params: Option<MultisigParams>,
    },
    /// Add one more member approval to a pending multisig migration.
    CompleteMultisigMigration {
        multisig: AccountId32,
        submitter: AccountId32,
        signature: Signature,
    },
}

impl MigrationCall {
    pub fn name(&self) -> &'static str {
        match self {
            MigrationCall::Migrate { .. } => "migrate",
            MigrationCall::MigrateMultisig { .. } => "migrate_multisig",
            MigrationCall::CompleteMultisigMigration { .. } => "complete_multisig_migration",
        }
    }

    /// SCALE encoded call: pallet index, call index, arguments.
    pub fn encode_call(&self, indices: &CallIndices) -> Vec<u8> {
        let mut out = vec![indices.pallet];
        match self {
            MigrationCall::Migrate {
                from,
                to,
                signature,
            } => {
                out.push(indices.migrate);
                from.encode_to(&mut out);
                to.encode_to(&mut out);
                signature.encode_to(&mut out);
            }
            MigrationCall::MigrateMultisig {
                submitter,
                others,
                threshold,
                to,
                signature,
                new_multisig_params,
            } => {
                out.push(indices.migrate_multisig);
                submitter.encode_to(&mut out);
                others.encode_to(&mut out);
                threshold.encode_to(&mut out);
                to.encode_to(&mut out);
                signature.encode_to(&mut out);
                new_multisig_params.encode_to(&mut out);
            }
            MigrationCall::CompleteMultisigMigration {
                multisig,
                submitter,
                signature,
            } => {
                out.push(indices.complete_multisig_migration);
                multisig.encode_to(&mut out);
                submitter.encode_to(&mut out);
                signature.encode_to(&mut out);
            }
        }
        out
    }

    /// Length prefixed unsigned extrinsic ready for `author_submitExtrinsic`.
    pub fn to_unsigned_extrinsic(&self, indices: &CallIndices) -> Vec<u8> {
        let call = self.encode_call(indices);
        let mut body = Vec::with_capacity(call.len() + 1);
        body.push(UNSIGNED_EXTRINSIC_V4);
        body.extend(call);

        let mut out = Compact(body.len() as u32).encode();
        out.extend(body);
        out
    }
}

/// Constructs the call that migrates a plain account.
pub fn migrate(from: AccountId32, to: AccountId20, signature: Signature) -> MigrationCall {
    MigrationCall::Migrate {
        from,
        to,
        signature,
    }
}

/// Constructs the call that starts a multisig migration. `others` are the
/// members except the submitter.
pub fn migrate_multisig(
    submitter: AccountId32,
    others: Vec<AccountId32>,
    threshold: u16,
    to: AccountId20,
    signature: Signature,
    new_multisig_params: Option<MultisigParams>,
) -> MigrationCall {
    MigrationCall::MigrateMultisig {
        submitter,
        others,
        threshold,
        to,
        signature,
        new_multisig_params,
    }
}

/// Constructs the call a member submits to approve a pending multisig
/// migration.
pub fn complete_multisig_migration(
    multisig: AccountId32,
    submitter: AccountId32,
    signature: Signature,
) -> MigrationCall {
    MigrationCall::CompleteMultisigMigration {
        multisig,
        submitter,
        signature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_layout() {
        let indices = CallIndices::default();
        let call = migrate(AccountId32([1; 32]), AccountId20([2; 20]), [3; 64]);
        let encoded = call.encode_call(&indices);
        assert_eq!(encoded.len(), 2 + 32 + 20 + 64);
        assert_eq!(encoded[0], indices.pallet);
        assert_eq!(encoded[1], indices.migrate);
        assert_eq!(&encoded[2..34], &[1; 32]);
        assert_eq!(&encoded[34..54], &[2; 20]);
        assert_eq!(&encoded[54..], &[3; 64][..]);
    }

    #[test]
    fn test_unsigned_extrinsic_prefix() {
        let indices = CallIndices::default();
        let call = complete_multisig_migration(AccountId32([1; 32]), AccountId32([2; 32]), [0; 64]);
        let extrinsic = call.to_unsigned_extrinsic(&indices);
        let body_len = 1 + 2 + 32 + 32 + 64;
        // compact encoding of 131 takes two bytes
        assert_eq!(&extrinsic[..2], &Compact(body_len as u32).encode()[..]);
        assert_eq!(extrinsic[2], UNSIGNED_EXTRINSIC_V4);
        assert_eq!(extrinsic.len(), 2 + body_len);
    }

    #[test]
    fn test_migrate_multisig_optional_params() {
        let indices = CallIndices::default();
        let without = migrate_multisig(
            AccountId32([1; 32]),
            vec![AccountId32([2; 32])],
            2,
            AccountId20([3; 20]),
            [0; 64],
            None,
        )
        .encode_call(&indices);
        assert_eq!(*without.last().unwrap(), 0);

        let params = MultisigParams {
            address: AccountId20([3; 20]),
            members: vec![AccountId20([4; 20]), AccountId20([5; 20])],
            threshold: 2,
        };
        let with = migrate_multisig(
            AccountId32([1; 32]),
            vec![AccountId32([2; 32])],
            2,
            AccountId20([3; 20]),
            [0; 64],
            Some(params.clone()),
        )
        .encode_call(&indices);
        let tail = &with[without.len() - 1..];
        assert_eq!(tail[0], 1);
        assert_eq!(&tail[1..], &params.encode()[..]);
    }
}
