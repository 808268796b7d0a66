use {
    super::{Balance, BlockNumber},
    crate::address::{AccountId20, AccountId32},
    codec::{Decode, Encode},
};

/// Pending multisig migration, present in `Multisigs` until the threshold
/// is reached and the record is pruned.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MultisigMigrationDetail {
    pub to: AccountId20,
    pub members: Vec<(AccountId32, bool)>,
    pub threshold: u16,
}

impl MultisigMigrationDetail {
    pub fn approvals(&self) -> usize {
        self.members.iter().filter(|(_, approved)| *approved).count()
    }

    pub fn is_member(&self, who: &AccountId32) -> bool {
        self.members.iter().any(|(member, _)| member == who)
    }

    pub fn has_approved(&self, who: &AccountId32) -> bool {
        self.members
            .iter()
            .any(|(member, approved)| member == who && *approved)
    }
}

/// Parameters of a destination that is itself a multisig contract.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MultisigParams {
    pub address: AccountId20,
    pub members: Vec<AccountId20>,
    pub threshold: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct AccountData {
    pub free: Balance,
    pub reserved: Balance,
    pub frozen: Balance,
    pub flags: Balance,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct AccountInfo {
    pub nonce: u32,
    pub consumers: u32,
    pub providers: u32,
    pub sufficients: u32,
    pub data: AccountData,
}

/// Leading field of the KTON asset account; the remaining fields are not
/// needed to display a balance and are left undecoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct AssetAccount {
    pub balance: Balance,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct StakingLedger {
    pub staked_ring: Balance,
    pub staked_kton: Balance,
    pub staked_deposits: Vec<u16>,
    pub unstaking_ring: Vec<(Balance, BlockNumber)>,
    pub unstaking_kton: Vec<(Balance, BlockNumber)>,
    pub unstaking_deposits: Vec<(u16, BlockNumber)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct Deposit {
    pub id: u16,
    pub value: Balance,
    pub start_time: u128,
    pub expired_time: u128,
    pub in_use: bool,
}
