//! RING and KTON balances of a source account, split the way the
//! migration summary shows them.

use {
    crate::{error::Result, source_chain::SourceChain},
    darwinia_migration_sdk::{
        account_migration::{
            state::{AccountInfo, Deposit, StakingLedger},
            Balance, BlockNumber,
        },
        AccountId32,
    },
    log::*,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetDetail {
    pub transferable: Balance,
    pub deposit: Balance,
    pub bonded: Balance,
    pub unbonded: Balance,
    pub unbonding: Balance,
}

impl AssetDetail {
    pub fn total(&self) -> Balance {
        self.transferable
            .saturating_add(self.deposit)
            .saturating_add(self.bonded)
            .saturating_add(self.unbonded)
            .saturating_add(self.unbonding)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetDistribution {
    pub ring: AssetDetail,
    pub kton: AssetDetail,
}

/// Splits unstaking entries into (unbonded, unbonding) at block `current`.
fn split_unstaking(entries: &[(Balance, BlockNumber)], current: BlockNumber) -> (Balance, Balance) {
    entries
        .iter()
        .fold((0, 0), |(unbonded, unbonding), (value, release)| {
            if current >= *release {
                (unbonded.saturating_add(*value), unbonding)
            } else {
                (unbonded, unbonding.saturating_add(*value))
            }
        })
}

pub fn compute(
    account: &AccountInfo,
    kton: Balance,
    ledger: Option<&StakingLedger>,
    deposits: &[Deposit],
    current: BlockNumber,
) -> AssetDistribution {
    let free = account.data.free;
    let total_ring = free.saturating_add(account.data.reserved);
    let deposit_total = deposits
        .iter()
        .fold(0 as Balance, |total, deposit| total.saturating_add(deposit.value));

    let Some(ledger) = ledger else {
        let transferable = if free == 0 {
            0
        } else {
            total_ring.saturating_sub(deposit_total)
        };
        return AssetDistribution {
            ring: AssetDetail {
                transferable,
                deposit: deposit_total,
                ..Default::default()
            },
            kton: AssetDetail {
                transferable: kton,
                ..Default::default()
            },
        };
    };

    let (ring_unbonded, ring_unbonding) = split_unstaking(&ledger.unstaking_ring, current);
    let (kton_unbonded, kton_unbonding) = split_unstaking(&ledger.unstaking_kton, current);

    let ring_transferable = if free == 0 {
        0
    } else {
        total_ring
            .saturating_sub(ledger.staked_ring)
            .saturating_sub(deposit_total)
            .saturating_sub(ring_unbonded)
            .saturating_sub(ring_unbonding)
    };
    let kton_transferable = kton
        .saturating_sub(ledger.staked_kton)
        .saturating_sub(kton_unbonded)
        .saturating_sub(kton_unbonding);

    AssetDistribution {
        ring: AssetDetail {
            transferable: ring_transferable,
            deposit: deposit_total,
            bonded: ledger.staked_ring,
            unbonded: ring_unbonded,
            unbonding: ring_unbonding,
        },
        kton: AssetDetail {
            transferable: kton_transferable,
            deposit: 0,
            bonded: ledger.staked_kton,
            unbonded: kton_unbonded,
            unbonding: kton_unbonding,
        },
    }
}

/// Reads everything `compute` needs. `at` pins the reads to a block hash,
/// e.g. the parent of the migration block to show what was migrated.
pub async fn fetch_asset_distribution(
    chain: &dyn SourceChain,
    who: &AccountId32,
    at: Option<&str>,
) -> Result<AssetDistribution> {
    let (account, kton, ledger, deposits, current) = tokio::try_join!(
        chain.account_info(who, at),
        chain.kton_balance(who, at),
        chain.staking_ledger(who, at),
        chain.deposits(who, at),
        chain.best_block_number(),
    )?;
    let account = account.unwrap_or_default();
    debug!("ledger of {} at {:?}: {:?}", who, at, ledger);
    Ok(compute(&account, kton, ledger.as_ref(), &deposits, current))
}

/// Renders `value` in whole units with thousands separators, rounded down
/// to `precision` decimals, trailing zeros kept: `12,345.6789`.
pub fn format_balance(value: Balance, decimals: u8, precision: u8) -> String {
    let unit = 10u128.checked_pow(u32::from(decimals)).unwrap_or(u128::MAX);
    let whole = value / unit;
    let fraction = value % unit;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if precision == 0 {
        return grouped;
    }
    let mut fraction = format!("{:0width$}", fraction, width = usize::from(decimals));
    fraction.truncate(usize::from(precision));
    while fraction.len() < usize::from(precision) {
        fraction.push('0');
    }
    format!("{grouped}.{fraction}")
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::mock::MockChain,
        darwinia_migration_sdk::account_migration::state::AccountData,
        test_case::test_case,
    };

    fn account(free: Balance, reserved: Balance) -> AccountInfo {
        AccountInfo {
            data: AccountData {
                free,
                reserved,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn deposit(id: u16, value: Balance) -> Deposit {
        Deposit {
            id,
            value,
            ..Default::default()
        }
    }

    #[test]
    fn test_without_ledger() {
        let distribution = compute(&account(100, 20), 7, None, &[deposit(0, 30)], 10);
        assert_eq!(distribution.ring.transferable, 90);
        assert_eq!(distribution.ring.deposit, 30);
        assert_eq!(distribution.ring.total(), 120);
        assert_eq!(distribution.kton.transferable, 7);

        let empty = compute(&account(0, 20), 0, None, &[], 10);
        assert_eq!(empty.ring.transferable, 0);
    }

    #[test]
    fn test_with_ledger_splits_unstaking() {
        let ledger = StakingLedger {
            staked_ring: 200,
            staked_kton: 5,
            unstaking_ring: vec![(10, 50), (20, 100), (40, 101)],
            unstaking_kton: vec![(1, 99), (2, 200)],
            ..Default::default()
        };
        let distribution = compute(&account(1_000, 0), 50, Some(&ledger), &[deposit(0, 100), deposit(1, 30)], 100);

        assert_eq!(distribution.ring.unbonded, 30);
        assert_eq!(distribution.ring.unbonding, 40);
        assert_eq!(distribution.ring.bonded, 200);
        assert_eq!(distribution.ring.deposit, 130);
        assert_eq!(distribution.ring.transferable, 1_000 - 200 - 130 - 30 - 40);
        assert_eq!(distribution.kton.unbonded, 1);
        assert_eq!(distribution.kton.unbonding, 2);
        assert_eq!(distribution.kton.transferable, 50 - 5 - 1 - 2);
    }

    #[test]
    fn test_transferable_saturates() {
        let ledger = StakingLedger {
            staked_ring: 500,
            staked_kton: 10,
            ..Default::default()
        };
        let distribution = compute(&account(100, 0), 3, Some(&ledger), &[], 0);
        assert_eq!(distribution.ring.transferable, 0);
        assert_eq!(distribution.kton.transferable, 0);
    }

    #[test_case(0, 18, 4, "0.0000")]
    #[test_case(12_345_678_900_000_000_000_000, 18, 4, "12,345.6789")]
    #[test_case(1_999_999_999, 9, 2, "1.99")]
    #[test_case(1_234_567_000_000_000, 9, 0, "1,234,567")]
    #[test_case(5, 0, 2, "5.00")]
    fn test_format_balance(value: Balance, decimals: u8, precision: u8, expected: &str) {
        assert_eq!(format_balance(value, decimals, precision), expected);
    }

    #[tokio::test]
    async fn test_fetch_asset_distribution() {
        let chain = MockChain::default();
        let who = AccountId32([1; 32]);
        chain.accounts.lock().unwrap().insert(who, account(500, 0));
        chain.kton.lock().unwrap().insert(who, 9);
        chain.deposits.lock().unwrap().insert(who, vec![deposit(0, 100)]);

        let distribution = fetch_asset_distribution(&chain, &who, None).await.unwrap();
        assert_eq!(distribution.ring.transferable, 400);
        assert_eq!(distribution.kton.transferable, 9);

        let unknown = fetch_asset_distribution(&chain, &AccountId32([2; 32]), None).await.unwrap();
        assert_eq!(unknown, AssetDistribution::default());
    }
}
