//! Status of a single account migration.
//!
//! A migrated account is emptied on the source chain, so its balances are
//! read at the parent of the migration block, the last state in which
//! the assets were still there.

use {
    crate::{
        error::{MigrationError, Result},
        indexer::{AccountMigration, MigrationIndexer},
        ledger::{fetch_asset_distribution, AssetDistribution},
        poller::ScheduledPoll,
        reconciler::StatusWatch,
        source_chain::SourceChain,
    },
    darwinia_migration_sdk::AccountId32,
    log::*,
    std::{ops::ControlFlow, sync::Arc, time::Duration},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountStatus {
    NotMigrated,
    /// A migration was just submitted but the indexer has not seen it yet.
    AwaitingIndexer,
    Migrated {
        record: AccountMigration,
        /// Balances just before the migration.
        assets: AssetDistribution,
    },
}

impl AccountStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, AccountStatus::AwaitingIndexer)
    }

    pub fn is_migrated(&self) -> bool {
        matches!(self, AccountStatus::Migrated { .. })
    }
}

pub struct AccountStatusChecker {
    chain: Arc<dyn SourceChain>,
    indexer: Arc<dyn MigrationIndexer>,
    ss58_prefix: u16,
    poll_interval: Duration,
}

impl AccountStatusChecker {
    pub fn new(
        chain: Arc<dyn SourceChain>,
        indexer: Arc<dyn MigrationIndexer>,
        ss58_prefix: u16,
        poll_interval: Duration,
    ) -> Self {
        Self {
            chain,
            indexer,
            ss58_prefix,
            poll_interval,
        }
    }

    pub async fn check(&self, source: &AccountId32, just_migrated: bool) -> Result<AccountStatus> {
        let address = source.to_ss58(self.ss58_prefix);
        let status = match self.indexer.account_migration(&address).await? {
            Some(record) => {
                let assets = fetch_asset_distribution(self.chain.as_ref(), source, Some(&record.parent_hash)).await?;
                AccountStatus::Migrated { record, assets }
            }
            None if just_migrated => AccountStatus::AwaitingIndexer,
            None => AccountStatus::NotMigrated,
        };
        debug!("account status of {}: {:?}", address, status);
        Ok(status)
    }

    /// Refuses a source the indexer already records as migrated.
    pub async fn ensure_not_migrated(&self, source: &AccountId32) -> Result<()> {
        let address = source.to_ss58(self.ss58_prefix);
        match self.indexer.account_migration(&address).await? {
            Some(record) => {
                warn!("{} was migrated to {} in block {}", address, record.destination, record.block_number);
                Err(MigrationError::AlreadyMigrated(address))
            }
            None => Ok(()),
        }
    }

    /// Checks once and, while the indexer is behind, keeps re-checking
    /// every poll interval until the record shows up.
    pub async fn watch(self: &Arc<Self>, source: AccountId32, just_migrated: bool) -> Result<StatusWatch<AccountStatus>> {
        let initial = self.check(&source, just_migrated).await?;
        if initial.is_settled() {
            return Ok(StatusWatch::settled_now(initial));
        }

        let checker = self.clone();
        let (handle, updates) = ScheduledPoll::new(self.poll_interval)
            .on_teardown(move || debug!("account status poll of {} stopped", source))
            .spawn(move || {
                let checker = checker.clone();
                async move {
                    match checker.check(&source, just_migrated).await {
                        Ok(status) if status.is_settled() => ControlFlow::Break(status),
                        Ok(_) => ControlFlow::Continue(()),
                        Err(e) => {
                            warn!("account status poll failed, retrying: {}", e);
                            ControlFlow::Continue(())
                        }
                    }
                }
            });
        Ok(StatusWatch::polling(initial, updates, handle))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            error::IndexerError,
            mock::{MockChain, MockIndexer},
        },
        assert_matches::assert_matches,
        darwinia_migration_sdk::account_migration::state::{AccountData, AccountInfo},
        std::sync::atomic::Ordering,
        tokio::time,
    };

    const PREFIX: u16 = 18;
    const PERIOD: Duration = Duration::from_secs(5);
    const PARENT: &str = "0x00aa00aa00aa00aa00aa00aa00aa00aa00aa00aa00aa00aa00aa00aa00aa00aa";

    fn source() -> AccountId32 {
        AccountId32([5; 32])
    }

    fn record() -> AccountMigration {
        AccountMigration {
            id: source().to_ss58(PREFIX),
            destination: "0x4444444444444444444444444444444444444444".to_string(),
            parent_hash: PARENT.to_string(),
            transaction_hash: "0xfeed".to_string(),
            block_time: "2023-05-01T00:00:00".to_string(),
            block_number: 1200,
        }
    }

    fn setup() -> (Arc<MockChain>, Arc<MockIndexer>, Arc<AccountStatusChecker>) {
        let chain = Arc::new(MockChain::default());
        chain.accounts.lock().unwrap().insert(
            source(),
            AccountInfo {
                data: AccountData {
                    free: 1_000,
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        let indexer = Arc::new(MockIndexer::default());
        let checker = Arc::new(AccountStatusChecker::new(chain.clone(), indexer.clone(), PREFIX, PERIOD));
        (chain, indexer, checker)
    }

    #[tokio::test]
    async fn test_migrated_reads_balances_before_migration() {
        let (chain, indexer, checker) = setup();
        indexer.accounts.lock().unwrap().insert(source().to_ss58(PREFIX), record());

        let status = checker.check(&source(), false).await.unwrap();
        let expected = fetch_asset_distribution(chain.as_ref(), &source(), Some(PARENT)).await.unwrap();
        assert_matches!(&status, AccountStatus::Migrated { record: found, assets } => {
            assert_eq!(found, &record());
            assert_eq!(assets, &expected);
            assert!(assets.ring.total() > 0);
        });
        assert!(status.is_migrated());
        assert!(chain
            .balance_blocks
            .lock()
            .unwrap()
            .iter()
            .all(|at| at.as_deref() == Some(PARENT)));
    }

    #[tokio::test]
    async fn test_not_migrated_and_awaiting_indexer() {
        let (chain, _, checker) = setup();
        assert_eq!(checker.check(&source(), false).await.unwrap(), AccountStatus::NotMigrated);
        assert_eq!(checker.check(&source(), true).await.unwrap(), AccountStatus::AwaitingIndexer);
        // nothing to read until there is a migration block
        assert!(chain.balance_blocks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_migrated_account_is_refused() {
        let (chain, indexer, checker) = setup();
        assert!(checker.ensure_not_migrated(&source()).await.is_ok());

        indexer.accounts.lock().unwrap().insert(source().to_ss58(PREFIX), record());
        assert_matches!(
            checker.ensure_not_migrated(&source()).await,
            Err(MigrationError::AlreadyMigrated(address)) if address == source().to_ss58(PREFIX)
        );
        assert!(chain.balance_blocks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_indexer_failure_is_an_error() {
        let (_, indexer, checker) = setup();
        *indexer.fail.lock().unwrap() = true;
        assert_matches!(
            checker.check(&source(), true).await,
            Err(MigrationError::IndexerQuery(IndexerError::Status(503)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_polls_until_indexed() {
        let (_, indexer, checker) = setup();
        let mut watch = checker.watch(source(), true).await.unwrap();
        assert_eq!(watch.current(), AccountStatus::AwaitingIndexer);
        assert!(watch.is_polling());

        time::sleep(PERIOD * 2 + PERIOD / 2).await;
        assert_eq!(indexer.queries.load(Ordering::SeqCst), 3);

        indexer.accounts.lock().unwrap().insert(source().to_ss58(PREFIX), record());
        assert_matches!(watch.settled().await, Some(AccountStatus::Migrated { .. }));

        let settled_at = indexer.queries.load(Ordering::SeqCst);
        time::sleep(PERIOD * 3).await;
        assert_eq!(indexer.queries.load(Ordering::SeqCst), settled_at);
        assert!(!watch.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_status_is_not_polled() {
        let (_, indexer, checker) = setup();
        let watch = checker.watch(source(), false).await.unwrap();
        assert_eq!(watch.current(), AccountStatus::NotMigrated);
        assert!(!watch.is_polling());
        time::sleep(PERIOD * 2).await;
        assert_eq!(indexer.queries.load(Ordering::SeqCst), 1);
    }
}
