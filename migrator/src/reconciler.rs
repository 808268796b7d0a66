//! Multisig migration status.
//!
//! Three sources describe a multisig migration and none of them is
//! complete on its own: the live `Multisigs` record exists only while
//! approvals are being collected, the indexer only learns about the
//! migration after finality (and then lags), and the local cache only
//! knows what this machine submitted. [`reconcile`] folds one snapshot of
//! all of them into a single status; [`StatusReconciler`] takes the
//! snapshots and keeps polling while the indexer catches up.

use {
    crate::{
        error::{MigrationError, Result},
        evm::CodeProbe,
        indexer::{MigrationIndexer, MultisigAccountMigration, MultisigDestinationAccount},
        poller::{PollHandle, ScheduledPoll},
        source_chain::SourceChain,
        store::{Destination, DestinationType, LocalStore},
    },
    darwinia_migration_sdk::{
        account_migration::state::MultisigMigrationDetail, address::convert_to_ss58, AccountId20,
        AccountId32,
    },
    log::*,
    std::{ops::ControlFlow, sync::Arc, time::Duration},
    tokio::sync::watch,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberApproval {
    pub address: String,
    pub approved: bool,
}

/// Where the assets go. `members` is empty and `threshold` zero for a
/// general account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationView {
    pub address: String,
    pub members: Vec<String>,
    pub threshold: u16,
}

impl DestinationView {
    pub fn is_multisig(&self) -> bool {
        !self.members.is_empty()
    }

    /// Indexed params win; a cached multisig for the same address fills in
    /// while the indexer has none.
    fn new(address: String, params: Option<&MultisigDestinationAccount>, cached: Option<&Destination>) -> Self {
        if let Some(params) = params {
            return Self {
                address,
                members: params.params.members.clone(),
                threshold: u16::try_from(params.params.threshold).unwrap_or(u16::MAX),
            };
        }
        match cached_multisig(cached, &address) {
            Some(cached) => Self {
                members: cached.members.clone(),
                threshold: cached.threshold,
                address,
            },
            None => Self {
                address,
                members: vec![],
                threshold: 0,
            },
        }
    }
}

fn cached_multisig<'a>(cached: Option<&'a Destination>, address: &str) -> Option<&'a Destination> {
    cached.filter(|cached| {
        cached.kind == DestinationType::Multisig
            && !cached.members.is_empty()
            && cached.address.eq_ignore_ascii_case(address)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    /// The destination is a plain account.
    NotRequired,
    /// The destination multisig contract has no code yet.
    Pending,
    Deployed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    NotStarted {
        cached_destination: Option<Destination>,
    },
    /// A migration was just submitted but the indexer has not seen it yet.
    AwaitingIndexer,
    InProgress {
        destination: DestinationView,
        members: Vec<MemberApproval>,
        threshold: u16,
    },
    Completed {
        destination: DestinationView,
        members: Vec<MemberApproval>,
        threshold: u16,
        deployment: Deployment,
    },
}

impl MigrationStatus {
    pub fn members(&self) -> &[MemberApproval] {
        match self {
            MigrationStatus::InProgress { members, .. } | MigrationStatus::Completed { members, .. } => members,
            _ => &[],
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, MigrationStatus::AwaitingIndexer)
    }
}

/// One snapshot of everything known about a source account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observations {
    pub live: Option<MultisigMigrationDetail>,
    pub indexed: Option<MultisigAccountMigration>,
    pub destination_params: Option<MultisigDestinationAccount>,
    /// Result of the code probe, when one was made.
    pub destination_has_code: Option<bool>,
    pub cached_destination: Option<Destination>,
    pub just_migrated: bool,
    pub ss58_prefix: u16,
}

impl Observations {
    /// The code probe only matters for a completed migration to a multisig.
    pub fn needs_code_probe(&self) -> bool {
        self.live.is_none() && self.indexed.is_some() && self.destination_is_multisig()
    }

    fn destination_is_multisig(&self) -> bool {
        let indexed = self
            .destination_params
            .as_ref()
            .map_or(false, |params| !params.params.members.is_empty());
        indexed
            || self.indexed.as_ref().map_or(false, |indexed| {
                cached_multisig(self.cached_destination.as_ref(), &indexed.params.to).is_some()
            })
    }
}

fn threshold_u16(threshold: u64) -> u16 {
    u16::try_from(threshold).unwrap_or(u16::MAX)
}

pub fn reconcile(observations: Observations) -> MigrationStatus {
    let Observations {
        live,
        indexed,
        destination_params,
        destination_has_code,
        cached_destination,
        just_migrated,
        ss58_prefix,
    } = observations;

    // the live record reflects the chain head and wins over the indexer
    if let Some(live) = live {
        let members = live
            .members
            .iter()
            .map(|(member, approved)| MemberApproval {
                address: member.to_ss58(ss58_prefix),
                approved: *approved,
            })
            .collect();
        return MigrationStatus::InProgress {
            destination: DestinationView::new(
                live.to.to_checksum(),
                destination_params.as_ref(),
                cached_destination.as_ref(),
            ),
            members,
            threshold: live.threshold,
        };
    }

    if let Some(indexed) = indexed {
        let destination = DestinationView::new(
            indexed.params.to.clone(),
            destination_params.as_ref(),
            cached_destination.as_ref(),
        );
        let deployment = if destination.is_multisig() {
            match destination_has_code {
                Some(true) => Deployment::Deployed,
                _ => Deployment::Pending,
            }
        } else {
            Deployment::NotRequired
        };
        let members = indexed
            .params
            .members
            .iter()
            .map(|(member, approved)| MemberApproval {
                address: convert_to_ss58(member, ss58_prefix),
                approved: *approved,
            })
            .collect();
        return MigrationStatus::Completed {
            destination,
            members,
            threshold: threshold_u16(indexed.params.threshold),
            deployment,
        };
    }

    if just_migrated {
        return MigrationStatus::AwaitingIndexer;
    }
    MigrationStatus::NotStarted { cached_destination }
}

pub struct StatusReconciler {
    chain: Arc<dyn SourceChain>,
    indexer: Arc<dyn MigrationIndexer>,
    probe: Arc<dyn CodeProbe>,
    store: Option<Arc<LocalStore>>,
    ss58_prefix: u16,
    poll_interval: Duration,
}

impl StatusReconciler {
    pub fn new(
        chain: Arc<dyn SourceChain>,
        indexer: Arc<dyn MigrationIndexer>,
        probe: Arc<dyn CodeProbe>,
        ss58_prefix: u16,
        poll_interval: Duration,
    ) -> Self {
        Self {
            chain,
            indexer,
            probe,
            store: None,
            ss58_prefix,
            poll_interval,
        }
    }

    pub fn with_store(mut self, store: Arc<LocalStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn cached_destination(&self, source: &str) -> Option<Destination> {
        let store = self.store.as_ref()?;
        store.cached_destination(source).unwrap_or_else(|e| {
            warn!("destination cache unreadable: {:?}", e);
            None
        })
    }

    /// Queries chain and indexer concurrently. Indexer failures are
    /// tolerated while the live record exists, since it decides the status
    /// on its own.
    pub async fn observe(&self, source: &AccountId32, just_migrated: bool) -> Result<Observations> {
        let address = source.to_ss58(self.ss58_prefix);
        let (live, indexed, destination_params) = tokio::join!(
            self.chain.multisig_status(source),
            self.indexer.multisig_migration(&address),
            self.indexer.multisig_destination_params(&address),
        );

        let live = live.map_err(|e| {
            warn!("multisig status of {} unavailable: {:?}", address, e);
            MigrationError::ChainQuery(e)
        })?;
        let (indexed, destination_params) = if live.is_some() {
            let indexed = indexed.unwrap_or_else(|e| {
                warn!("ignoring indexer failure for {}: {:?}", address, e);
                None
            });
            let destination_params = destination_params.unwrap_or_else(|e| {
                warn!("ignoring destination params failure for {}: {:?}", address, e);
                None
            });
            (indexed, destination_params)
        } else {
            (indexed?, destination_params?)
        };

        // the cache stands in for destination params the indexer lacks
        let cached_destination = if destination_params.is_none() {
            self.cached_destination(&address)
        } else {
            None
        };
        let mut observations = Observations {
            live,
            indexed,
            destination_params,
            destination_has_code: None,
            cached_destination,
            just_migrated,
            ss58_prefix: self.ss58_prefix,
        };

        if observations.needs_code_probe() {
            if let Some(indexed) = observations.indexed.as_ref() {
                let destination: AccountId20 = indexed.params.to.parse()?;
                observations.destination_has_code = Some(self.probe.has_code(&destination).await?);
            }
        }
        Ok(observations)
    }

    pub async fn check(&self, source: &AccountId32, just_migrated: bool) -> Result<MigrationStatus> {
        let status = reconcile(self.observe(source, just_migrated).await?);
        info!("status of {}: {:?}", source.to_ss58(self.ss58_prefix), status);
        Ok(status)
    }

    /// Checks once and, while the indexer is behind, keeps re-checking
    /// every poll interval until the record shows up.
    pub async fn watch(self: &Arc<Self>, source: AccountId32, just_migrated: bool) -> Result<StatusWatch> {
        let initial = self.check(&source, just_migrated).await?;
        if initial.is_settled() {
            return Ok(StatusWatch::settled_now(initial));
        }

        let reconciler = self.clone();
        let (handle, updates) = ScheduledPoll::new(self.poll_interval)
            .on_teardown(move || debug!("status poll of {} stopped", source))
            .spawn(move || {
                let reconciler = reconciler.clone();
                async move {
                    match reconciler.check(&source, just_migrated).await {
                        Ok(status) if status.is_settled() => ControlFlow::Break(status),
                        Ok(_) => ControlFlow::Continue(()),
                        Err(e) => {
                            warn!("status poll failed, retrying: {}", e);
                            ControlFlow::Continue(())
                        }
                    }
                }
            });
        Ok(StatusWatch::polling(initial, updates, handle))
    }
}

/// A status plus the poll that refreshes it. Dropping it stops the poll.
pub struct StatusWatch<S = MigrationStatus> {
    initial: S,
    updates: watch::Receiver<Option<S>>,
    handle: Option<PollHandle>,
}

impl<S: Clone> StatusWatch<S> {
    /// A status that needs no further polling.
    pub(crate) fn settled_now(status: S) -> Self {
        let (_, updates) = watch::channel(Some(status.clone()));
        Self {
            initial: status,
            updates,
            handle: None,
        }
    }

    pub(crate) fn polling(initial: S, updates: watch::Receiver<Option<S>>, handle: PollHandle) -> Self {
        Self {
            initial,
            updates,
            handle: Some(handle),
        }
    }

    pub fn current(&self) -> S {
        self.updates
            .borrow()
            .clone()
            .unwrap_or_else(|| self.initial.clone())
    }

    pub fn is_polling(&self) -> bool {
        self.handle.as_ref().map_or(false, |handle| !handle.is_finished())
    }

    /// Resolves once the status is settled; `None` if the poll was
    /// cancelled first.
    pub async fn settled(&mut self) -> Option<S> {
        loop {
            if let Some(status) = self.updates.borrow_and_update().clone() {
                return Some(status);
            }
            if self.updates.changed().await.is_err() {
                return self.updates.borrow().clone();
            }
        }
    }

    pub fn cancel(&self) {
        if let Some(handle) = &self.handle {
            handle.cancel();
        }
    }
}

/// Follows one source account at a time; tracking another account stops
/// the previous poll.
#[derive(Default)]
pub struct StatusTracker {
    current: Option<(AccountId32, StatusWatch)>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn track(
        &mut self,
        reconciler: &Arc<StatusReconciler>,
        source: AccountId32,
        just_migrated: bool,
    ) -> Result<MigrationStatus> {
        self.stop();
        let watch = reconciler.watch(source, just_migrated).await?;
        let status = watch.current();
        self.current = Some((source, watch));
        Ok(status)
    }

    pub fn source(&self) -> Option<&AccountId32> {
        self.current.as_ref().map(|(source, _)| source)
    }

    pub fn status(&self) -> Option<MigrationStatus> {
        self.current.as_ref().map(|(_, watch)| watch.current())
    }

    pub fn watch_mut(&mut self) -> Option<&mut StatusWatch> {
        self.current.as_mut().map(|(_, watch)| watch)
    }

    pub fn stop(&mut self) {
        if let Some((source, watch)) = self.current.take() {
            debug!("no longer tracking {}", source);
            watch.cancel();
        }
    }
}
