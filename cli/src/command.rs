use {
    crate::app::{evm_key, EVM_KEY_ENV},
    clap::ArgMatches,
    darwinia_migration_sdk::{
        account_migration::state::MultisigParams,
        address::{convert_to_ss58, multisig_account_id},
        AccountId20, AccountId32,
    },
    darwinia_migrator::{
        account_status::{AccountStatus, AccountStatusChecker},
        approval::ApprovalCollector,
        config::Settings,
        destination::{compute_destination, deploy_destination, DestinationRequest},
        error::{MigrationError, Result},
        evm::{CodeProbe, EvmClient, MultisigFactoryContract},
        indexer::{GraphQlIndexer, MigrationIndexer},
        ledger::{fetch_asset_distribution, format_balance, AssetDetail},
        migration::{Migrator, MultisigMigrationRequest},
        networks::{self, initial_wallet_params, NetworkConfig, Token},
        reconciler::{Deployment, MemberApproval, MigrationStatus, StatusReconciler},
        registry::MultisigRegistry,
        rpc::{HttpClient, WsClient},
        session::Session,
        share_link::{resolve_destination, ShareLink},
        signer::{EvmKey, Keyring, MessageSigner},
        source_chain::{SourceChain, SubstrateClient},
        store::{LocalStore, MultisigAccount},
    },
    log::*,
    std::{fmt::Write, sync::Arc},
};

const BALANCE_PRECISION: u8 = 4;

/// Clients and state shared by every subcommand.
pub struct Context {
    pub settings: Settings,
    pub session: Session,
    pub store: Arc<LocalStore>,
    pub keyring: Arc<Keyring>,
    pub chain: Arc<SubstrateClient>,
    pub indexer: Arc<GraphQlIndexer>,
    pub evm: Arc<EvmClient>,
    pub factory: MultisigFactoryContract,
}

impl Context {
    pub fn new(settings: Settings, seeds: &[String]) -> Result<Self> {
        let timeout = settings.request_timeout;
        let store = Arc::new(LocalStore::new(&settings.storage_path));
        let keyring = Arc::new(Keyring::from_seeds(seeds)?);
        let chain = Arc::new(SubstrateClient::new(
            HttpClient::new(&settings.substrate_http_url, timeout)?,
            WsClient::new(&settings.substrate_ws_url, timeout),
            settings.storage_hasher,
        ));
        let indexer = Arc::new(GraphQlIndexer::new(&settings.graphql_url, timeout)?);
        let evm = Arc::new(EvmClient::new(HttpClient::new(&settings.evm_rpc_url, timeout)?));
        let factory =
            MultisigFactoryContract::new(evm.clone(), settings.multisig_contract, settings.receipt_poll_attempts);

        let session = Session::new(settings.network.clone());
        if !keyring.is_empty() {
            if let Err(e) = session.persist(&store, keyring.name()) {
                warn!("could not record the session: {:?}", e);
            }
        }
        debug!(
            "{} via {} with {} signing accounts",
            settings.network.name,
            settings.substrate_http_url,
            keyring.accounts().len()
        );

        Ok(Self {
            settings,
            session,
            store,
            keyring,
            chain,
            indexer,
            evm,
            factory,
        })
    }

    fn prefix(&self) -> u16 {
        self.session.prefix()
    }

    fn reconciler(&self) -> Arc<StatusReconciler> {
        Arc::new(
            StatusReconciler::new(
                self.chain.clone(),
                self.indexer.clone(),
                self.evm.clone(),
                self.prefix(),
                self.settings.poll_interval,
            )
            .with_store(self.store.clone()),
        )
    }

    fn account_status(&self) -> Arc<AccountStatusChecker> {
        Arc::new(AccountStatusChecker::new(
            self.chain.clone(),
            self.indexer.clone(),
            self.prefix(),
            self.settings.poll_interval,
        ))
    }

    fn migrator(&self) -> Migrator {
        Migrator::new(self.chain.clone(), self.keyring.clone(), self.settings.call_indices)
            .with_store(self.store.clone())
    }

    fn registry(&self) -> MultisigRegistry {
        MultisigRegistry::new(self.chain.clone(), self.store.clone(), self.prefix())
    }

    /// Registered multisig matching `address` in any ss58 encoding.
    fn registered(&self, address: &str) -> Result<MultisigAccount> {
        let wanted: AccountId32 = address.parse()?;
        self.registry()
            .list()?
            .into_iter()
            .find(|account| account.address.parse::<AccountId32>().ok() == Some(wanted))
            .ok_or_else(|| MigrationError::AccountNotFound(address.to_string()))
    }

    fn share_link(&self, account: &MultisigAccount, base: &str) -> Result<String> {
        let link = ShareLink {
            address: Some(account.address.clone()),
            name: Some(account.meta.name.clone()),
            initializer: Some(account.meta.initializer.clone()),
            who: account.meta.who.clone(),
            threshold: Some(account.meta.threshold),
            network: Some(self.settings.network.name.clone()),
            ..ShareLink::default()
        };
        let (link, _) = resolve_destination(link, &self.store, &account.address)?;
        Ok(link.to_url(base))
    }
}

fn threshold(matches: &ArgMatches, name: &str) -> Result<u16> {
    let value = required(matches, name)?;
    value
        .parse()
        .map_err(|e| MigrationError::Config(format!("invalid threshold {value}: {e}")))
}

fn values(matches: &ArgMatches, name: &str) -> Vec<String> {
    matches
        .values_of(name)
        .map(|values| values.map(str::to_string).collect())
        .unwrap_or_default()
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .value_of(name)
        .ok_or_else(|| MigrationError::Config(format!("missing argument {name}")))
}

fn evm_account(matches: &ArgMatches) -> Result<Option<AccountId20>> {
    Ok(matches
        .value_of("evm_account")
        .map(str::parse::<AccountId20>)
        .transpose()?)
}

pub async fn process_command(ctx: &mut Context, name: &str, matches: &ArgMatches<'_>) -> Result<()> {
    match name {
        "status" => status(ctx, matches).await,
        "account-status" => account_status(ctx, matches).await,
        "balance" => balance(ctx, matches).await,
        "migrate" => migrate(ctx, matches).await,
        "multisig-add" => multisig_add(ctx, matches).await,
        "multisig-list" => multisig_list(ctx),
        "multisig-migrate" => multisig_migrate(ctx, matches).await,
        "approve" => approve(ctx, matches).await,
        "compute-address" => compute_address(ctx, matches).await,
        "deploy" => deploy(ctx, matches).await,
        "share-link" => share_link(ctx, matches),
        "open-link" => open_link(ctx, matches).await,
        _ => Err(MigrationError::Config(format!("unknown command {name}"))),
    }
}

async fn status(ctx: &Context, matches: &ArgMatches<'_>) -> Result<()> {
    let source: AccountId32 = required(matches, "address")?.parse()?;
    let just_migrated = matches.is_present("just_migrated");
    let reconciler = ctx.reconciler();

    if !matches.is_present("watch") {
        let status = reconciler.check(&source, just_migrated).await?;
        print!("{}", render_status(&status));
        return Ok(());
    }

    let mut watch = reconciler.watch(source, just_migrated).await?;
    print!("{}", render_status(&watch.current()));
    if watch.is_polling() {
        if let Some(status) = watch.settled().await {
            print!("{}", render_status(&status));
        }
    }
    Ok(())
}

async fn account_status(ctx: &Context, matches: &ArgMatches<'_>) -> Result<()> {
    let source: AccountId32 = required(matches, "address")?.parse()?;
    let just_migrated = matches.is_present("just_migrated");
    let checker = ctx.account_status();
    let network = &ctx.settings.network;

    if !matches.is_present("watch") {
        let status = checker.check(&source, just_migrated).await?;
        print!("{}", render_account_status(network, &status));
        return Ok(());
    }

    let mut watch = checker.watch(source, just_migrated).await?;
    print!("{}", render_account_status(network, &watch.current()));
    if watch.is_polling() {
        if let Some(status) = watch.settled().await {
            print!("{}", render_account_status(network, &status));
        }
    }
    Ok(())
}

async fn balance(ctx: &Context, matches: &ArgMatches<'_>) -> Result<()> {
    let who: AccountId32 = required(matches, "address")?.parse()?;
    let distribution = fetch_asset_distribution(ctx.chain.as_ref(), &who, matches.value_of("at")).await?;
    let network = &ctx.settings.network;
    print!("{}", render_asset(&network.ring, &distribution.ring));
    print!("{}", render_asset(&network.kton, &distribution.kton));
    Ok(())
}

async fn migrate(ctx: &mut Context, matches: &ArgMatches<'_>) -> Result<()> {
    let from: AccountId32 = required(matches, "from")?.parse()?;
    let to: AccountId20 = required(matches, "to")?.parse()?;
    ctx.session.select_account(from);
    let checker = ctx.account_status();
    match checker.ensure_not_migrated(&from).await {
        Err(MigrationError::IndexerQuery(e)) => {
            // the chain rejects a second migration on its own
            warn!("could not check earlier migrations of {}: {}", from, e)
        }
        result => result?,
    }

    let block = ctx.migrator().init_migration(&mut ctx.session, &from, &to).await?;
    println!("migrated {} to {} in block {}", from.to_ss58(ctx.prefix()), to, block);
    let status = checker.check(&from, ctx.session.just_migrated).await?;
    print!("{}", render_account_status(&ctx.settings.network, &status));
    Ok(())
}

async fn multisig_add(ctx: &Context, matches: &ArgMatches<'_>) -> Result<()> {
    let account = ctx
        .registry()
        .add(
            required(matches, "name")?,
            required(matches, "initializer")?,
            &values(matches, "member"),
            threshold(matches, "threshold")?,
        )
        .await?;
    println!("added {} ({})", account.address, account.meta.name);
    Ok(())
}

fn multisig_list(ctx: &Context) -> Result<()> {
    let accounts = ctx.registry().list()?;
    if accounts.is_empty() {
        println!("no multisig accounts registered");
    }
    for account in accounts {
        println!(
            "{} {} ({}-of-{})",
            account.address,
            account.meta.name,
            account.meta.threshold,
            account.meta.who.len()
        );
        for member in &account.meta.who {
            let marker = if *member == account.meta.initializer { "*" } else { " " };
            println!("  {marker} {member}");
        }
    }
    Ok(())
}

async fn multisig_migrate(ctx: &mut Context, matches: &ArgMatches<'_>) -> Result<()> {
    let account = ctx.registered(required(matches, "address")?)?;
    let members = account
        .meta
        .who
        .iter()
        .map(|member| member.parse::<AccountId32>())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let initializer: AccountId32 = account.meta.initializer.parse()?;
    let source = multisig_account_id(&members, account.meta.threshold);

    let (to, destination) = match matches.value_of("to") {
        Some(to) => (to.parse::<AccountId20>()?, None),
        None => {
            let request = DestinationRequest {
                source,
                own_evm_account: evm_account(matches)?,
                members: values(matches, "destination_member"),
                threshold: threshold(matches, "destination_threshold")?,
            };
            let address = compute_destination(&ctx.factory, &request).await?;
            let params = MultisigParams {
                address,
                members: request.ordered_members()?,
                threshold: request.threshold,
            };
            (address, Some(params))
        }
    };

    let request = MultisigMigrationRequest {
        initializer,
        members,
        threshold: account.meta.threshold,
        to,
        destination,
    };
    ctx.session.select_account(initializer);
    let block = ctx
        .migrator()
        .init_multisig_migration(&mut ctx.session, &request)
        .await?;
    println!("migration of {} to {} started in block {}", account.address, to, block);

    let status = ctx
        .reconciler()
        .check(&source, ctx.session.multisig_just_migrated)
        .await?;
    print!("{}", render_status(&status));
    let url = ctx.share_link(&account, &ctx.settings.share_link_base)?;
    println!("share with the other members: {url}");
    Ok(())
}

async fn approve(ctx: &mut Context, matches: &ArgMatches<'_>) -> Result<()> {
    let source: AccountId32 = required(matches, "address")?.parse()?;
    let signer: AccountId32 = required(matches, "signer")?.parse()?;
    let prefix = ctx.prefix();
    let pending = ctx
        .chain
        .multisig_status(&source)
        .await?
        .ok_or_else(|| MigrationError::NotPending(source.to_ss58(prefix)))?;

    let collector = ApprovalCollector::new(ctx.chain.clone(), ctx.keyring.clone(), ctx.settings.call_indices);
    ctx.session.select_account(signer);
    let block = collector
        .approve(&mut ctx.session, &signer, &source, &pending.to)
        .await?;
    println!("{} approved in block {}", signer.to_ss58(prefix), block);

    let status = ctx
        .reconciler()
        .check(&source, ctx.session.multisig_just_migrated)
        .await?;
    let status = match status {
        MigrationStatus::InProgress {
            destination,
            mut members,
            threshold,
        } => {
            collector.apply_local_approvals(&mut members, prefix);
            MigrationStatus::InProgress {
                destination,
                members,
                threshold,
            }
        }
        status => status,
    };
    print!("{}", render_status(&status));
    Ok(())
}

async fn compute_address(ctx: &Context, matches: &ArgMatches<'_>) -> Result<()> {
    let request = DestinationRequest {
        source: required(matches, "address")?.parse()?,
        own_evm_account: evm_account(matches)?,
        members: values(matches, "member"),
        threshold: threshold(matches, "threshold")?,
    };
    let address = compute_destination(&ctx.factory, &request).await?;
    println!("{address}");
    Ok(())
}

async fn deploy(ctx: &Context, matches: &ArgMatches<'_>) -> Result<()> {
    let source: AccountId32 = required(matches, "address")?.parse()?;
    let key = evm_key(matches, std::env::var(EVM_KEY_ENV).ok())
        .ok_or_else(|| MigrationError::Config(format!("pass --evm-key or set {EVM_KEY_ENV}")))?;
    let key = EvmKey::from_hex(&key)?;
    let from = *key.address();
    info!("deploying from {}", from);

    let request = if matches.is_present("member") {
        DestinationRequest {
            source,
            own_evm_account: Some(from),
            members: values(matches, "member"),
            threshold: threshold(matches, "threshold")?,
        }
    } else {
        // members from a finished migration are final as indexed
        let address = source.to_ss58(ctx.prefix());
        let indexed = ctx
            .indexer
            .multisig_destination_params(&address)
            .await?
            .ok_or_else(|| MigrationError::AddressNotGenerated(format!("no destination indexed for {address}")))?;
        DestinationRequest {
            source,
            own_evm_account: None,
            members: indexed.params.members,
            threshold: u16::try_from(indexed.params.threshold).unwrap_or(u16::MAX),
        }
    };

    let address = compute_destination(&ctx.factory, &request).await?;
    if ctx.evm.has_code(&address).await? {
        println!("{address} is already deployed");
        return Ok(());
    }
    let hash = deploy_destination(&ctx.factory, &request, &key).await?;
    println!("deployed {address} in transaction {hash}");
    Ok(())
}

fn share_link(ctx: &Context, matches: &ArgMatches<'_>) -> Result<()> {
    let account = ctx.registered(required(matches, "address")?)?;
    let base = matches
        .value_of("base")
        .unwrap_or(&ctx.settings.share_link_base);
    println!("{}", ctx.share_link(&account, base)?);
    Ok(())
}

async fn open_link(ctx: &mut Context, matches: &ArgMatches<'_>) -> Result<()> {
    let link = ShareLink::parse(required(matches, "url")?);
    let source: AccountId32 = link
        .address
        .as_deref()
        .ok_or_else(|| MigrationError::Config("the link names no multisig".to_string()))?
        .parse()?;
    let prefix = ctx.prefix();
    if let Some(account) = link.account.as_deref().and_then(|account| account.parse().ok()) {
        ctx.session.select_account(account);
    }

    println!(
        "multisig: {} {}",
        source.to_ss58(prefix),
        link.name.as_deref().unwrap_or_default()
    );
    if let Some(threshold) = link.threshold {
        println!("threshold: {}-of-{}", threshold, link.who.len());
    }
    for member in &link.who {
        let marker = if link.initializer.as_ref() == Some(member) { "*" } else { " " };
        println!("  {marker} {}", convert_to_ss58(member, prefix));
    }

    let (_, destination) = resolve_destination(link, &ctx.store, &source.to_ss58(prefix))?;
    if let Some(destination) = destination {
        println!("destination: {} ({})", destination.address, destination.kind.as_str());
        if !destination.members.is_empty() {
            println!(
                "destination members ({}-of-{}): {}",
                destination.threshold,
                destination.members.len(),
                destination.members.join(", ")
            );
        }
    }

    let status = ctx
        .reconciler()
        .check(&source, ctx.session.multisig_just_migrated)
        .await?;
    print!("{}", render_status(&status));
    if let MigrationStatus::InProgress { .. } = status {
        if let Some(pending) = ctx.chain.multisig_status(&source).await? {
            let collector = ApprovalCollector::new(ctx.chain.clone(), ctx.keyring.clone(), ctx.settings.call_indices);
            for member in collector.approvable_members(&pending) {
                println!("you can approve as {}", member.to_ss58(prefix));
            }
        }
    }
    Ok(())
}

/// Network a share link asks for, if it names one.
pub fn link_network(url: &str) -> Option<String> {
    ShareLink::parse(url).network?;
    let query = url.split_once('?').map_or(url, |(_, query)| query);
    let supported = networks::supported_networks();
    initial_wallet_params(&supported, query)
        .network
        .map(|network| network.name)
}

/// One line for the terminal, worded after the flow that failed.
pub fn notification(command: &str, error: &MigrationError) -> String {
    match error {
        MigrationError::WalletNotInstalled => {
            format!("{error}: pass --seed or set {}", crate::app::SEED_ENV)
        }
        MigrationError::ExtrinsicSubmission(_) => format!("migration failed: {error}"),
        MigrationError::AddressNotGenerated(_) => error.to_string(),
        _ => format!("{command} failed: {error}"),
    }
}

pub fn render_account_status(network: &NetworkConfig, status: &AccountStatus) -> String {
    let mut out = String::new();
    match status {
        AccountStatus::NotMigrated => {
            let _ = writeln!(out, "status: not migrated");
        }
        AccountStatus::AwaitingIndexer => {
            let _ = writeln!(out, "status: migrated, waiting for the indexer");
        }
        AccountStatus::Migrated { record, assets } => {
            let _ = writeln!(out, "status: migrated");
            let _ = writeln!(out, "destination: {}", record.destination);
            let _ = writeln!(out, "transaction: {}", record.transaction_hash);
            let _ = writeln!(out, "block: {} ({})", record.block_number, record.block_time);
            out.push_str(&render_asset(&network.ring, &assets.ring));
            out.push_str(&render_asset(&network.kton, &assets.kton));
        }
    }
    out
}

fn render_asset(token: &Token, detail: &AssetDetail) -> String {
    let amount = |value| format_balance(value, token.ethereum_decimals, BALANCE_PRECISION);
    let mut out = String::new();
    let _ = writeln!(out, "{}: {}", token.symbol, amount(detail.total()));
    for (label, value) in [
        ("transferable", detail.transferable),
        ("deposit", detail.deposit),
        ("bonded", detail.bonded),
        ("unbonded", detail.unbonded),
        ("unbonding", detail.unbonding),
    ] {
        let _ = writeln!(out, "  {label:<13}{}", amount(value));
    }
    out
}

fn render_members(out: &mut String, members: &[MemberApproval], threshold: u16) {
    let approved = members.iter().filter(|member| member.approved).count();
    let _ = writeln!(out, "approvals: {approved}/{threshold}");
    for member in members {
        let marker = if member.approved { "x" } else { " " };
        let _ = writeln!(out, "  [{marker}] {}", member.address);
    }
}

pub fn render_status(status: &MigrationStatus) -> String {
    let mut out = String::new();
    match status {
        MigrationStatus::NotStarted { cached_destination } => {
            let _ = writeln!(out, "status: not started");
            if let Some(destination) = cached_destination {
                let _ = writeln!(out, "last destination: {} ({})", destination.address, destination.kind.as_str());
            }
        }
        MigrationStatus::AwaitingIndexer => {
            let _ = writeln!(out, "status: submitted, waiting for the indexer");
        }
        MigrationStatus::InProgress {
            destination,
            members,
            threshold,
        } => {
            let _ = writeln!(out, "status: in progress");
            let _ = writeln!(out, "destination: {}", destination.address);
            render_members(&mut out, members, *threshold);
        }
        MigrationStatus::Completed {
            destination,
            members,
            threshold,
            deployment,
        } => {
            let _ = writeln!(out, "status: completed");
            let deployment = match deployment {
                Deployment::NotRequired => "general account",
                Deployment::Pending => "multisig, not deployed",
                Deployment::Deployed => "multisig, deployed",
            };
            let _ = writeln!(out, "destination: {} ({deployment})", destination.address);
            if destination.is_multisig() {
                let _ = writeln!(
                    out,
                    "destination members ({}-of-{}): {}",
                    destination.threshold,
                    destination.members.len(),
                    destination.members.join(", ")
                );
            }
            render_members(&mut out, members, *threshold);
        }
    }
    out
}
