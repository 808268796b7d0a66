use clap::{crate_description, App, AppSettings, Arg, ArgMatches, SubCommand};

pub const SEED_ENV: &str = "DARWINIA_MIGRATOR_SEED";
pub const EVM_KEY_ENV: &str = "DARWINIA_MIGRATOR_EVM_KEY";

fn address_arg<'a, 'b>(help: &'b str) -> Arg<'a, 'b> {
    Arg::with_name("address")
        .long("address")
        .value_name("ADDRESS")
        .takes_value(true)
        .required(true)
        .help(help)
}

fn evm_account_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("evm_account")
        .long("evm-account")
        .value_name("EVM_ADDRESS")
        .takes_value(true)
        .help("Your own account on the destination chain")
}

fn member_arg<'a, 'b>(name: &'a str, long: &'b str, help: &'b str) -> Arg<'a, 'b> {
    Arg::with_name(name)
        .long(long)
        .value_name("ADDRESS")
        .takes_value(true)
        .multiple(true)
        .number_of_values(1)
        .help(help)
}

fn threshold_arg<'a, 'b>(name: &'a str, long: &'b str, help: &'b str) -> Arg<'a, 'b> {
    Arg::with_name(name)
        .long(long)
        .value_name("NUMBER")
        .takes_value(true)
        .validator(|value| {
            value
                .parse::<u16>()
                .map(|_| ())
                .map_err(|e| format!("invalid threshold {value}: {e}"))
        })
        .help(help)
}

pub fn app<'a, 'b>(version: &'b str) -> App<'a, 'b> {
    App::new("darwinia-migrator")
        .about(crate_description!())
        .version(version)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("config_file")
                .short("C")
                .long("config")
                .value_name("FILEPATH")
                .takes_value(true)
                .global(true)
                .help("Configuration file to use"),
        )
        .arg(
            Arg::with_name("network")
                .short("n")
                .long("network")
                .value_name("NAME")
                .takes_value(true)
                .global(true)
                .help("Network to use, overriding the configuration file"),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .value_name("HEX")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .global(true)
                .help("sr25519 mini secret key to sign with; also read from DARWINIA_MIGRATOR_SEED"),
        )
        .subcommand(
            SubCommand::with_name("status")
                .about("Show the migration status of a multisig account")
                .arg(
                    Arg::with_name("address")
                        .index(1)
                        .value_name("ADDRESS")
                        .required(true)
                        .help("Source multisig account"),
                )
                .arg(
                    Arg::with_name("just_migrated")
                        .long("just-migrated")
                        .help("A migration was just submitted; wait for the indexer"),
                )
                .arg(
                    Arg::with_name("watch")
                        .long("watch")
                        .help("Keep polling until the status is settled"),
                ),
        )
        .subcommand(
            SubCommand::with_name("account-status")
                .about("Show the migration status of a single account")
                .arg(
                    Arg::with_name("address")
                        .index(1)
                        .value_name("ADDRESS")
                        .required(true)
                        .help("Source account"),
                )
                .arg(
                    Arg::with_name("just_migrated")
                        .long("just-migrated")
                        .help("A migration was just submitted; wait for the indexer"),
                )
                .arg(
                    Arg::with_name("watch")
                        .long("watch")
                        .help("Keep polling until the indexer has the migration"),
                ),
        )
        .subcommand(
            SubCommand::with_name("balance")
                .about("Show the RING and KTON balances of a source account")
                .arg(
                    Arg::with_name("address")
                        .index(1)
                        .value_name("ADDRESS")
                        .required(true)
                        .help("Source account"),
                )
                .arg(
                    Arg::with_name("at")
                        .long("at")
                        .value_name("BLOCK_HASH")
                        .takes_value(true)
                        .help("Read the balances at this block"),
                ),
        )
        .subcommand(
            SubCommand::with_name("migrate")
                .about("Migrate a single account")
                .arg(
                    Arg::with_name("from")
                        .long("from")
                        .value_name("ADDRESS")
                        .takes_value(true)
                        .required(true)
                        .help("Source account, held by one of the seeds"),
                )
                .arg(
                    Arg::with_name("to")
                        .long("to")
                        .value_name("EVM_ADDRESS")
                        .takes_value(true)
                        .required(true)
                        .help("Unused destination account"),
                ),
        )
        .subcommand(
            SubCommand::with_name("multisig-add")
                .about("Add a multisig account to the local registry")
                .arg(
                    Arg::with_name("name")
                        .long("name")
                        .value_name("NAME")
                        .takes_value(true)
                        .required(true)
                        .help("Display name"),
                )
                .arg(threshold_arg("threshold", "threshold", "Approvals the multisig needs").required(true))
                .arg(
                    Arg::with_name("initializer")
                        .long("initializer")
                        .value_name("ADDRESS")
                        .takes_value(true)
                        .required(true)
                        .help("Member that starts the migration"),
                )
                .arg(member_arg("member", "member", "Other member of the multisig").required(true)),
        )
        .subcommand(SubCommand::with_name("multisig-list").about("List the registered multisig accounts"))
        .subcommand(
            SubCommand::with_name("multisig-migrate")
                .about("Start the migration of a registered multisig account")
                .arg(address_arg("Registered multisig account"))
                .arg(
                    Arg::with_name("to")
                        .long("to")
                        .value_name("EVM_ADDRESS")
                        .takes_value(true)
                        .conflicts_with("destination_member")
                        .required_unless("destination_member")
                        .help("General destination account"),
                )
                .arg(evm_account_arg())
                .arg(
                    member_arg(
                        "destination_member",
                        "destination-member",
                        "Member of a multisig destination",
                    )
                    .requires("destination_threshold"),
                )
                .arg(
                    threshold_arg(
                        "destination_threshold",
                        "destination-threshold",
                        "Threshold of the multisig destination",
                    )
                    .requires("destination_member"),
                ),
        )
        .subcommand(
            SubCommand::with_name("approve")
                .about("Approve a pending multisig migration")
                .arg(address_arg("Source multisig account"))
                .arg(
                    Arg::with_name("signer")
                        .long("signer")
                        .value_name("ADDRESS")
                        .takes_value(true)
                        .required(true)
                        .help("Member approving, held by one of the seeds"),
                ),
        )
        .subcommand(
            SubCommand::with_name("compute-address")
                .about("Compute the address of a multisig destination")
                .arg(address_arg("Source multisig account"))
                .arg(evm_account_arg())
                .arg(member_arg("member", "member", "Destination member").required(true))
                .arg(threshold_arg("threshold", "threshold", "Destination threshold").required(true)),
        )
        .subcommand(
            SubCommand::with_name("deploy")
                .about("Deploy the multisig destination of a migrated account")
                .arg(address_arg("Source multisig account"))
                .arg(
                    Arg::with_name("evm_key")
                        .long("evm-key")
                        .value_name("HEX")
                        .takes_value(true)
                        .help("Secret key of the destination account paying for the deployment"),
                )
                .arg(member_arg(
                    "member",
                    "member",
                    "Destination member; defaults to the indexed destination",
                ))
                .arg(
                    threshold_arg("threshold", "threshold", "Destination threshold")
                        .requires("member"),
                ),
        )
        .subcommand(
            SubCommand::with_name("open-link")
                .about("Show the multisig migration a share link points at")
                .arg(
                    Arg::with_name("url")
                        .index(1)
                        .value_name("URL")
                        .required(true)
                        .help("Link or query string shared by another member"),
                ),
        )
        .subcommand(
            SubCommand::with_name("share-link")
                .about("Print a link other members can open")
                .arg(address_arg("Registered multisig account"))
                .arg(
                    Arg::with_name("base")
                        .long("base")
                        .value_name("URL")
                        .takes_value(true)
                        .help("Page the link points at, overriding the configuration"),
                ),
        )
}

/// Seeds from the command line, else from the environment.
pub fn seeds(matches: &ArgMatches, env_value: Option<String>) -> Vec<String> {
    if let Some(values) = matches.values_of("seed") {
        return values.map(str::to_string).collect();
    }
    env_value
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|seed| !seed.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Deployment key from the command line, else from the environment.
pub fn evm_key(matches: &ArgMatches, env_value: Option<String>) -> Option<String> {
    matches
        .value_of("evm_key")
        .map(str::to_string)
        .or_else(|| env_value.map(|value| value.trim().to_string()))
        .filter(|key| !key.is_empty())
}
