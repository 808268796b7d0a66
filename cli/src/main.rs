mod app;
mod command;

use {
    crate::{
        app::{app, seeds, SEED_ENV},
        command::{link_network, notification, process_command, Context},
    },
    clap::{crate_version, ArgMatches},
    darwinia_migrator::config::Config,
    log::*,
    std::{env, error, process::exit},
};

/// Global arguments land in the subcommand matches when given after it.
fn global<'a>(matches: &'a ArgMatches, sub: &'a ArgMatches, name: &str) -> Option<&'a str> {
    sub.value_of(name).or_else(|| matches.value_of(name))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn error::Error>> {
    darwinia_migration_logger::setup_with_default("info");

    let matches = app(crate_version!()).get_matches();
    let (name, sub) = match matches.subcommand() {
        (name, Some(sub)) => (name, sub),
        _ => {
            eprintln!("{}", matches.usage());
            exit(1);
        }
    };

    let mut config = Config::load_or_default(global(&matches, sub, "config_file"))?;
    if let Some(network) = global(&matches, sub, "network") {
        config.network = network.to_string();
    } else if let Some(network) = sub.value_of("url").and_then(link_network) {
        config.network = network;
    }
    let settings = config.resolve()?;
    info!("using network {}", settings.network.display_name);

    let mut ctx = Context::new(settings, &seeds(sub, env::var(SEED_ENV).ok()))?;

    if let Err(e) = process_command(&mut ctx, name, sub).await {
        error!("{} failed: {:?}", name, e);
        eprintln!("{}", notification(name, &e));
        exit(1);
    }
    Ok(())
}
