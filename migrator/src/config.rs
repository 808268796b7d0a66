use {
    crate::{
        error::MigrationError,
        networks::{self, NetworkConfig},
    },
    darwinia_migration_sdk::{
        account_migration::{call::CallIndices, storage::StorageHasher},
        AccountId20,
    },
    log::*,
    serde_derive::{Deserialize, Serialize},
    std::{
        env,
        fs::File,
        io,
        path::{Path, PathBuf},
        time::Duration,
    },
};

pub const CONFIG_FILE_ENV: &str = "DARWINIA_MIGRATOR_CONFIG";

fn load_config_file<T, P>(config_file: P) -> Result<T, io::Error>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(config_file)?;
    let config = serde_yaml::from_reader(file)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, format!("{err:?}")))?;
    Ok(config)
}

fn config_dir() -> PathBuf {
    match dirs_next::home_dir() {
        Some(mut home) => {
            home.push(".config");
            home
        }
        None => PathBuf::from("."),
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub network: String,
    pub substrate_ws_url: Option<String>,
    pub substrate_http_url: Option<String>,
    pub evm_rpc_url: Option<String>,
    pub graphql_url: Option<String>,
    pub multisig_contract: Option<String>,
    pub storage_path: String,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub account_migration_pallet_index: u8,
    pub migrate_call_index: u8,
    pub migrate_multisig_call_index: u8,
    pub complete_multisig_migration_call_index: u8,
    pub storage_hasher: String,
    pub share_link_base: String,
    pub receipt_poll_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        let indices = CallIndices::default();
        let storage_path = config_dir()
            .join("darwinia-migrator")
            .join("store.json")
            .to_string_lossy()
            .into_owned();

        Self {
            network: "darwinia".to_string(),
            substrate_ws_url: None,
            substrate_http_url: None,
            evm_rpc_url: None,
            graphql_url: None,
            multisig_contract: None,
            storage_path,
            poll_interval_secs: 5,
            request_timeout_secs: 30,
            account_migration_pallet_index: indices.pallet,
            migrate_call_index: indices.migrate,
            migrate_multisig_call_index: indices.migrate_multisig,
            complete_multisig_migration_call_index: indices.complete_multisig_migration,
            storage_hasher: "identity".to_string(),
            share_link_base: "https://migration.darwinia.network/#/multisig-account-migration-summary"
                .to_string(),
            receipt_poll_attempts: 60,
        }
    }
}

impl Config {
    /// Load a configuration from file.
    ///
    /// # Errors
    ///
    /// This function may return typical file I/O errors.
    pub fn load(config_file: &str) -> Result<Self, io::Error> {
        load_config_file(config_file)
    }

    pub fn default_path() -> PathBuf {
        config_dir().join("darwinia-migrator.yml")
    }

    /// Loads `path`, else `$DARWINIA_MIGRATOR_CONFIG`, else the default
    /// path. Only an absent default file yields the defaults; a named file
    /// that is missing or malformed is an error.
    pub fn load_or_default(path: Option<&str>) -> Result<Self, MigrationError> {
        let path = match path.map(str::to_string).or_else(|| env::var(CONFIG_FILE_ENV).ok()) {
            Some(path) => path,
            None => {
                let path = Self::default_path();
                if !path.exists() {
                    debug!("no config at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path.to_string_lossy().into_owned()
            }
        };
        let config = Self::load(&path).map_err(|e| MigrationError::Config(format!("{path}: {e}")))?;
        debug!("loaded config from {}", path);
        Ok(config)
    }

    /// Resolves the network table entry and applies the overrides.
    pub fn resolve(&self) -> Result<Settings, MigrationError> {
        let supported = networks::supported_networks();
        let network = networks::find_network(&supported, &self.network)
            .cloned()
            .ok_or_else(|| MigrationError::Config(format!("unknown network {}", self.network)))?;

        let storage_hasher = self
            .storage_hasher
            .parse::<StorageHasher>()
            .map_err(MigrationError::Config)?;
        let multisig_contract = self
            .multisig_contract
            .as_deref()
            .unwrap_or(&network.multisig_contract)
            .parse::<AccountId20>()?;
        if self.poll_interval_secs == 0 {
            return Err(MigrationError::Config("poll_interval_secs must be positive".to_string()));
        }

        let http_url = network.https_url().to_string();
        Ok(Settings {
            substrate_ws_url: self
                .substrate_ws_url
                .clone()
                .unwrap_or_else(|| network.wss_url.clone()),
            substrate_http_url: self
                .substrate_http_url
                .clone()
                .unwrap_or_else(|| http_url.clone()),
            evm_rpc_url: self.evm_rpc_url.clone().unwrap_or(http_url),
            graphql_url: self
                .graphql_url
                .clone()
                .unwrap_or_else(|| network.graphql_url.clone()),
            multisig_contract,
            storage_path: PathBuf::from(&self.storage_path),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            call_indices: CallIndices {
                pallet: self.account_migration_pallet_index,
                migrate: self.migrate_call_index,
                migrate_multisig: self.migrate_multisig_call_index,
                complete_multisig_migration: self.complete_multisig_migration_call_index,
            },
            storage_hasher,
            share_link_base: self.share_link_base.clone(),
            receipt_poll_attempts: self.receipt_poll_attempts,
            network,
        })
    }
}

/// Everything the clients need, with defaults and overrides applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub network: NetworkConfig,
    pub substrate_ws_url: String,
    pub substrate_http_url: String,
    pub evm_rpc_url: String,
    pub graphql_url: String,
    pub multisig_contract: AccountId20,
    pub storage_path: PathBuf,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub call_indices: CallIndices,
    pub storage_hasher: StorageHasher,
    pub share_link_base: String,
    pub receipt_poll_attempts: u32,
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches, std::io::Write};

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "network: pangoro\npoll_interval_secs: 2").unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.network, "pangoro");
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.storage_hasher, "identity");
    }

    #[test]
    fn test_named_file_must_load() {
        assert_matches!(
            Config::load_or_default(Some("/nonexistent/darwinia-migrator.yml")),
            Err(MigrationError::Config(_))
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "network: [crab").unwrap();
        assert_matches!(
            Config::load_or_default(file.path().to_str()),
            Err(MigrationError::Config(reason)) if reason.contains(file.path().to_str().unwrap())
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "network: crab").unwrap();
        assert_eq!(Config::load_or_default(file.path().to_str()).unwrap().network, "crab");
    }

    #[test]
    fn test_resolve_uses_network_table() {
        let settings = Config::default().resolve().unwrap();
        assert_eq!(settings.network.chain_id, 46);
        assert_eq!(settings.substrate_ws_url, "wss://rpc.darwinia.network");
        assert_eq!(settings.evm_rpc_url, "https://rpc.darwinia.network");
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.call_indices, CallIndices::default());
        assert_eq!(settings.storage_hasher, StorageHasher::Identity);
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let config = Config {
            network: "Crab".to_string(),
            evm_rpc_url: Some("http://127.0.0.1:9933".to_string()),
            storage_hasher: "blake2_128_concat".to_string(),
            migrate_multisig_call_index: 7,
            ..Config::default()
        };
        let settings = config.resolve().unwrap();
        assert_eq!(settings.network.prefix, 42);
        assert_eq!(settings.evm_rpc_url, "http://127.0.0.1:9933");
        assert_eq!(settings.substrate_http_url, "https://crab-rpc.darwinia.network");
        assert_eq!(settings.storage_hasher, StorageHasher::Blake2_128Concat);
        assert_eq!(settings.call_indices.migrate_multisig, 7);
    }

    #[test]
    fn test_resolve_rejects_unknown_network() {
        let config = Config {
            network: "kusama".to_string(),
            ..Config::default()
        };
        assert_matches!(config.resolve(), Err(MigrationError::Config(_)));
    }
}
