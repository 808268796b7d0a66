//! Small JSON document on disk standing in for the browser's local storage.
//!
//! Every write reads the document, replaces one key and writes it back.
//! Concurrent writers are not coordinated; the last write wins.

use {
    crate::error::StoreError,
    log::*,
    serde::de::DeserializeOwned,
    serde_derive::{Deserialize, Serialize},
    serde_json::{Map, Value},
    std::{
        collections::BTreeMap,
        fs, io,
        path::{Path, PathBuf},
    },
};

pub const SELECTED_WALLET: &str = "selectedWallet";
pub const IS_CONNECTED_TO_WALLET: &str = "isConnectedToWallet";
pub const SELECTED_NETWORK: &str = "selectedNetwork";
pub const MULTISIG_ACCOUNTS: &str = "multisigAccounts";
pub const DESTINATION_INFO: &str = "destinationInfo";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MultisigMeta {
    pub name: String,
    pub who: Vec<String>,
    pub threshold: u16,
    pub initializer: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MultisigAccount {
    pub address: String,
    pub meta: MultisigMeta,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationType {
    #[serde(rename = "General Account")]
    General,
    #[serde(rename = "Multisig Account")]
    Multisig,
}

impl DestinationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationType::General => "General Account",
            DestinationType::Multisig => "Multisig Account",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "General Account" => Some(DestinationType::General),
            "Multisig Account" => Some(DestinationType::Multisig),
            _ => None,
        }
    }
}

/// Destination chosen for a source account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub address: String,
    #[serde(rename = "type")]
    pub kind: DestinationType,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub threshold: u16,
}

impl Destination {
    pub fn general(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            kind: DestinationType::General,
            members: vec![],
            threshold: 0,
        }
    }

    pub fn multisig(address: impl Into<String>, members: Vec<String>, threshold: u16) -> Self {
        Self {
            address: address.into(),
            kind: DestinationType::Multisig,
            members,
            threshold,
        }
    }
}

pub type DestinationInfo = BTreeMap<String, Destination>;

#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(document)?)?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut document = self.read_document()?;
        match document.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    pub fn set<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let mut document = self.read_document()?;
        document.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_document(&document)?;
        debug!("store {}: wrote {}", self.path.display(), key);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut document = self.read_document()?;
        if document.remove(key).is_some() {
            self.write_document(&document)?;
        }
        Ok(())
    }

    pub fn multisig_accounts(&self) -> Result<Vec<MultisigAccount>, StoreError> {
        Ok(self.get(MULTISIG_ACCOUNTS)?.unwrap_or_default())
    }

    /// Replaces any stored account with the same address.
    pub fn upsert_multisig_account(&self, account: MultisigAccount) -> Result<(), StoreError> {
        let mut accounts = self.multisig_accounts()?;
        accounts.retain(|stored| stored.address != account.address);
        accounts.push(account);
        self.set(MULTISIG_ACCOUNTS, &accounts)
    }

    pub fn remove_multisig_account(&self, address: &str) -> Result<(), StoreError> {
        let mut accounts = self.multisig_accounts()?;
        accounts.retain(|stored| stored.address != address);
        self.set(MULTISIG_ACCOUNTS, &accounts)
    }

    pub fn destination_info(&self) -> Result<DestinationInfo, StoreError> {
        Ok(self.get(DESTINATION_INFO)?.unwrap_or_default())
    }

    pub fn cache_destination(&self, source: &str, destination: Destination) -> Result<(), StoreError> {
        let mut info = self.destination_info()?;
        info.insert(source.to_string(), destination);
        self.set(DESTINATION_INFO, &info)
    }

    pub fn cached_destination(&self, source: &str) -> Result<Option<Destination>, StoreError> {
        Ok(self.destination_info()?.remove(source))
    }
}
