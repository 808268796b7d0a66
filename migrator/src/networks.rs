//! Built-in table of the chains the migration runs on.
//!
//! Each Darwinia 2.0 node serves both the Substrate RPC that still holds
//! the legacy 1.0 state (the `AccountMigration` pallet) and the EVM RPC of
//! the destination accounts, so one endpoint covers both sides.

use {
    serde_derive::{Deserialize, Serialize},
    url::form_urlencoded,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub ethereum_decimals: u8,
    /// Precompile address of the token on the EVM side, if it has one.
    pub address: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    pub display_name: String,
    pub chain_id: u64,
    pub prefix: u16,
    pub explorer_url: String,
    pub https_urls: Vec<String>,
    pub wss_url: String,
    pub graphql_url: String,
    pub multisig_contract: String,
    pub ring: Token,
    pub kton: Token,
}

impl NetworkConfig {
    pub fn https_url(&self) -> &str {
        self.https_urls.first().map(String::as_str).unwrap_or_default()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

fn token(name: &str, symbol: &str, address: Option<&str>) -> Token {
    Token {
        name: name.to_string(),
        symbol: symbol.to_string(),
        decimals: 9,
        ethereum_decimals: 18,
        address: address.map(str::to_string),
    }
}

const KTON_PRECOMPILE: &str = "0x0000000000000000000000000000000000000402";

pub fn darwinia() -> NetworkConfig {
    NetworkConfig {
        name: "Darwinia".to_string(),
        display_name: "Darwinia".to_string(),
        chain_id: 46,
        prefix: 18,
        explorer_url: "https://darwinia.subscan.io/".to_string(),
        https_urls: vec!["https://rpc.darwinia.network".to_string()],
        wss_url: "wss://rpc.darwinia.network".to_string(),
        graphql_url: "https://subql.darwinia.network/subql-apps-darwinia/".to_string(),
        multisig_contract: "0x227c3e01071C2429766dDec2267A613e32DD463e".to_string(),
        ring: token("RING", "RING", None),
        kton: token("KTON", "KTON", Some(KTON_PRECOMPILE)),
    }
}

pub fn crab() -> NetworkConfig {
    NetworkConfig {
        name: "Crab".to_string(),
        display_name: "Crab".to_string(),
        chain_id: 44,
        prefix: 42,
        explorer_url: "https://crab.subscan.io/".to_string(),
        https_urls: vec!["https://crab-rpc.darwinia.network".to_string()],
        wss_url: "wss://crab-rpc.darwinia.network".to_string(),
        graphql_url: "https://subql.darwinia.network/subql-apps-crab/".to_string(),
        multisig_contract: "0x227c3e01071C2429766dDec2267A613e32DD463e".to_string(),
        ring: token("CRAB", "CRAB", None),
        kton: token("CKTON", "CKTON", Some(KTON_PRECOMPILE)),
    }
}

pub fn pangolin() -> NetworkConfig {
    NetworkConfig {
        name: "Pangolin".to_string(),
        display_name: "Pangolin".to_string(),
        chain_id: 43,
        prefix: 42,
        explorer_url: "https://pangolin.subscan.io/".to_string(),
        https_urls: vec!["https://pangolin-rpc.darwinia.network".to_string()],
        wss_url: "wss://pangolin-rpc.darwinia.network/".to_string(),
        graphql_url: "https://subql.darwinia.network/subql-apps-pangolin".to_string(),
        multisig_contract: "0x227c3e01071C2429766dDec2267A613e32DD463e".to_string(),
        ring: token("PRING", "PRING", None),
        kton: token("PKTON", "PKTON", Some(KTON_PRECOMPILE)),
    }
}

pub fn pangoro() -> NetworkConfig {
    NetworkConfig {
        name: "Pangoro".to_string(),
        display_name: "Pangoro".to_string(),
        chain_id: 45,
        prefix: 18,
        explorer_url: "https://pangoro.subscan.io/".to_string(),
        https_urls: vec!["https://pangoro-rpc.darwinia.network".to_string()],
        wss_url: "wss://pangoro-rpc.darwinia.network".to_string(),
        graphql_url: "https://api.subquery.network/sq/isunaslabs/pangoro".to_string(),
        multisig_contract: "0x6c25E0c1f57d7E78d7eB8D350f11204137EF71bE".to_string(),
        ring: token("ORING", "ORING", None),
        kton: token("OKTON", "OKTON", Some(KTON_PRECOMPILE)),
    }
}

/// Supported networks, default first.
pub fn supported_networks() -> Vec<NetworkConfig> {
    vec![darwinia(), crab(), pangolin(), pangoro()]
}

pub fn find_network<'a>(networks: &'a [NetworkConfig], name: &str) -> Option<&'a NetworkConfig> {
    networks.iter().find(|network| network.matches(name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialWalletParams {
    pub network: Option<NetworkConfig>,
    pub account: Option<String>,
}

/// Picks the network and account to preselect from a `?network=..&account=..`
/// query. An unknown or missing network falls back to the first supported
/// one.
pub fn initial_wallet_params(supported: &[NetworkConfig], search: &str) -> InitialWalletParams {
    let search = search.strip_prefix('?').unwrap_or(search);
    let mut network_param = None;
    let mut account = None;
    for (key, value) in form_urlencoded::parse(search.as_bytes()) {
        match key.as_ref() {
            "network" if network_param.is_none() => network_param = Some(value.into_owned()),
            "account" if account.is_none() => account = Some(value.into_owned()),
            _ => {}
        }
    }

    let Some(default_network) = supported.first() else {
        return InitialWalletParams {
            network: None,
            account,
        };
    };

    let network = network_param
        .filter(|name| !name.is_empty())
        .and_then(|name| find_network(supported, &name))
        .unwrap_or(default_network)
        .clone();

    InitialWalletParams {
        network: Some(network),
        account,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn networks() -> Vec<NetworkConfig> {
        vec![darwinia(), pangolin()]
    }

    #[test]
    fn test_unsupported_network_falls_back_to_default() {
        let params = initial_wallet_params(&networks(), "?network=Crab");
        assert_eq!(params.network, Some(darwinia()));
    }

    #[test]
    fn test_missing_network_falls_back_to_default() {
        let params = initial_wallet_params(&networks(), "?account=5abc");
        assert_eq!(params.network, Some(darwinia()));
        assert_eq!(params.account.as_deref(), Some("5abc"));
    }

    #[test]
    fn test_supported_network_is_matched_case_insensitively() {
        let params = initial_wallet_params(&networks(), "?network=pangolin");
        assert_eq!(params.network, Some(pangolin()));
        assert_eq!(params.account, None);
    }

    #[test]
    fn test_no_supported_networks() {
        let params = initial_wallet_params(&[], "?network=Darwinia&account=5abc");
        assert_eq!(params.network, None);
        assert_eq!(params.account.as_deref(), Some("5abc"));
    }

    #[test]
    fn test_network_table() {
        let networks = supported_networks();
        assert_eq!(networks[0].name, "Darwinia");
        let prefixes: Vec<_> = networks.iter().map(|n| (n.chain_id, n.prefix)).collect();
        assert_eq!(prefixes, vec![(46, 18), (44, 42), (43, 42), (45, 18)]);
        assert_eq!(find_network(&networks, "PANGORO").map(|n| n.chain_id), Some(45));
    }
}
