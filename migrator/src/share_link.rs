//! Links that let the other members of a multisig open the same migration.

use {
    crate::{
        error::StoreError,
        store::{Destination, DestinationType, LocalStore},
    },
    log::*,
    url::form_urlencoded,
};

/// Query parameters of a multisig share link. Lists travel comma joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareLink {
    pub address: Option<String>,
    pub name: Option<String>,
    pub initializer: Option<String>,
    pub who: Vec<String>,
    pub threshold: Option<u16>,
    pub destination: Option<String>,
    pub destination_members: Vec<String>,
    pub destination_threshold: Option<u16>,
    pub destination_type: Option<DestinationType>,
    pub network: Option<String>,
    pub account: Option<String>,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl ShareLink {
    /// Parses a query string, with or without the leading `?`. Unknown
    /// keys are ignored and the first occurrence of a key wins.
    pub fn parse(query: &str) -> Self {
        let query = query.split_once('?').map_or(query, |(_, query)| query);
        let mut link = Self::default();
        let mut seen = Vec::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if seen.contains(&key) {
                continue;
            }
            match key.as_ref() {
                "address" => link.address = Some(value.to_string()),
                "name" => link.name = Some(value.to_string()),
                "initializer" => link.initializer = Some(value.to_string()),
                "who" => link.who = split_list(&value),
                "threshold" => link.threshold = value.parse().ok(),
                "destination" => link.destination = Some(value.to_string()),
                "destinationMembers" => link.destination_members = split_list(&value),
                "destinationThreshold" => link.destination_threshold = value.parse().ok(),
                "destinationType" => link.destination_type = DestinationType::parse(&value),
                "network" => link.network = Some(value.to_string()),
                "account" => link.account = Some(value.to_string()),
                _ => {
                    trace!("ignoring share link parameter {}", key);
                    continue;
                }
            }
            seen.push(key);
        }
        link
    }

    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        let optional = [
            ("address", &self.address),
            ("name", &self.name),
            ("initializer", &self.initializer),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                query.append_pair(key, value);
            }
        }
        if !self.who.is_empty() {
            query.append_pair("who", &self.who.join(","));
        }
        if let Some(threshold) = self.threshold {
            query.append_pair("threshold", &threshold.to_string());
        }
        if let Some(destination) = &self.destination {
            query.append_pair("destination", destination);
        }
        if !self.destination_members.is_empty() {
            query.append_pair("destinationMembers", &self.destination_members.join(","));
        }
        if let Some(threshold) = self.destination_threshold {
            query.append_pair("destinationThreshold", &threshold.to_string());
        }
        if let Some(kind) = self.destination_type {
            query.append_pair("destinationType", kind.as_str());
        }
        if let Some(network) = &self.network {
            query.append_pair("network", network);
        }
        if let Some(account) = &self.account {
            query.append_pair("account", account);
        }
        query.finish()
    }

    pub fn to_url(&self, base: &str) -> String {
        let base = base.trim_end_matches('?');
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{base}{separator}{}", self.to_query())
    }

    /// Carries a cached destination in the link. The threshold is only
    /// written for a multisig destination.
    pub fn with_destination(mut self, destination: &Destination) -> Self {
        self.destination = Some(destination.address.clone());
        self.destination_members = destination.members.clone();
        self.destination_threshold = match destination.kind {
            DestinationType::Multisig => Some(destination.threshold),
            DestinationType::General => None,
        };
        self.destination_type = Some(destination.kind);
        self
    }

    /// The destination the link carries. Only links with destination
    /// members count as shared links.
    pub fn destination(&self) -> Option<Destination> {
        if self.destination_members.is_empty() {
            return None;
        }
        Some(Destination {
            address: self.destination.clone().unwrap_or_default(),
            kind: self.destination_type.unwrap_or(DestinationType::Multisig),
            members: self.destination_members.clone(),
            threshold: self.destination_threshold.unwrap_or_default(),
        })
    }
}

/// Destination to show for `source`. A shared link wins over the local
/// cache; a cached destination is written back into the returned link so
/// it can be shared on.
pub fn resolve_destination(
    link: ShareLink,
    store: &LocalStore,
    source: &str,
) -> Result<(ShareLink, Option<Destination>), StoreError> {
    if let Some(destination) = link.destination() {
        debug!("destination of {} taken from the shared link", source);
        return Ok((link, Some(destination)));
    }
    match store.cached_destination(source)? {
        Some(destination) => {
            let link = link.with_destination(&destination);
            Ok((link, Some(destination)))
        }
        None => Ok((link, None)),
    }
}
