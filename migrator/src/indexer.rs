//! GraphQL indexer holding finalized migration records.
//!
//! The indexer lags the chain head. A `None` from any query can mean
//! "not migrated" or "not indexed yet"; telling them apart is the
//! reconciler's job.

use {
    crate::error::IndexerError,
    async_trait::async_trait,
    log::*,
    serde::{de::DeserializeOwned, Deserializer},
    serde_derive::{Deserialize, Serialize},
    serde_json::{json, Value},
    std::time::Duration,
};

pub const FIND_MIGRATION_BY_SOURCE_ADDRESS: &str = r#"
  query migrationQuery($accountAddress: String!) {
    accountMigration(id: $accountAddress) {
      id
      destination
      parentHash
      transactionHash
      blockTime
      blockNumber
    }
  }
"#;

pub const FIND_MULTISIG_MIGRATION_BY_SOURCE_ADDRESS: &str = r#"
  query migrationQuery($accountAddress: String!) {
    multisigAccountMigration(id: $accountAddress) {
      id
      params
      blockTime
      blockNumber
    }
  }
"#;

pub const FIND_MIGRATION_DESTINATION_PARAMS_BY_SOURCE_ADDRESS: &str = r#"
  query migrationQuery($accountAddress: String!) {
    multisigDestinationAccount(id: $accountAddress) {
      id
      params
      blockTime
      blockNumber
    }
  }
"#;

/// Accepts `12`, `"12"` or `null`.
fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    use serde::de::Error;
    match <Value as serde::Deserialize>::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("invalid number {number}"))),
        Value::String(text) => text
            .replace(',', "")
            .parse()
            .map_err(|e| D::Error::custom(format!("invalid number {text}: {e}"))),
        Value::Null => Ok(0),
        other => Err(D::Error::custom(format!("expected a number, got {other}"))),
    }
}

/// Some indexer deployments store JSON columns as strings.
fn json_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    use serde::de::Error;
    match <Value as serde::Deserialize>::deserialize(deserializer)? {
        Value::String(text) => serde_json::from_str(&text).map_err(D::Error::custom),
        other => serde_json::from_value(other).map_err(D::Error::custom),
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountMigration {
    pub id: String,
    pub destination: String,
    pub parent_hash: String,
    pub transaction_hash: String,
    #[serde(default)]
    pub block_time: String,
    #[serde(deserialize_with = "number_or_string")]
    pub block_number: u64,
}

/// Source multisig parameters as they stood when the threshold was met.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MultisigMigrationParams {
    pub to: String,
    pub members: Vec<(String, bool)>,
    #[serde(deserialize_with = "number_or_string")]
    pub threshold: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MultisigAccountMigration {
    pub id: String,
    #[serde(deserialize_with = "json_or_string")]
    pub params: MultisigMigrationParams,
    #[serde(deserialize_with = "number_or_string")]
    pub block_number: u64,
    #[serde(default)]
    pub block_time: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DestinationAccountParams {
    pub address: String,
    pub members: Vec<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub threshold: u64,
}

/// Present only when the destination of a multisig is another multisig.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MultisigDestinationAccount {
    pub id: String,
    #[serde(deserialize_with = "json_or_string")]
    pub params: DestinationAccountParams,
    #[serde(deserialize_with = "number_or_string")]
    pub block_number: u64,
    #[serde(default)]
    pub block_time: String,
}

#[async_trait]
pub trait MigrationIndexer: Send + Sync {
    async fn account_migration(&self, source: &str) -> Result<Option<AccountMigration>, IndexerError>;

    async fn multisig_migration(&self, source: &str) -> Result<Option<MultisigAccountMigration>, IndexerError>;

    async fn multisig_destination_params(
        &self,
        source: &str,
    ) -> Result<Option<MultisigDestinationAccount>, IndexerError>;
}

pub struct GraphQlIndexer {
    client: reqwest::Client,
    url: String,
}

/// Picks `data.<field>` out of a GraphQL response, failing on `errors`.
pub fn extract_field<T: DeserializeOwned>(mut response: Value, field: &str) -> Result<Option<T>, IndexerError> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<_> = errors
                .iter()
                .map(|error| error["message"].as_str().unwrap_or("unknown error").to_string())
                .collect();
            return Err(IndexerError::Query(messages.join("; ")));
        }
    }
    let record = response
        .get_mut("data")
        .and_then(|data| data.get_mut(field))
        .map(Value::take);
    match record {
        None | Some(Value::Null) => Ok(None),
        Some(record) => Ok(Some(serde_json::from_value(record)?)),
    }
}

impl GraphQlIndexer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, IndexerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        field: &str,
        source: &str,
    ) -> Result<Option<T>, IndexerError> {
        let body = json!({
            "query": query,
            "variables": { "accountAddress": source },
        });
        debug!("indexer {} -> {}({})", self.url, field, source);
        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("indexer {} responded {} for {}", self.url, status, field);
            return Err(IndexerError::Status(status.as_u16()));
        }
        let value: Value = response.json().await?;
        extract_field(value, field)
    }
}

#[async_trait]
impl MigrationIndexer for GraphQlIndexer {
    async fn account_migration(&self, source: &str) -> Result<Option<AccountMigration>, IndexerError> {
        self.query(FIND_MIGRATION_BY_SOURCE_ADDRESS, "accountMigration", source)
            .await
    }

    async fn multisig_migration(&self, source: &str) -> Result<Option<MultisigAccountMigration>, IndexerError> {
        self.query(
            FIND_MULTISIG_MIGRATION_BY_SOURCE_ADDRESS,
            "multisigAccountMigration",
            source,
        )
        .await
    }

    async fn multisig_destination_params(
        &self,
        source: &str,
    ) -> Result<Option<MultisigDestinationAccount>, IndexerError> {
        self.query(
            FIND_MIGRATION_DESTINATION_PARAMS_BY_SOURCE_ADDRESS,
            "multisigDestinationAccount",
            source,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches};

    #[test]
    fn test_extract_multisig_migration_with_string_params() {
        let response = json!({
            "data": {
                "multisigAccountMigration": {
                    "id": "5Grw",
                    "params": "{\"to\":\"0x1111111111111111111111111111111111111111\",\"members\":[[\"5Grw\",true],[\"5FHn\",true]],\"threshold\":2}",
                    "blockTime": "2023-03-01T00:00:00",
                    "blockNumber": "1,024"
                }
            }
        });
        let record: MultisigAccountMigration = extract_field(response, "multisigAccountMigration")
            .unwrap()
            .unwrap();
        assert_eq!(record.block_number, 1024);
        assert_eq!(record.params.threshold, 2);
        assert_eq!(record.params.members[1], ("5FHn".to_string(), true));
    }

    #[test]
    fn test_extract_destination_params_with_object_params() {
        let response = json!({
            "data": {
                "multisigDestinationAccount": {
                    "id": "5Grw",
                    "params": {
                        "address": "0x2222222222222222222222222222222222222222",
                        "members": ["0x1111111111111111111111111111111111111111"],
                        "threshold": "2"
                    },
                    "blockNumber": 12
                }
            }
        });
        let record: MultisigDestinationAccount = extract_field(response, "multisigDestinationAccount")
            .unwrap()
            .unwrap();
        assert_eq!(record.params.threshold, 2);
        assert_eq!(record.block_time, "");
    }

    #[test]
    fn test_extract_missing_record() {
        let response = json!({"data": {"accountMigration": null}});
        let record: Option<AccountMigration> = extract_field(response, "accountMigration").unwrap();
        assert_eq!(record, None);
    }

    #[test]
    fn test_extract_errors() {
        let response = json!({"errors": [{"message": "boom"}, {"message": "again"}]});
        assert_matches!(
            extract_field::<AccountMigration>(response, "accountMigration"),
            Err(IndexerError::Query(message)) if message == "boom; again"
        );
    }
}
