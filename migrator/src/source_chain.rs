//! Read access to the legacy account state kept by the `AccountMigration`
//! pallet, plus extrinsic submission.

use {
    crate::{
        error::RpcError,
        rpc::{HttpClient, WsClient},
    },
    async_trait::async_trait,
    codec::Decode,
    darwinia_migration_sdk::{
        account_migration::{
            state::{AccountInfo, AssetAccount, Deposit, MultisigMigrationDetail, StakingLedger},
            storage::{system_account_key, to_hex_key, MigrationItem, StorageHasher},
            Balance, BlockNumber,
        },
        AccountId20, AccountId32,
    },
    log::*,
    serde_json::{json, Value},
};

#[async_trait]
pub trait SourceChain: Send + Sync {
    /// Pending multisig migration; `None` before it starts and after it
    /// completes.
    async fn multisig_status(&self, who: &AccountId32) -> Result<Option<MultisigMigrationDetail>, RpcError>;

    /// The legacy `System.Account` entry held by the migration pallet.
    async fn account_info(&self, who: &AccountId32, at: Option<&str>) -> Result<Option<AccountInfo>, RpcError>;

    async fn kton_balance(&self, who: &AccountId32, at: Option<&str>) -> Result<Balance, RpcError>;

    async fn staking_ledger(&self, who: &AccountId32, at: Option<&str>) -> Result<Option<StakingLedger>, RpcError>;

    async fn deposits(&self, who: &AccountId32, at: Option<&str>) -> Result<Vec<Deposit>, RpcError>;

    /// Whether the destination account has never been touched.
    async fn is_evm_account_free(&self, who: &AccountId20) -> Result<bool, RpcError>;

    async fn spec_name(&self) -> Result<String, RpcError>;

    async fn best_block_number(&self) -> Result<BlockNumber, RpcError>;

    /// Submits the extrinsic and returns the hash of the block it was
    /// finalized in.
    async fn submit_extrinsic(&self, extrinsic: Vec<u8>) -> Result<String, RpcError>;
}

pub struct SubstrateClient {
    http: HttpClient,
    ws: WsClient,
    hasher: StorageHasher,
}

fn decode_hex<T: Decode>(what: &'static str, data: &str) -> Result<T, RpcError> {
    let bytes = hex::decode(data.trim_start_matches("0x")).map_err(|e| RpcError::Decode {
        what,
        reason: e.to_string(),
    })?;
    T::decode(&mut bytes.as_slice()).map_err(|e| RpcError::Decode {
        what,
        reason: e.to_string(),
    })
}

fn parse_block_number(header: &Value) -> Result<BlockNumber, RpcError> {
    let number = header["number"]
        .as_str()
        .ok_or_else(|| RpcError::UnexpectedResponse(header.to_string()))?;
    BlockNumber::from_str_radix(number.trim_start_matches("0x"), 16).map_err(|e| RpcError::Decode {
        what: "block number",
        reason: e.to_string(),
    })
}

impl SubstrateClient {
    pub fn new(http: HttpClient, ws: WsClient, hasher: StorageHasher) -> Self {
        Self { http, ws, hasher }
    }

    async fn storage<T: Decode>(
        &self,
        what: &'static str,
        key: Vec<u8>,
        at: Option<&str>,
    ) -> Result<Option<T>, RpcError> {
        let key = to_hex_key(&key);
        let params = match at {
            Some(at) => json!([key, at]),
            None => json!([key]),
        };
        let data: Option<String> = self.http.call("state_getStorage", params).await?;
        match data {
            Some(data) => decode_hex(what, &data).map(Some),
            None => Ok(None),
        }
    }

    fn migration_key(&self, item: MigrationItem, who: &AccountId32) -> Vec<u8> {
        item.key(self.hasher, who)
    }
}

#[async_trait]
impl SourceChain for SubstrateClient {
    async fn multisig_status(&self, who: &AccountId32) -> Result<Option<MultisigMigrationDetail>, RpcError> {
        let key = self.migration_key(MigrationItem::Multisigs, who);
        self.storage("multisig migration", key, None).await
    }

    async fn account_info(&self, who: &AccountId32, at: Option<&str>) -> Result<Option<AccountInfo>, RpcError> {
        let key = self.migration_key(MigrationItem::Accounts, who);
        self.storage("account info", key, at).await
    }

    async fn kton_balance(&self, who: &AccountId32, at: Option<&str>) -> Result<Balance, RpcError> {
        let key = self.migration_key(MigrationItem::KtonAccounts, who);
        let account: Option<AssetAccount> = self.storage("kton account", key, at).await?;
        Ok(account.map(|account| account.balance).unwrap_or_default())
    }

    async fn staking_ledger(&self, who: &AccountId32, at: Option<&str>) -> Result<Option<StakingLedger>, RpcError> {
        let key = self.migration_key(MigrationItem::Ledgers, who);
        self.storage("staking ledger", key, at).await
    }

    async fn deposits(&self, who: &AccountId32, at: Option<&str>) -> Result<Vec<Deposit>, RpcError> {
        let key = self.migration_key(MigrationItem::Deposits, who);
        let deposits: Option<Vec<Deposit>> = self.storage("deposits", key, at).await?;
        Ok(deposits.unwrap_or_default())
    }

    async fn is_evm_account_free(&self, who: &AccountId20) -> Result<bool, RpcError> {
        let info: Option<AccountInfo> = self
            .storage("destination account", system_account_key(who), None)
            .await?;
        Ok(info.is_none())
    }

    async fn spec_name(&self) -> Result<String, RpcError> {
        let version: Value = self.http.call("state_getRuntimeVersion", json!([])).await?;
        version["specName"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RpcError::UnexpectedResponse(version.to_string()))
    }

    async fn best_block_number(&self) -> Result<BlockNumber, RpcError> {
        let header: Value = self.http.call("chain_getHeader", json!([])).await?;
        parse_block_number(&header)
    }

    async fn submit_extrinsic(&self, extrinsic: Vec<u8>) -> Result<String, RpcError> {
        let encoded = format!("0x{}", hex::encode(&extrinsic));
        info!("submitting extrinsic ({} bytes) to {}", extrinsic.len(), self.ws.url());
        let block = self.ws.submit_and_watch(&encoded).await.map_err(|e| {
            error!("extrinsic submission failed: {:?}", e);
            e
        })?;
        info!("extrinsic finalized in block {}", block);
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches, codec::Encode};

    #[test]
    fn test_decode_hex_storage_value() {
        let detail = MultisigMigrationDetail {
            to: AccountId20([7; 20]),
            members: vec![(AccountId32([1; 32]), true), (AccountId32([2; 32]), false)],
            threshold: 2,
        };
        let encoded = format!("0x{}", hex::encode(detail.encode()));
        let decoded: MultisigMigrationDetail = decode_hex("multisig", &encoded).unwrap();
        assert_eq!(decoded, detail);
    }

    #[test]
    fn test_decode_hex_rejects_garbage() {
        assert_matches!(
            decode_hex::<MultisigMigrationDetail>("multisig", "0x0102"),
            Err(RpcError::Decode { what: "multisig", .. })
        );
        assert_matches!(
            decode_hex::<u32>("number", "0xzz"),
            Err(RpcError::Decode { .. })
        );
    }

    #[test]
    fn test_parse_block_number() {
        assert_eq!(parse_block_number(&json!({"number": "0x1b4"})).unwrap(), 436);
        assert_matches!(
            parse_block_number(&json!({"parentHash": "0x00"})),
            Err(RpcError::UnexpectedResponse(_))
        );
    }
}
