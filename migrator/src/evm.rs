//! Destination chain access: code probes and the multisig factory contract.

use {
    crate::{
        error::EvmError,
        rpc::HttpClient,
        signer::{EvmKey, LegacyTransaction},
    },
    async_trait::async_trait,
    darwinia_migration_sdk::AccountId20,
    log::*,
    serde_json::{json, Value},
    sha3::{Digest, Keccak256},
    std::{sync::Arc, time::Duration},
};

const WORD: usize = 32;
pub const COMPUTE_ADDRESS_SIGNATURE: &str = "computeAddress(bytes32,address[],uint256)";
pub const DEPLOY_SIGNATURE: &str = "deploy(bytes32,address[],uint256)";

#[async_trait]
pub trait CodeProbe: Send + Sync {
    async fn has_code(&self, address: &AccountId20) -> Result<bool, EvmError>;
}

#[async_trait]
pub trait MultisigFactory: Send + Sync {
    /// Address the contract will be deployed at. `members` must already be
    /// in their final order.
    async fn compute_address(
        &self,
        public_key: &[u8; 32],
        members: &[AccountId20],
        threshold: u16,
    ) -> Result<AccountId20, EvmError>;

    /// Deploys the multisig and returns the mined transaction hash.
    async fn deploy(
        &self,
        public_key: &[u8; 32],
        members: &[AccountId20],
        threshold: u16,
        key: &EvmKey,
    ) -> Result<String, EvmError>;
}

pub struct EvmClient {
    http: HttpClient,
}

impl EvmClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn call(&self, to: &AccountId20, data: &[u8]) -> Result<Vec<u8>, EvmError> {
        let params = json!([{"to": to.to_lower_hex(), "data": hex_data(data)}, "latest"]);
        let result: String = self.http.call("eth_call", params).await?;
        decode_data(&result)
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128, EvmError> {
        let value: String = self.http.call(method, params).await?;
        parse_quantity(&value)
    }

    /// Signs locally and submits through `eth_sendRawTransaction`, so the
    /// node never needs to hold the key.
    pub async fn send_signed(&self, key: &EvmKey, to: &AccountId20, data: &[u8]) -> Result<String, EvmError> {
        let from = key.address().to_lower_hex();
        let call = json!({"from": from, "to": to.to_lower_hex(), "data": hex_data(data)});
        let (chain_id, nonce, gas_price, gas) = tokio::try_join!(
            self.quantity("eth_chainId", json!([])),
            self.quantity("eth_getTransactionCount", json!([from, "pending"])),
            self.quantity("eth_gasPrice", json!([])),
            self.quantity("eth_estimateGas", json!([call])),
        )?;
        let transaction = LegacyTransaction {
            nonce: narrow(nonce)?,
            gas_price,
            gas: narrow(gas)?,
            to: *to,
            value: 0,
            data: data.to_vec(),
            chain_id: narrow(chain_id)?,
        };
        debug!("sending transaction {:?} from {}", transaction, from);
        let raw = key.sign_transaction(&transaction);
        Ok(self
            .http
            .call("eth_sendRawTransaction", json!([hex_data(&raw)]))
            .await?)
    }

    pub async fn transaction_receipt(&self, hash: &str) -> Result<Option<Value>, EvmError> {
        Ok(self.http.call("eth_getTransactionReceipt", json!([hash])).await?)
    }
}

#[async_trait]
impl CodeProbe for EvmClient {
    async fn has_code(&self, address: &AccountId20) -> Result<bool, EvmError> {
        let code: String = self
            .http
            .call("eth_getCode", json!([address.to_lower_hex(), "latest"]))
            .await?;
        Ok(!matches!(code.as_str(), "" | "0x" | "0x0"))
    }
}

fn hex_data(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

fn decode_data(data: &str) -> Result<Vec<u8>, EvmError> {
    hex::decode(data.trim_start_matches("0x")).map_err(|e| EvmError::InvalidResponse(e.to_string()))
}

fn parse_quantity(value: &str) -> Result<u128, EvmError> {
    let digits = value.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| EvmError::InvalidResponse(format!("{}: {}", value, e)))
}

fn narrow(value: u128) -> Result<u64, EvmError> {
    u64::try_from(value).map_err(|_| EvmError::InvalidResponse(format!("quantity {} out of range", value)))
}

pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &AccountId20) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 20..].copy_from_slice(address.as_bytes());
    word
}

/// ABI call data for `f(bytes32,address[],uint256)`.
pub fn encode_multisig_call(signature: &str, public_key: &[u8; 32], members: &[AccountId20], threshold: u16) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + WORD * (4 + members.len()));
    data.extend_from_slice(&function_selector(signature));
    data.extend_from_slice(public_key);
    // the dynamic array lives after the three head words
    data.extend_from_slice(&uint_word((3 * WORD) as u64));
    data.extend_from_slice(&uint_word(u64::from(threshold)));
    data.extend_from_slice(&uint_word(members.len() as u64));
    for member in members {
        data.extend_from_slice(&address_word(member));
    }
    data
}

pub fn decode_address_word(data: &[u8]) -> Result<AccountId20, EvmError> {
    if data.len() < WORD {
        return Err(EvmError::InvalidResponse(format!(
            "expected an address word, got {} bytes",
            data.len()
        )));
    }
    let word = &data[..WORD];
    if word[..WORD - 20].iter().any(|byte| *byte != 0) {
        return Err(EvmError::InvalidResponse(format!("not an address: 0x{}", hex::encode(word))));
    }
    let mut address = [0u8; 20];
    address.copy_from_slice(&word[WORD - 20..]);
    Ok(AccountId20(address))
}

pub struct MultisigFactoryContract {
    client: Arc<EvmClient>,
    address: AccountId20,
    receipt_poll_attempts: u32,
    receipt_poll_interval: Duration,
}

impl MultisigFactoryContract {
    pub fn new(client: Arc<EvmClient>, address: AccountId20, receipt_poll_attempts: u32) -> Self {
        Self {
            client,
            address,
            receipt_poll_attempts,
            receipt_poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self
    }

    pub fn address(&self) -> &AccountId20 {
        &self.address
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<Value, EvmError> {
        for attempt in 0..self.receipt_poll_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.receipt_poll_interval).await;
            }
            if let Some(receipt) = self.client.transaction_receipt(hash).await? {
                return Ok(receipt);
            }
            debug!("no receipt for {} yet (attempt {})", hash, attempt + 1);
        }
        Err(EvmError::ReceiptTimeout(hash.to_string()))
    }
}

#[async_trait]
impl MultisigFactory for MultisigFactoryContract {
    async fn compute_address(
        &self,
        public_key: &[u8; 32],
        members: &[AccountId20],
        threshold: u16,
    ) -> Result<AccountId20, EvmError> {
        let data = encode_multisig_call(COMPUTE_ADDRESS_SIGNATURE, public_key, members, threshold);
        let result = self.client.call(&self.address, &data).await?;
        decode_address_word(&result)
    }

    async fn deploy(
        &self,
        public_key: &[u8; 32],
        members: &[AccountId20],
        threshold: u16,
        key: &EvmKey,
    ) -> Result<String, EvmError> {
        let data = encode_multisig_call(DEPLOY_SIGNATURE, public_key, members, threshold);
        let hash = self.client.send_signed(key, &self.address, &data).await?;
        info!("multisig deployment sent: {}", hash);
        let receipt = self.wait_for_receipt(&hash).await?;
        if receipt["status"].as_str() != Some("0x1") {
            error!("multisig deployment {} reverted: {}", hash, receipt);
            return Err(EvmError::Reverted(hash));
        }
        info!("multisig deployed in block {}", receipt["blockNumber"]);
        Ok(hash)
    }
}
