use {
    crate::error::SignerError,
    async_trait::async_trait,
    darwinia_migration_sdk::{
        account_migration::{message::wrap_bytes, Signature},
        AccountId20, AccountId32,
    },
    libsecp256k1::{Message, PublicKey, SecretKey},
    log::*,
    schnorrkel::{signing_context, ExpansionMode, Keypair, MiniSecretKey},
    sha3::{Digest, Keccak256},
    std::fmt,
};

const SIGNING_CONTEXT: &[u8] = b"substrate";

/// What the migration flows need from a wallet.
#[async_trait]
pub trait MessageSigner: Send + Sync {
    fn name(&self) -> &str;

    fn accounts(&self) -> Vec<AccountId32>;

    /// Signs `message` the way wallet extensions sign raw bytes, wrapped in
    /// `<Bytes>..</Bytes>`.
    async fn sign_raw(&self, account: &AccountId32, message: &[u8]) -> Result<Signature, SignerError>;
}

/// In-process sr25519 keyring.
#[derive(Default)]
pub struct Keyring {
    keys: Vec<Keypair>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// `seed` is a 32 byte mini secret key, hex encoded with or without `0x`.
    pub fn add_seed(&mut self, seed: &str) -> Result<AccountId32, SignerError> {
        let bytes = hex::decode(seed.trim().trim_start_matches("0x"))
            .map_err(|e| SignerError::InvalidSeed(e.to_string()))?;
        let secret = MiniSecretKey::from_bytes(&bytes).map_err(|e| SignerError::InvalidSeed(e.to_string()))?;
        let keypair = secret.expand_to_keypair(ExpansionMode::Ed25519);
        let account = AccountId32(keypair.public.to_bytes());
        if !self.contains(&account) {
            self.keys.push(keypair);
        }
        Ok(account)
    }

    pub fn from_seeds<S: AsRef<str>>(seeds: &[S]) -> Result<Self, SignerError> {
        let mut keyring = Self::new();
        for seed in seeds {
            keyring.add_seed(seed.as_ref())?;
        }
        Ok(keyring)
    }

    pub fn contains(&self, account: &AccountId32) -> bool {
        self.keys.iter().any(|key| key.public.to_bytes() == account.0)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyring").field("accounts", &self.accounts()).finish()
    }
}

#[async_trait]
impl MessageSigner for Keyring {
    fn name(&self) -> &str {
        "keyring"
    }

    fn accounts(&self) -> Vec<AccountId32> {
        self.keys
            .iter()
            .map(|key| AccountId32(key.public.to_bytes()))
            .collect()
    }

    async fn sign_raw(&self, account: &AccountId32, message: &[u8]) -> Result<Signature, SignerError> {
        if self.keys.is_empty() {
            return Err(SignerError::Empty);
        }
        let key = self
            .keys
            .iter()
            .find(|key| key.public.to_bytes() == account.0)
            .ok_or_else(|| SignerError::UnknownAccount(account.to_hex()))?;
        debug!("signing {} bytes with {}", message.len(), account);
        let context = signing_context(SIGNING_CONTEXT);
        Ok(key.sign(context.bytes(&wrap_bytes(message))).to_bytes())
    }
}

fn decode_secret(text: &str) -> Result<Vec<u8>, SignerError> {
    hex::decode(text.trim().trim_start_matches("0x")).map_err(|e| SignerError::InvalidSeed(e.to_string()))
}

/// secp256k1 key that pays for transactions on the destination chain.
pub struct EvmKey {
    secret: SecretKey,
    address: AccountId20,
}

impl EvmKey {
    pub fn from_hex(secret: &str) -> Result<Self, SignerError> {
        let secret =
            SecretKey::parse_slice(&decode_secret(secret)?).map_err(|e| SignerError::InvalidSeed(format!("{:?}", e)))?;
        let public = PublicKey::from_secret_key(&secret).serialize();
        let mut address = [0u8; 20];
        address.copy_from_slice(&Keccak256::digest(&public[1..])[12..]);
        Ok(Self {
            secret,
            address: AccountId20(address),
        })
    }

    pub fn address(&self) -> &AccountId20 {
        &self.address
    }

    /// Signs with EIP-155 replay protection and returns the raw transaction.
    pub fn sign_transaction(&self, transaction: &LegacyTransaction) -> Vec<u8> {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&Keccak256::digest(&transaction.signing_payload()));
        let (signature, recovery) = libsecp256k1::sign(&Message::parse(&hash), &self.secret);
        let signature = signature.serialize();
        let v = u64::from(recovery.serialize()) + transaction.chain_id * 2 + 35;
        transaction.encode_signed(v, &signature[..32], &signature[32..])
    }
}

impl fmt::Debug for EvmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmKey").field("address", &self.address).finish()
    }
}

/// Pre-London transaction, accepted by every Darwinia 2.0 node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas: u64,
    pub to: AccountId20,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp_uint(self.nonce.into()),
            rlp_uint(self.gas_price),
            rlp_uint(self.gas.into()),
            rlp_bytes(self.to.as_bytes()),
            rlp_uint(self.value),
            rlp_bytes(&self.data),
        ]
    }

    pub fn signing_payload(&self) -> Vec<u8> {
        let mut fields = self.fields();
        fields.extend([rlp_uint(self.chain_id.into()), rlp_uint(0), rlp_uint(0)]);
        rlp_list(&fields)
    }

    fn encode_signed(&self, v: u64, r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut fields = self.fields();
        fields.extend([
            rlp_uint(v.into()),
            rlp_bytes(trim_leading_zeros(r)),
            rlp_bytes(trim_leading_zeros(s)),
        ]);
        rlp_list(&fields)
    }
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn rlp_prefix(len: usize, offset: u8) -> Vec<u8> {
    if len <= 55 {
        return vec![offset + len as u8];
    }
    let len = (len as u64).to_be_bytes();
    let len = trim_leading_zeros(&len);
    let mut out = vec![offset + 55 + len.len() as u8];
    out.extend_from_slice(len);
    out
}

fn rlp_bytes(data: &[u8]) -> Vec<u8> {
    if let [byte] = data {
        if *byte < 0x80 {
            return vec![*byte];
        }
    }
    let mut out = rlp_prefix(data.len(), 0x80);
    out.extend_from_slice(data);
    out
}

fn rlp_uint(value: u128) -> Vec<u8> {
    rlp_bytes(trim_leading_zeros(&value.to_be_bytes()))
}

fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload = items.concat();
    let mut out = rlp_prefix(payload.len(), 0xc0);
    out.extend(payload);
    out
}
