//! Address codec for both sides of the migration.
//!
//! Source accounts live on a Substrate chain and are displayed as SS58
//! strings under the network prefix. Destination accounts are 20 byte EVM
//! addresses displayed with the EIP-55 checksum.

use {
    codec::{Compact, Decode, Encode},
    sha3::{Digest, Keccak256},
    sp_crypto_hashing::{blake2_256, blake2_512},
    std::{fmt, str::FromStr},
    thiserror::Error,
};

const SS58_CHECKSUM_PREFIX: &[u8] = b"SS58PRE";
const SS58_CHECKSUM_LEN: usize = 2;
const MULTISIG_DERIVATION_PREFIX: &[u8] = b"modlpy/utilisuba";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58 string: {0}")]
    Base58(String),
    #[error("invalid hex string: {0}")]
    Hex(String),
    #[error("invalid address length {0}")]
    BadLength(usize),
    #[error("unsupported ss58 prefix byte {0}")]
    UnsupportedPrefix(u8),
    #[error("ss58 checksum mismatch")]
    BadChecksum,
    #[error("address checksum mismatch: {0}")]
    BadEvmChecksum(String),
}

/// Substrate account id (a 32 byte public key or derived key).
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct AccountId32(pub [u8; 32]);

impl AccountId32 {
    pub fn to_ss58(&self, prefix: u16) -> String {
        ss58_encode(self, prefix)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AccountId32({})", self.to_hex())
    }
}

impl fmt::Display for AccountId32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for AccountId32 {
    type Err = AddressError;

    /// Accepts an SS58 string under any prefix or a 0x prefixed public key.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        if let Some(stripped) = text.strip_prefix("0x") {
            let bytes = hex::decode(stripped).map_err(|e| AddressError::Hex(e.to_string()))?;
            let key: [u8; 32] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| AddressError::BadLength(bytes.len()))?;
            return Ok(Self(key));
        }
        ss58_decode(text).map(|(account, _)| account)
    }
}

/// EVM account on the destination chain.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct AccountId20(pub [u8; 20]);

impl AccountId20 {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_checksum(&self) -> String {
        to_checksum_address(&self.0)
    }

    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId20 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AccountId20({})", self.to_checksum())
    }
}

impl fmt::Display for AccountId20 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl FromStr for AccountId20 {
    type Err = AddressError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_evm_address(text)
    }
}

pub fn ss58_encode(account: &AccountId32, prefix: u16) -> String {
    // upper two bits of a u16 prefix are not representable
    let ident = prefix & 0b0011_1111_1111_1111;
    let mut data = match ident {
        0..=63 => vec![ident as u8],
        _ => {
            let first = ((ident & 0b0000_0000_1111_1100) as u8) >> 2;
            let second = ((ident >> 8) as u8) | (((ident & 0b0000_0000_0000_0011) as u8) << 6);
            vec![first | 0b0100_0000, second]
        }
    };
    data.extend_from_slice(&account.0);
    let checksum = ss58_checksum(&data);
    data.extend_from_slice(&checksum[..SS58_CHECKSUM_LEN]);
    bs58::encode(data).into_string()
}

pub fn ss58_decode(text: &str) -> Result<(AccountId32, u16), AddressError> {
    let data = bs58::decode(text)
        .into_vec()
        .map_err(|e| AddressError::Base58(e.to_string()))?;
    if data.len() < 2 {
        return Err(AddressError::BadLength(data.len()));
    }

    let (prefix_len, ident) = match data[0] {
        0..=63 => (1, data[0] as u16),
        64..=127 => {
            let lower = (data[0] << 2) | (data[1] >> 6);
            let upper = data[1] & 0b0011_1111;
            (2, (lower as u16) | ((upper as u16) << 8))
        }
        other => return Err(AddressError::UnsupportedPrefix(other)),
    };

    if data.len() != prefix_len + 32 + SS58_CHECKSUM_LEN {
        return Err(AddressError::BadLength(data.len()));
    }
    let body_len = data.len() - SS58_CHECKSUM_LEN;
    let checksum = ss58_checksum(&data[..body_len]);
    if checksum[..SS58_CHECKSUM_LEN] != data[body_len..] {
        return Err(AddressError::BadChecksum);
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&data[prefix_len..body_len]);
    Ok((AccountId32(key), ident))
}

fn ss58_checksum(data: &[u8]) -> [u8; 64] {
    let mut preimage = Vec::with_capacity(SS58_CHECKSUM_PREFIX.len() + data.len());
    preimage.extend_from_slice(SS58_CHECKSUM_PREFIX);
    preimage.extend_from_slice(data);
    blake2_512(&preimage)
}

/// Re-encodes an SS58 address or hex public key under `prefix`.
///
/// Empty or undecodable input yields an empty string, which callers treat
/// as "no address".
pub fn convert_to_ss58(text: &str, prefix: u16) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    AccountId32::from_str(text)
        .map(|account| account.to_ss58(prefix))
        .unwrap_or_default()
}

pub fn is_substrate_address(text: &str) -> bool {
    !text.trim().is_empty() && AccountId32::from_str(text).is_ok()
}

/// Hex encoded public key behind a substrate address.
pub fn public_key_hex(address: &str) -> Result<String, AddressError> {
    AccountId32::from_str(address).map(|account| account.to_hex())
}

pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 9 {
        return address.to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Parses a 0x prefixed EVM address. Mixed case input must carry a valid
/// EIP-55 checksum; all lower or all upper case input is accepted as is.
pub fn parse_evm_address(text: &str) -> Result<AccountId20, AddressError> {
    let text = text.trim();
    let stripped = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or_else(|| AddressError::Hex(text.to_string()))?;
    if stripped.len() != 40 {
        return Err(AddressError::BadLength(stripped.len() / 2));
    }
    let bytes = hex::decode(stripped).map_err(|e| AddressError::Hex(e.to_string()))?;
    let mut raw = [0u8; 20];
    raw.copy_from_slice(&bytes);

    let has_lower = stripped.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = stripped.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let expected = to_checksum_address(&raw);
        if expected[2..] != *stripped {
            return Err(AddressError::BadEvmChecksum(text.to_string()));
        }
    }
    Ok(AccountId20(raw))
}

pub fn is_evm_address(text: &str) -> bool {
    parse_evm_address(text).is_ok()
}

/// EIP-55 mixed case encoding.
pub fn to_checksum_address(raw: &[u8; 20]) -> String {
    let lower = hex::encode(raw);
    let hash = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Derives the account id of a substrate native multisig.
///
/// Signatories are sorted by public key before hashing, so the result does
/// not depend on the order they were entered in.
pub fn multisig_account_id(signatories: &[AccountId32], threshold: u16) -> AccountId32 {
    let mut sorted = signatories.to_vec();
    sorted.sort();

    let mut preimage = MULTISIG_DERIVATION_PREFIX.to_vec();
    Compact(sorted.len() as u32).encode_to(&mut preimage);
    for who in &sorted {
        preimage.extend_from_slice(&who.0);
    }
    preimage.extend_from_slice(&threshold.to_le_bytes());
    AccountId32(blake2_256(&preimage))
}
