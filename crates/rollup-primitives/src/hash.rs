//! SHA-256 digests: signature messages, key hashes and the pubdata commitment

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::params::PUBKEY_HASH_BYTES;

/// 32-byte SHA-256 output, hex encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Parse 64 hex characters, with or without a `0x` prefix
    pub fn from_hex(text: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        let text = text.strip_prefix("0x").unwrap_or(text);
        hex::decode_to_slice(text, &mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn sha256(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// SHA-256 of `domain || data`
    pub fn sha256_with_domain(domain: &[u8], data: &[u8]) -> Self {
        Self(Sha256::new().chain_update(domain).chain_update(data).finalize().into())
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(de::Error::custom)
    }
}

/// Truncated SHA-256 of a public key, as carried in pubdata
pub type PubkeyHash = [u8; PUBKEY_HASH_BYTES];

pub fn pubkey_hash(key: &[u8; 32]) -> PubkeyHash {
    let mut out = [0u8; PUBKEY_HASH_BYTES];
    out.copy_from_slice(&Sha256::digest(key)[..PUBKEY_HASH_BYTES]);
    out
}
