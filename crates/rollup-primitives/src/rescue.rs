//! Rescue-Prime hashing (Rp64_256) used for every Merkle level and leaf
//!
//! Digests are four Goldilocks elements. Their byte form is the four canonical
//! values as little-endian u64s, which is also how roots are written as hex.

use winter_crypto::hashers::Rp64_256;
use winter_crypto::{ElementHasher, Hasher};

use crate::field::{felt_from_canonical, felt_to_u64, Felt, FELT_ZERO};

/// A Rescue digest: Merkle node, leaf hash or state root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest(pub [Felt; 4]);

impl Default for Digest {
    fn default() -> Self {
        Self([FELT_ZERO; 4])
    }
}

impl Digest {
    /// Canonical little-endian byte encoding
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, felt) in self.0.iter().enumerate() {
            out[i * 8..(i + 1) * 8].copy_from_slice(&felt_to_u64(*felt).to_le_bytes());
        }
        out
    }

    /// Decode from bytes, rejecting limbs that are not canonical field elements
    pub fn from_bytes(bytes: &[u8; 32]) -> Option<Self> {
        let mut felts = [FELT_ZERO; 4];
        for (i, chunk) in bytes.chunks_exact(8).enumerate() {
            let mut limb = [0u8; 8];
            limb.copy_from_slice(chunk);
            felts[i] = felt_from_canonical(u64::from_le_bytes(limb))?;
        }
        Some(Self(felts))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, DigestParseError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Self::from_bytes(&bytes).ok_or(DigestParseError::NonCanonical)
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Failure to parse a digest from its hex form
#[derive(Debug, thiserror::Error)]
pub enum DigestParseError {
    #[error("invalid digest hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("digest limb is not a canonical field element")]
    NonCanonical,
}

impl serde::Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Digest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

type RpDigest = <Rp64_256 as Hasher>::Digest;

fn from_element_digest(digest: RpDigest) -> Digest {
    let elements: [Felt; 4] = digest.into();
    Digest(elements)
}

fn to_element_digest(digest: &Digest) -> RpDigest {
    digest.0.into()
}

/// Hash an arbitrary sequence of field elements into a digest
pub fn rescue_hash(input: &[Felt]) -> Digest {
    from_element_digest(Rp64_256::hash_elements(input))
}

/// Two-to-one compression of Merkle children
pub fn rescue_hash_pair(left: &Digest, right: &Digest) -> Digest {
    from_element_digest(Rp64_256::merge(&[
        to_element_digest(left),
        to_element_digest(right),
    ]))
}
