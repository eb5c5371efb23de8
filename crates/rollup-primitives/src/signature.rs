//! Account keys and BIP-340 Schnorr signatures over secp256k1
//!
//! Account owners are identified by 32-byte x-only public keys. The all-zero
//! key marks an empty account. Signature checking sits behind the
//! [`SignatureChecker`] trait so the verifier never depends on a concrete
//! scheme.

use secp256k1::{schnorr, Keypair, Message, SecretKey, XOnlyPublicKey, SECP256K1};
use thiserror::Error;

use crate::field::{bytes32_to_limbs, Felt};
use crate::hash::{pubkey_hash, Hash256, PubkeyHash};

/// 32-byte x-only public key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PubKey(pub [u8; 32]);

impl PubKey {
    pub const EMPTY: PubKey = PubKey([0u8; 32]);

    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Truncated hash written to pubdata
    pub fn hash(&self) -> PubkeyHash {
        pubkey_hash(&self.0)
    }

    /// Limbs absorbed into Merkle leaves
    pub fn to_limbs(&self) -> [Felt; 8] {
        bytes32_to_limbs(&self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// 64-byte BIP-340 signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchnorrSignature(pub [u8; 64]);

impl Default for SchnorrSignature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl SchnorrSignature {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 64];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

macro_rules! impl_hex_serde {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_hex_serde!(PubKey);
impl_hex_serde!(SchnorrSignature);

/// `check_sig(message, public_key)` as consumed by operation validators
pub trait SignatureChecker: Send + Sync {
    /// Returns true only for a well-formed signature by `pubkey` over `msg`
    fn check_sig(&self, msg: &Hash256, pubkey: &PubKey, sig: &SchnorrSignature) -> bool;
}

/// BIP-340 Schnorr verification on secp256k1
#[derive(Debug, Clone, Copy, Default)]
pub struct Bip340Checker;

impl SignatureChecker for Bip340Checker {
    fn check_sig(&self, msg: &Hash256, pubkey: &PubKey, sig: &SchnorrSignature) -> bool {
        let msg = Message::from_digest(msg.0);

        let pk = match XOnlyPublicKey::from_slice(&pubkey.0) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let sig = match schnorr::Signature::from_slice(&sig.0) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        SECP256K1.verify_schnorr(&sig, &msg, &pk).is_ok()
    }
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key")]
    InvalidSecretKey,
}

/// Secret key material used by witness generators to authorize operations
#[derive(Clone)]
pub struct SigningKey {
    keypair: Keypair,
}

impl SigningKey {
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, KeyError> {
        let sk = SecretKey::from_slice(secret).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self {
            keypair: Keypair::from_secret_key(SECP256K1, &sk),
        })
    }

    /// Deterministic key derived from a seed, for fixtures and demos
    pub fn from_seed(seed: &str) -> Result<Self, KeyError> {
        let secret = Hash256::sha256_with_domain(b"ROLLUP_TEST_KEY:", seed.as_bytes());
        Self::from_bytes(&secret.0)
    }

    pub fn public_key(&self) -> PubKey {
        let (xonly, _parity) = self.keypair.x_only_public_key();
        PubKey(xonly.serialize())
    }

    pub fn sign(&self, msg: &Hash256) -> SchnorrSignature {
        let msg = Message::from_digest(msg.0);
        let sig = SECP256K1.sign_schnorr_no_aux_rand(&msg, &self.keypair);
        SchnorrSignature(sig.serialize())
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &self.public_key().to_hex())
            .finish()
    }
}
