//! Rollup Primitives
//!
//! Building blocks shared by the verifier and witness generator:
//! - Field arithmetic using Winterfell's BaseElement (64-bit Goldilocks prime field)
//! - Rescue-Prime (Rp64_256) hashing for Merkle trees
//! - SHA-256 digests for signature messages and the pubdata commitment
//! - x-only public keys and BIP-340 signature checking
//! - Fixed protocol constants

pub mod field;
pub mod hash;
pub mod params;
pub mod rescue;
pub mod signature;

pub use field::{felt_from_u32, felt_from_u64, felt_to_u64, Felt, FELT_ZERO};
pub use hash::{pubkey_hash, Hash256, PubkeyHash};
pub use rescue::{rescue_hash, rescue_hash_pair, Digest, DigestParseError};
pub use signature::{Bip340Checker, KeyError, PubKey, SchnorrSignature, SignatureChecker, SigningKey};
