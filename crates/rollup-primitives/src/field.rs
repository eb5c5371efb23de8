//! Field arithmetic over Winterfell's BaseElement (Goldilocks 64-bit prime field)
//!
//! The Goldilocks field is defined by the prime p = 2^64 - 2^32 + 1. Merkle
//! leaves absorb integers and keys as 32-bit limbs so that every mapping into
//! the field is injective.

use winter_math::fields::f64::BaseElement;
use winter_math::FieldElement;

/// The field element type used for all Merkle hashing
pub type Felt = BaseElement;

/// Zero in the field
pub const FELT_ZERO: Felt = BaseElement::ZERO;

/// The Goldilocks prime: p = 2^64 - 2^32 + 1
pub const GOLDILOCKS_PRIME: u64 = 0xFFFFFFFF00000001;

/// Convert a u64 to a field element (reduces mod p)
#[inline]
pub fn felt_from_u64(value: u64) -> Felt {
    BaseElement::new(value)
}

/// Convert a u64 to a field element, rejecting non-canonical values
#[inline]
pub fn felt_from_canonical(value: u64) -> Option<Felt> {
    if value < GOLDILOCKS_PRIME {
        Some(BaseElement::new(value))
    } else {
        None
    }
}

/// Convert a field element to u64 (canonical representative)
#[inline]
pub fn felt_to_u64(felt: Felt) -> u64 {
    felt.as_int()
}

/// Convert a u32 to a field element
#[inline]
pub fn felt_from_u32(value: u32) -> Felt {
    BaseElement::new(value as u64)
}

/// Split a u128 into four little-endian u32 limbs, each one field element
pub fn u128_to_limbs(value: u128) -> [Felt; 4] {
    let mut limbs = [FELT_ZERO; 4];
    for (i, limb) in limbs.iter_mut().enumerate() {
        *limb = felt_from_u32((value >> (32 * i)) as u32);
    }
    limbs
}

/// Split 32 bytes into eight little-endian u32 limbs
pub fn bytes32_to_limbs(bytes: &[u8; 32]) -> [Felt; 8] {
    let mut limbs = [FELT_ZERO; 8];
    for (i, chunk) in bytes.chunks_exact(4).enumerate() {
        limbs[i] = felt_from_u32(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    limbs
}
