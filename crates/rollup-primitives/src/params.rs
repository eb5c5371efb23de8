//! Protocol constants
//!
//! These are fixed per protocol version. Changing any of them changes the
//! state-root format or the pubdata layout.

/// Width of one pubdata chunk in bytes
pub const CHUNK_BYTES: usize = 8;

/// Depth of the outer account tree
pub const ACCOUNT_TREE_DEPTH: usize = 24;

/// Depth of each per-account balance and subaccount tree
pub const SUBTREE_DEPTH: usize = 8;

pub const ACCOUNT_BIT_WIDTH: usize = ACCOUNT_TREE_DEPTH;
pub const TOKEN_BIT_WIDTH: usize = SUBTREE_DEPTH;
pub const TX_TYPE_BIT_WIDTH: usize = 8;
pub const CHUNK_INDEX_BIT_WIDTH: usize = 3;
pub const NONCE_BIT_WIDTH: usize = 16;
pub const BALANCE_BIT_WIDTH: usize = 128;

/// Largest representable nonce; a nonce at this value cannot be incremented
pub const MAX_NONCE: u32 = (1 << NONCE_BIT_WIDTH) - 1;

pub const AMOUNT_EXPONENT_BIT_WIDTH: usize = 5;
pub const AMOUNT_MANTISSA_BIT_WIDTH: usize = 19;
pub const FEE_EXPONENT_BIT_WIDTH: usize = 4;
pub const FEE_MANTISSA_BIT_WIDTH: usize = 12;

/// Base of the packed floating representation
pub const FLOAT_EXPONENT_BASE: u128 = 10;

pub const AMOUNT_PACKED_BIT_WIDTH: usize = AMOUNT_EXPONENT_BIT_WIDTH + AMOUNT_MANTISSA_BIT_WIDTH;
pub const FEE_PACKED_BIT_WIDTH: usize = FEE_EXPONENT_BIT_WIDTH + FEE_MANTISSA_BIT_WIDTH;

/// Compact amounts drop the low 8 bits: `amount == compact * 256`
pub const COMPACT_AMOUNT_BIT_WIDTH: usize = 40;
pub const COMPACT_AMOUNT_SHIFT: u32 = 8;

/// Bytes of SHA-256 kept when a public key is written to pubdata
pub const PUBKEY_HASH_BYTES: usize = 20;

/// Byte widths of integer fields in pubdata
pub const ACCOUNT_BYTES: usize = ACCOUNT_BIT_WIDTH / 8;
pub const TOKEN_BYTES: usize = TOKEN_BIT_WIDTH / 8;
pub const NONCE_BYTES: usize = NONCE_BIT_WIDTH / 8;
pub const BALANCE_BYTES: usize = BALANCE_BIT_WIDTH / 8;
pub const AMOUNT_PACKED_BYTES: usize = AMOUNT_PACKED_BIT_WIDTH / 8;
pub const FEE_PACKED_BYTES: usize = FEE_PACKED_BIT_WIDTH / 8;
pub const COMPACT_AMOUNT_BYTES: usize = COMPACT_AMOUNT_BIT_WIDTH / 8;

/// Domain prefix for every signed message
pub const SIGNATURE_DOMAIN: &[u8] = b"ROLLUP_SIG_V1:";
