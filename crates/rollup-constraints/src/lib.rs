//! Rollup Constraints
//!
//! The logical guards every operation validator builds on:
//! - bit-width checks for witness fields
//! - packed-float amount and fee decoding
//! - the `a >= b` range comparison and the compact-amount check
//! - the closed transaction set with its fixed chunk table

pub mod float;
pub mod range_check;
pub mod tx;

pub use float::{decode_packed, FloatFormat, AMOUNT_FORMAT, FEE_FORMAT};
pub use range_check::{check_bit_width, check_compact_amount, check_length, fits_bits, ge, RangeError};
pub use tx::{Side, TxType};
