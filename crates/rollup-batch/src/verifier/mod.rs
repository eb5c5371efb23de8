//! Batch verifier module
//!
//! The driver folds a batch's chunks over the current root and the pubdata
//! accumulator, then checks the closing assertions.

mod batch_verifier;
mod chain;

pub use batch_verifier::{verify_batch, BatchSummary, BatchVerificationResult, BatchVerifier};
