//! Rollup Verifier - deterministic state-transition verification for rollups
//!
//! This crate checks that an ordered batch of chunked rollup operations moves
//! one committed state root to another while producing the public transcript
//! (pubdata) the batch commits to.
//!
//! # Overview
//!
//! State lives in a two-level Rescue Merkle tree: accounts at the top, and
//! per-account balance and subaccount trees indexed by token. Every operation
//! spans a fixed number of 8-byte pubdata chunks. Each chunk carries a Merkle
//! branch for one side of the operation, and exactly one registered validator
//! must authorize it and produce the branch's new state.
//!
//! # Crates
//!
//! - `rollup-primitives`: field elements, Rescue and SHA-256 hashing, keys and signatures
//! - `rollup-constraints`: bit widths, packed floats and the transaction table
//! - `rollup-batch`: witness types, validators and the batch verifier
//! - `rollup-witness`: account store and batch builder that produce valid witnesses
//!
//! # Example
//!
//! ```no_run
//! use rollup_verifier::batch::BatchVerifier;
//! use rollup_verifier::witness::Scenario;
//!
//! let batch = Scenario::DepositExit.build().unwrap();
//! let result = BatchVerifier::new().verify(&batch);
//! assert!(result.valid);
//! ```

// Re-export sub-crates
pub use rollup_batch as batch;
pub use rollup_constraints as constraints;
pub use rollup_primitives as primitives;
pub use rollup_witness as witness;
