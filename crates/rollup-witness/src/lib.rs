//! Rollup Witness Generation
//!
//! Produces [`BatchInput`](rollup_batch::BatchInput) witnesses that the
//! verifier accepts: an in-memory account store over sparse Rescue Merkle
//! trees, and a builder that turns operation requests into signed, chunked
//! operations with correct Merkle paths and intersection hashes.
//!
//! # Usage
//!
//! ```ignore
//! use rollup_witness::{AccountStore, BatchBuilder, OpSpec};
//!
//! let mut builder = BatchBuilder::new(AccountStore::new()).with_key(alice);
//! builder.apply(OpSpec::Deposit { account: 1, token: 0, amount: 100, fee: 1, owner })?;
//! let batch = builder.finish();
//! ```

pub mod builder;
pub mod error;
pub mod scenarios;
pub mod store;

pub use builder::{BatchBuilder, OpSpec};
pub use error::{WitnessError, WitnessResult};
pub use scenarios::{demo_builder, demo_key, Scenario};
pub use store::{AccountStore, SparseMerkleTree};
