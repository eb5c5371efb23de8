//! State model: leaf hashing, Merkle verification and account commitments

pub mod commitment;
pub mod leaf;
pub mod merkle;

pub use commitment::{check_account_data, AccountCommitment};
pub use leaf::{empty_hashes, EmptyHashes, LeafPayload};
pub use merkle::{account_root, divergence_height, intersection_path, merkle_root, subtree_root};
