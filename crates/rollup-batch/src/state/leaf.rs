//! Leaf hashing for the two-level state tree
//!
//! An account's subtree holds a balance tree and a subaccount tree, both
//! indexed by token; its root is the merge of the two. The account leaf binds
//! the owner key, that subtree root and the account nonce.

use std::sync::OnceLock;

use rollup_primitives::params::{ACCOUNT_TREE_DEPTH, SUBTREE_DEPTH};
use rollup_primitives::{felt_from_u32, field::u128_to_limbs, rescue_hash, rescue_hash_pair};
use rollup_primitives::{Digest, PubKey};

use crate::witness::{BranchRecord, SubaccountLeaf};

/// Leaf contents of one token slot inside an account
#[derive(Debug, Clone, Copy)]
pub struct LeafPayload<'a> {
    pub balance: u128,
    pub leaf_nonce: u32,
    pub subaccount: &'a SubaccountLeaf,
}

impl BranchRecord {
    pub fn leaf_payload(&self) -> LeafPayload<'_> {
        LeafPayload {
            balance: self.balance,
            leaf_nonce: self.leaf_nonce,
            subaccount: &self.subaccount,
        }
    }
}

pub fn balance_leaf_hash(balance: u128, leaf_nonce: u32) -> Digest {
    let mut input = Vec::with_capacity(5);
    input.extend_from_slice(&u128_to_limbs(balance));
    input.push(felt_from_u32(leaf_nonce));
    rescue_hash(&input)
}

pub fn subaccount_leaf_hash(sub: &SubaccountLeaf) -> Digest {
    // 4 + 1 + 8 + 4 + 1 = 18 elements
    let mut input = Vec::with_capacity(18);
    input.extend_from_slice(&u128_to_limbs(sub.balance));
    input.push(felt_from_u32(sub.creation_nonce));
    input.extend_from_slice(&sub.cosigner_pubkey.to_limbs());
    input.extend_from_slice(&u128_to_limbs(sub.cosigner_balance));
    input.push(felt_from_u32(sub.token));
    rescue_hash(&input)
}

pub fn account_leaf_hash(owner: &PubKey, subtree_root: &Digest, account_nonce: u32) -> Digest {
    let mut input = Vec::with_capacity(13);
    input.extend_from_slice(&owner.to_limbs());
    input.extend_from_slice(&subtree_root.0);
    input.push(felt_from_u32(account_nonce));
    rescue_hash(&input)
}

/// Default node hashes of an empty state, indexed by height (0 = leaf)
#[derive(Debug, Clone)]
pub struct EmptyHashes {
    pub balance_tree: Vec<Digest>,
    pub subaccount_tree: Vec<Digest>,
    pub subtree_root: Digest,
    pub account_tree: Vec<Digest>,
}

fn empty_levels(leaf: Digest, depth: usize) -> Vec<Digest> {
    let mut levels = Vec::with_capacity(depth + 1);
    levels.push(leaf);
    for height in 0..depth {
        let below = levels[height];
        levels.push(rescue_hash_pair(&below, &below));
    }
    levels
}

impl EmptyHashes {
    fn compute() -> Self {
        let balance_tree = empty_levels(balance_leaf_hash(0, 0), SUBTREE_DEPTH);
        let subaccount_tree = empty_levels(
            subaccount_leaf_hash(&SubaccountLeaf::default()),
            SUBTREE_DEPTH,
        );
        let subtree_root =
            rescue_hash_pair(&balance_tree[SUBTREE_DEPTH], &subaccount_tree[SUBTREE_DEPTH]);
        let account_tree = empty_levels(
            account_leaf_hash(&PubKey::EMPTY, &subtree_root, 0),
            ACCOUNT_TREE_DEPTH,
        );
        Self {
            balance_tree,
            subaccount_tree,
            subtree_root,
            account_tree,
        }
    }

    /// Leaf of an account with no owner, nonce 0 and an empty subtree
    pub fn account_leaf(&self) -> Digest {
        self.account_tree[0]
    }

    /// Root of a state with no accounts
    pub fn state_root(&self) -> Digest {
        self.account_tree[ACCOUNT_TREE_DEPTH]
    }
}

/// Lazily computed empty-state hashes
pub fn empty_hashes() -> &'static EmptyHashes {
    static EMPTY: OnceLock<EmptyHashes> = OnceLock::new();
    EMPTY.get_or_init(EmptyHashes::compute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_levels_shape() {
        let empty = empty_hashes();
        assert_eq!(empty.balance_tree.len(), SUBTREE_DEPTH + 1);
        assert_eq!(empty.account_tree.len(), ACCOUNT_TREE_DEPTH + 1);
        assert_eq!(
            empty.account_tree[1],
            rescue_hash_pair(&empty.account_leaf(), &empty.account_leaf())
        );
    }

    #[test]
    fn test_balance_leaf_binds_nonce() {
        assert_ne!(balance_leaf_hash(10, 0), balance_leaf_hash(10, 1));
    }

    #[test]
    fn test_account_leaf_binds_owner() {
        let root = empty_hashes().subtree_root;
        let owner = PubKey([1u8; 32]);
        assert_ne!(
            account_leaf_hash(&owner, &root, 0),
            empty_hashes().account_leaf()
        );
    }

    #[test]
    fn test_subaccount_leaf_binds_cosigner() {
        let a = SubaccountLeaf::default();
        let b = SubaccountLeaf {
            cosigner_pubkey: PubKey([2u8; 32]),
            ..SubaccountLeaf::default()
        };
        assert_ne!(subaccount_leaf_hash(&a), subaccount_leaf_hash(&b));
    }
}
