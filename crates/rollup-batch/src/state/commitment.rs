//! Account commitment: one branch record folded up to a state root

use rollup_primitives::Digest;

use super::leaf::{account_leaf_hash, empty_hashes};
use super::merkle::{account_root, subtree_root};
use crate::witness::{BranchRecord, SubtreePath};

/// Intermediate hashes of one branch record inside the state tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCommitment {
    pub subtree_root: Digest,
    pub account_leaf: Digest,
    pub root: Digest,
    pub account_is_empty: bool,
    pub subaccount_is_empty: bool,
}

/// Recompute the state root implied by `record` and its paths
///
/// With `clear_account` set the account leaf is replaced by the empty leaf,
/// regardless of what the record's subtree folds to.
pub fn check_account_data(
    record: &BranchRecord,
    subtree_path: &SubtreePath,
    account_path: &[Digest],
    clear_account: bool,
) -> AccountCommitment {
    let empty_leaf = empty_hashes().account_leaf();
    let subtree_root = subtree_root(&record.leaf_payload(), record.token, subtree_path);
    let account_leaf = if clear_account {
        empty_leaf
    } else {
        account_leaf_hash(&record.owner_pubkey, &subtree_root, record.account_nonce)
    };

    AccountCommitment {
        subtree_root,
        account_leaf,
        root: account_root(&account_leaf, record.account, account_path),
        account_is_empty: account_leaf == empty_leaf,
        subaccount_is_empty: record.subaccount.is_empty(),
    }
}
