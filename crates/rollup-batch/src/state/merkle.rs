//! Merkle verification over sibling paths
//!
//! Paths list siblings from the leaf level upward. Bit `h` of the index
//! decides whether the running node is the left (0) or right (1) child at
//! height `h`.

use std::borrow::Cow;

use rollup_constraints::Side;
use rollup_primitives::{rescue_hash_pair, Digest};

use super::leaf::{balance_leaf_hash, subaccount_leaf_hash, LeafPayload};
use crate::witness::SubtreePath;

/// Fold `leaf` up through the first `height` siblings of `path`
pub fn node_at_height(leaf: Digest, index: u64, path: &[Digest], height: usize) -> Digest {
    path.iter()
        .take(height)
        .enumerate()
        .fold(leaf, |node, (h, sibling)| {
            if (index >> h) & 1 == 0 {
                rescue_hash_pair(&node, sibling)
            } else {
                rescue_hash_pair(sibling, &node)
            }
        })
}

/// Root recomputed from a leaf, its index and the full sibling path
pub fn merkle_root(leaf: Digest, index: u64, path: &[Digest]) -> Digest {
    node_at_height(leaf, index, path, path.len())
}

/// Root of an account's subtree from one token slot and its two paths
pub fn subtree_root(payload: &LeafPayload<'_>, index: u32, path: &SubtreePath) -> Digest {
    let balances_root = merkle_root(
        balance_leaf_hash(payload.balance, payload.leaf_nonce),
        index as u64,
        &path.balances,
    );
    let subaccounts_root = merkle_root(
        subaccount_leaf_hash(payload.subaccount),
        index as u64,
        &path.subaccounts,
    );
    rescue_hash_pair(&balances_root, &subaccounts_root)
}

/// State root from an account leaf
pub fn account_root(account_leaf_hash: &Digest, index: u32, path: &[Digest]) -> Digest {
    merkle_root(*account_leaf_hash, index as u64, path)
}

/// Height at which the paths of two distinct indices become siblings
pub fn divergence_height(a: u32, b: u32) -> Option<usize> {
    let diff = a ^ b;
    if diff == 0 {
        None
    } else {
        Some((u32::BITS - 1 - diff.leading_zeros()) as usize)
    }
}

/// Account path for the post-update check of a two-sided operation
///
/// The current side's sibling at the divergence height is the other side's
/// subtree, which this operation also rewrites. It is replaced with that
/// side's post-update node so both updates compose into one root. Identical
/// indices have no divergence point and keep the base path.
pub fn intersection_path<'a>(
    base_path: &'a [Digest],
    account_idx: u32,
    lhs_idx: u32,
    rhs_idx: u32,
    lhs_new_hash: &Digest,
    rhs_new_hash: &Digest,
    selected_side: Side,
) -> Cow<'a, [Digest]> {
    let (other_idx, other_hash) = match selected_side {
        Side::Lhs => (rhs_idx, rhs_new_hash),
        Side::Rhs => (lhs_idx, lhs_new_hash),
    };

    match divergence_height(account_idx, other_idx) {
        Some(height) if height < base_path.len() => {
            let mut path = base_path.to_vec();
            path[height] = *other_hash;
            Cow::Owned(path)
        }
        _ => Cow::Borrowed(base_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollup_primitives::{felt_from_u64, rescue_hash};

    fn leaf(n: u64) -> Digest {
        rescue_hash(&[felt_from_u64(n)])
    }

    /// Dense depth-3 tree over 8 leaves, every level from the leaves up
    fn dense_tree(leaves: &[Digest; 8]) -> Vec<Vec<Digest>> {
        let mut levels = vec![leaves.to_vec()];
        while levels.last().map_or(0, |l| l.len()) > 1 {
            let prev = levels.last().unwrap();
            let next = prev
                .chunks(2)
                .map(|pair| rescue_hash_pair(&pair[0], &pair[1]))
                .collect();
            levels.push(next);
        }
        levels
    }

    fn path_of(levels: &[Vec<Digest>], index: usize) -> Vec<Digest> {
        (0..levels.len() - 1)
            .map(|h| levels[h][(index >> h) ^ 1])
            .collect()
    }

    #[test]
    fn test_merkle_root_matches_dense_tree() {
        let leaves: [Digest; 8] = std::array::from_fn(|i| leaf(i as u64));
        let levels = dense_tree(&leaves);
        let root = levels[3][0];
        for i in 0..8 {
            let path = path_of(&levels, i);
            assert_eq!(merkle_root(leaves[i], i as u64, &path), root);
        }
    }

    #[test]
    fn test_node_at_height() {
        let leaves: [Digest; 8] = std::array::from_fn(|i| leaf(i as u64));
        let levels = dense_tree(&leaves);
        let path = path_of(&levels, 5);
        assert_eq!(node_at_height(leaves[5], 5, &path, 0), leaves[5]);
        assert_eq!(node_at_height(leaves[5], 5, &path, 2), levels[2][1]);
    }

    #[test]
    fn test_divergence_height() {
        assert_eq!(divergence_height(7, 7), None);
        assert_eq!(divergence_height(6, 7), Some(0));
        assert_eq!(divergence_height(5, 7), Some(1));
        assert_eq!(divergence_height(0, 7), Some(2));
        assert_eq!(divergence_height(1, 1 << 23), Some(23));
    }

    #[test]
    fn test_intersection_composes_two_updates() {
        let mut leaves: [Digest; 8] = std::array::from_fn(|i| leaf(i as u64));
        let before = dense_tree(&leaves);
        let (lhs_idx, rhs_idx) = (2usize, 7usize);
        let lhs_path = path_of(&before, lhs_idx);
        let rhs_path = path_of(&before, rhs_idx);

        // apply both updates on the real tree
        leaves[lhs_idx] = leaf(100);
        leaves[rhs_idx] = leaf(200);
        let after = dense_tree(&leaves);
        let expected_root = after[3][0];

        let height = divergence_height(lhs_idx as u32, rhs_idx as u32).unwrap();
        let lhs_new = after[height][lhs_idx >> height];
        let rhs_new = after[height][rhs_idx >> height];

        for (side, idx, path, new_leaf) in [
            (Side::Lhs, lhs_idx, &lhs_path, leaves[lhs_idx]),
            (Side::Rhs, rhs_idx, &rhs_path, leaves[rhs_idx]),
        ] {
            let rewritten = intersection_path(
                path,
                idx as u32,
                lhs_idx as u32,
                rhs_idx as u32,
                &lhs_new,
                &rhs_new,
                side,
            );
            assert_eq!(merkle_root(new_leaf, idx as u64, &rewritten), expected_root);
            // the unmodified path only reflects one of the two updates
            assert_ne!(merkle_root(new_leaf, idx as u64, path), expected_root);
        }
    }

    #[test]
    fn test_intersection_same_index_keeps_base() {
        let path = vec![leaf(1), leaf(2), leaf(3)];
        let rewritten = intersection_path(&path, 4, 4, 4, &leaf(9), &leaf(9), Side::Rhs);
        assert!(matches!(rewritten, Cow::Borrowed(_)));
        assert_eq!(&*rewritten, path.as_slice());
    }
}
