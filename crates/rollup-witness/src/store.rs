//! In-memory account state backed by sparse Rescue Merkle trees
//!
//! Only nodes that differ from the empty tree are stored. Every account keeps
//! its own balance and subaccount trees; the account tree holds the leaf
//! hashes that bind them.

use std::collections::{BTreeMap, HashMap};

use rollup_batch::state::leaf::{account_leaf_hash, balance_leaf_hash, subaccount_leaf_hash};
use rollup_batch::{empty_hashes, BranchRecord, BranchUpdate, SubaccountLeaf, SubtreePath};
use rollup_primitives::params::{ACCOUNT_TREE_DEPTH, SUBTREE_DEPTH};
use rollup_primitives::{rescue_hash_pair, Digest, PubKey};

use crate::error::{WitnessError, WitnessResult};

/// Fixed-depth Merkle tree that stores only non-default nodes
#[derive(Debug, Clone)]
pub struct SparseMerkleTree {
    /// `nodes[h]` maps an index at height `h` to its hash
    nodes: Vec<HashMap<u64, Digest>>,
    /// Hash of an all-default subtree at each height
    defaults: Vec<Digest>,
}

impl SparseMerkleTree {
    /// Empty tree whose default hashes are `defaults[0..=depth]`
    pub fn new(defaults: Vec<Digest>) -> Self {
        let nodes = vec![HashMap::new(); defaults.len()];
        Self { nodes, defaults }
    }

    pub fn depth(&self) -> usize {
        self.defaults.len() - 1
    }

    pub fn node(&self, height: usize, index: u64) -> Digest {
        self.nodes[height]
            .get(&index)
            .copied()
            .unwrap_or(self.defaults[height])
    }

    pub fn root(&self) -> Digest {
        self.node(self.depth(), 0)
    }

    /// Sibling hashes from the leaf level upward
    pub fn path(&self, index: u64) -> Vec<Digest> {
        (0..self.depth())
            .map(|height| self.node(height, (index >> height) ^ 1))
            .collect()
    }

    /// Write a leaf and rehash its ancestors
    pub fn set(&mut self, index: u64, leaf: Digest) {
        self.put(0, index, leaf);
        for height in 0..self.depth() {
            let idx = index >> height;
            let left = self.node(height, idx & !1);
            let right = self.node(height, idx | 1);
            self.put(height + 1, idx >> 1, rescue_hash_pair(&left, &right));
        }
    }

    fn put(&mut self, height: usize, index: u64, hash: Digest) {
        if hash == self.defaults[height] {
            self.nodes[height].remove(&index);
        } else {
            self.nodes[height].insert(index, hash);
        }
    }
}

/// One token slot: balance leaf plus subaccount leaf
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TokenSlot {
    balance: u128,
    leaf_nonce: u32,
    subaccount: SubaccountLeaf,
}

#[derive(Debug, Clone)]
struct AccountState {
    owner: PubKey,
    nonce: u32,
    slots: BTreeMap<u32, TokenSlot>,
    balances: SparseMerkleTree,
    subaccounts: SparseMerkleTree,
}

impl AccountState {
    fn new() -> Self {
        let empty = empty_hashes();
        Self {
            owner: PubKey::EMPTY,
            nonce: 0,
            slots: BTreeMap::new(),
            balances: SparseMerkleTree::new(empty.balance_tree.clone()),
            subaccounts: SparseMerkleTree::new(empty.subaccount_tree.clone()),
        }
    }

    fn subtree_root(&self) -> Digest {
        rescue_hash_pair(&self.balances.root(), &self.subaccounts.root())
    }

    fn leaf(&self) -> Digest {
        account_leaf_hash(&self.owner, &self.subtree_root(), self.nonce)
    }

    fn write_slot(&mut self, token: u32, slot: TokenSlot) {
        self.balances.set(
            token as u64,
            balance_leaf_hash(slot.balance, slot.leaf_nonce),
        );
        self.subaccounts
            .set(token as u64, subaccount_leaf_hash(&slot.subaccount));
        if slot == TokenSlot::default() {
            self.slots.remove(&token);
        } else {
            self.slots.insert(token, slot);
        }
    }
}

/// Committed rollup state: accounts, their token slots and the account tree
#[derive(Debug, Clone)]
pub struct AccountStore {
    accounts: HashMap<u32, AccountState>,
    tree: SparseMerkleTree,
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore {
    /// State with no accounts; its root is the empty-state root
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            tree: SparseMerkleTree::new(empty_hashes().account_tree.clone()),
        }
    }

    pub fn root(&self) -> Digest {
        self.tree.root()
    }

    pub fn num_accounts(&self) -> usize {
        self.accounts.len()
    }

    pub fn owner(&self, account: u32) -> Option<PubKey> {
        self.accounts.get(&account).map(|state| state.owner)
    }

    pub fn balance(&self, account: u32, token: u32) -> u128 {
        self.slot(account, token).map_or(0, |slot| slot.balance)
    }

    pub fn nonce(&self, account: u32) -> u32 {
        self.accounts.get(&account).map_or(0, |state| state.nonce)
    }

    pub fn subaccount(&self, account: u32, token: u32) -> SubaccountLeaf {
        self.slot(account, token)
            .map(|slot| slot.subaccount.clone())
            .unwrap_or_default()
    }

    fn slot(&self, account: u32, token: u32) -> Option<&TokenSlot> {
        self.accounts.get(&account)?.slots.get(&token)
    }

    /// Leaf-and-ancestry snapshot of one token slot, without signature fields
    pub fn branch(&self, account: u32, token: u32) -> WitnessResult<BranchRecord> {
        check_indices(account, token)?;
        let mut record = BranchRecord {
            account,
            token,
            ..BranchRecord::default()
        };
        if let Some(state) = self.accounts.get(&account) {
            record.owner_pubkey = state.owner;
            record.account_nonce = state.nonce;
            if let Some(slot) = state.slots.get(&token) {
                record.balance = slot.balance;
                record.leaf_nonce = slot.leaf_nonce;
                record.subaccount = slot.subaccount.clone();
            }
        }
        Ok(record)
    }

    /// Account-tree siblings of `account`, leaf level first
    pub fn account_path(&self, account: u32) -> Vec<Digest> {
        self.tree.path(account as u64)
    }

    /// Balance and subaccount siblings of one token slot
    pub fn subtree_path(&self, account: u32, token: u32) -> SubtreePath {
        match self.accounts.get(&account) {
            Some(state) => SubtreePath {
                balances: state.balances.path(token as u64),
                subaccounts: state.subaccounts.path(token as u64),
            },
            None => {
                let empty = empty_hashes();
                SubtreePath {
                    balances: empty.balance_tree[..SUBTREE_DEPTH].to_vec(),
                    subaccounts: empty.subaccount_tree[..SUBTREE_DEPTH].to_vec(),
                }
            }
        }
    }

    pub fn subtree_root(&self, account: u32) -> Digest {
        self.accounts
            .get(&account)
            .map_or(empty_hashes().subtree_root, AccountState::subtree_root)
    }

    /// Account-tree node at `height` covering index `index >> height`
    pub fn account_node(&self, height: usize, account: u32) -> Digest {
        self.tree.node(height, (account as u64) >> height)
    }

    /// Write a branch record back into the state
    pub fn apply(&mut self, update: &BranchUpdate) -> WitnessResult<()> {
        let record = &update.record;
        check_indices(record.account, record.token)?;

        if update.clear_account {
            self.accounts.remove(&record.account);
            self.tree
                .set(record.account as u64, empty_hashes().account_leaf());
            return Ok(());
        }

        let state = self
            .accounts
            .entry(record.account)
            .or_insert_with(AccountState::new);
        state.owner = record.owner_pubkey;
        state.nonce = record.account_nonce;
        state.write_slot(
            record.token,
            TokenSlot {
                balance: record.balance,
                leaf_nonce: record.leaf_nonce,
                subaccount: record.subaccount.clone(),
            },
        );

        let leaf = state.leaf();
        if leaf == empty_hashes().account_leaf() {
            self.accounts.remove(&record.account);
        }
        self.tree.set(record.account as u64, leaf);
        Ok(())
    }

    /// Seed a slot directly, bypassing every operation rule
    pub fn insert(&mut self, record: BranchRecord) -> WitnessResult<()> {
        self.apply(&BranchUpdate::new(record))
    }

    /// Open an account holding `balance` of `token`
    pub fn open_account(
        &mut self,
        account: u32,
        owner: PubKey,
        token: u32,
        balance: u128,
    ) -> WitnessResult<()> {
        let mut record = self.branch(account, token)?;
        record.owner_pubkey = owner;
        record.balance = balance;
        self.insert(record)
    }

    /// Overwrite an account's nonce
    pub fn set_nonce(&mut self, account: u32, nonce: u32) -> WitnessResult<()> {
        let mut record = self.branch(account, 0)?;
        record.account_nonce = nonce;
        self.insert(record)
    }
}

fn check_indices(account: u32, token: u32) -> WitnessResult<()> {
    if (account as u64) >> ACCOUNT_TREE_DEPTH != 0 {
        return Err(WitnessError::AccountOutOfRange(account));
    }
    if (token as u64) >> SUBTREE_DEPTH != 0 {
        return Err(WitnessError::TokenOutOfRange(token));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollup_batch::check_account_data;

    fn owner() -> PubKey {
        PubKey([3u8; 32])
    }

    #[test]
    fn test_empty_store_has_empty_root() {
        let store = AccountStore::new();
        assert_eq!(store.root(), empty_hashes().state_root());
        assert_eq!(store.num_accounts(), 0);
    }

    #[test]
    fn test_sparse_tree_path_folds_to_root() {
        let mut tree = SparseMerkleTree::new(empty_hashes().account_tree.clone());
        tree.set(5, Digest::default());
        tree.set(1 << 20, empty_hashes().subtree_root);
        let root = tree.root();
        let path = tree.path(5);
        assert_eq!(path.len(), ACCOUNT_TREE_DEPTH);
        assert_eq!(
            rollup_batch::state::merkle_root(Digest::default(), 5, &path),
            root
        );
    }

    #[test]
    fn test_resetting_leaf_prunes_nodes() {
        let empty = empty_hashes().account_tree.clone();
        let mut tree = SparseMerkleTree::new(empty.clone());
        tree.set(9, Digest::default());
        assert_ne!(tree.root(), empty[ACCOUNT_TREE_DEPTH]);
        tree.set(9, empty[0]);
        assert_eq!(tree.root(), empty[ACCOUNT_TREE_DEPTH]);
        assert!(tree.nodes.iter().all(HashMap::is_empty));
    }

    #[test]
    fn test_branch_commits_to_store_root() {
        let mut store = AccountStore::new();
        store.open_account(3, owner(), 1, 500).unwrap();
        store.open_account(900, PubKey([4u8; 32]), 0, 7).unwrap();

        for (account, token) in [(3, 1), (3, 0), (900, 0), (42, 5)] {
            let record = store.branch(account, token).unwrap();
            let commitment = check_account_data(
                &record,
                &store.subtree_path(account, token),
                &store.account_path(account),
                false,
            );
            assert_eq!(commitment.root, store.root(), "account {account}");
            assert_eq!(commitment.subtree_root, store.subtree_root(account));
        }
    }

    #[test]
    fn test_apply_clear_account() {
        let mut store = AccountStore::new();
        store.open_account(11, owner(), 2, 40).unwrap();
        let record = store.branch(11, 2).unwrap();
        store.apply(&BranchUpdate::cleared(record)).unwrap();
        assert_eq!(store.root(), empty_hashes().state_root());
        assert_eq!(store.owner(11), None);
    }

    #[test]
    fn test_accessors() {
        let mut store = AccountStore::new();
        store.open_account(1, owner(), 4, 99).unwrap();
        store.set_nonce(1, 17).unwrap();
        assert_eq!(store.owner(1), Some(owner()));
        assert_eq!(store.balance(1, 4), 99);
        assert_eq!(store.balance(1, 5), 0);
        assert_eq!(store.nonce(1), 17);
        assert!(store.subaccount(1, 4).is_empty());
    }

    #[test]
    fn test_out_of_range_indices() {
        let store = AccountStore::new();
        assert!(matches!(
            store.branch(1 << ACCOUNT_TREE_DEPTH, 0),
            Err(WitnessError::AccountOutOfRange(_))
        ));
        assert!(matches!(
            store.branch(0, 1 << SUBTREE_DEPTH),
            Err(WitnessError::TokenOutOfRange(_))
        ));
    }
}
