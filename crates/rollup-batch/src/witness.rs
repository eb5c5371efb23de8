//! Witness data consumed by the verifier
//!
//! An [`Operation`] is one chunk of a rollup instruction. All chunks of one
//! logical operation carry the same `args`, `lhs`, `rhs` and `new_root`; only
//! the chunk index, the pubdata slice, the range witnesses and the Merkle
//! paths of the current side change between them.

use serde::{Deserialize, Serialize};

use rollup_constraints::range_check::{check_bit_width, check_length};
use rollup_constraints::{RangeError, Side, TxType};
use rollup_primitives::params::{
    ACCOUNT_BIT_WIDTH, ACCOUNT_TREE_DEPTH, AMOUNT_PACKED_BIT_WIDTH, BALANCE_BIT_WIDTH,
    CHUNK_INDEX_BIT_WIDTH, COMPACT_AMOUNT_BIT_WIDTH, FEE_PACKED_BIT_WIDTH, NONCE_BIT_WIDTH,
    SUBTREE_DEPTH, TOKEN_BIT_WIDTH,
};
use rollup_primitives::{Digest, Hash256, PubKey, SchnorrSignature};

use crate::pubdata::PubdataChunk;

/// Subaccount (two-party channel) fields stored per token
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubaccountLeaf {
    pub balance: u128,
    pub creation_nonce: u32,
    pub cosigner_pubkey: PubKey,
    pub cosigner_balance: u128,
    pub token: u32,
}

impl SubaccountLeaf {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One side's leaf-and-ancestry snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BranchRecord {
    /// Index in the account tree
    pub account: u32,
    /// Index in the account's balance and subaccount trees
    pub token: u32,
    pub owner_pubkey: PubKey,
    pub account_nonce: u32,
    pub balance: u128,
    pub leaf_nonce: u32,
    #[serde(default)]
    pub subaccount: SubaccountLeaf,

    #[serde(default)]
    pub sig_msg: Hash256,
    #[serde(default)]
    pub signer_pubkey: PubKey,
    #[serde(default)]
    pub signature: SchnorrSignature,

    /// This side's post-update account-tree node at the height where the two
    /// branches of a two-sided operation meet
    #[serde(default)]
    pub intersection_hash: Digest,
}

/// Arguments shared by every chunk of one operation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpArgs {
    pub amount_packed: u64,
    pub fee_packed: u64,
    pub compact_amount: u64,
    pub new_pubkey: PubKey,
}

/// Sibling paths inside one account: balance tree and subaccount tree
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubtreePath {
    pub balances: Vec<Digest>,
    pub subaccounts: Vec<Digest>,
}

/// One rollup instruction chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub tx_type: TxType,
    pub chunk: u32,
    pub pubdata_chunk: PubdataChunk,
    pub args: OpArgs,
    pub lhs: BranchRecord,
    pub rhs: BranchRecord,
    pub a: u128,
    pub b: u128,
    pub new_root: Digest,
    /// Account-tree siblings of the current side, leaf level first
    pub account_path: Vec<Digest>,
    pub subtree_path: SubtreePath,
}

/// Everything one verification run consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInput {
    pub prior_root: Digest,
    pub final_root: Digest,
    pub pubdata_commitment: Hash256,
    pub operations: Vec<Operation>,
}

struct BranchFieldNames {
    account: &'static str,
    token: &'static str,
    account_nonce: &'static str,
    balance: &'static str,
    leaf_nonce: &'static str,
    sub_balance: &'static str,
    sub_creation_nonce: &'static str,
    sub_cosigner_balance: &'static str,
    sub_token: &'static str,
}

macro_rules! branch_field_names {
    ($side:literal) => {
        BranchFieldNames {
            account: concat!($side, ".account"),
            token: concat!($side, ".token"),
            account_nonce: concat!($side, ".account_nonce"),
            balance: concat!($side, ".balance"),
            leaf_nonce: concat!($side, ".leaf_nonce"),
            sub_balance: concat!($side, ".subaccount.balance"),
            sub_creation_nonce: concat!($side, ".subaccount.creation_nonce"),
            sub_cosigner_balance: concat!($side, ".subaccount.cosigner_balance"),
            sub_token: concat!($side, ".subaccount.token"),
        }
    };
}

const LHS_FIELDS: BranchFieldNames = branch_field_names!("lhs");
const RHS_FIELDS: BranchFieldNames = branch_field_names!("rhs");

impl BranchRecord {
    /// Bit-width guard over every integer field of the record
    pub fn check_bit_widths(&self, side: Side) -> Result<(), RangeError> {
        let names = match side {
            Side::Lhs => &LHS_FIELDS,
            Side::Rhs => &RHS_FIELDS,
        };
        check_bit_width(names.account, self.account, ACCOUNT_BIT_WIDTH)?;
        check_bit_width(names.token, self.token, TOKEN_BIT_WIDTH)?;
        check_bit_width(names.account_nonce, self.account_nonce, NONCE_BIT_WIDTH)?;
        check_bit_width(names.balance, self.balance, BALANCE_BIT_WIDTH)?;
        check_bit_width(names.leaf_nonce, self.leaf_nonce, NONCE_BIT_WIDTH)?;
        check_bit_width(names.sub_balance, self.subaccount.balance, BALANCE_BIT_WIDTH)?;
        check_bit_width(
            names.sub_creation_nonce,
            self.subaccount.creation_nonce,
            NONCE_BIT_WIDTH,
        )?;
        check_bit_width(
            names.sub_cosigner_balance,
            self.subaccount.cosigner_balance,
            BALANCE_BIT_WIDTH,
        )?;
        check_bit_width(names.sub_token, self.subaccount.token, TOKEN_BIT_WIDTH)?;
        Ok(())
    }
}

impl Operation {
    /// Branch record acting as `cur` for the given side
    pub fn branch(&self, side: Side) -> &BranchRecord {
        match side {
            Side::Lhs => &self.lhs,
            Side::Rhs => &self.rhs,
        }
    }

    /// Bit-width guard over all witness fields of the chunk
    pub fn check_bit_widths(&self) -> Result<(), RangeError> {
        check_bit_width("chunk", self.chunk, CHUNK_INDEX_BIT_WIDTH)?;
        check_bit_width("args.amount_packed", self.args.amount_packed, AMOUNT_PACKED_BIT_WIDTH)?;
        check_bit_width("args.fee_packed", self.args.fee_packed, FEE_PACKED_BIT_WIDTH)?;
        check_bit_width(
            "args.compact_amount",
            self.args.compact_amount,
            COMPACT_AMOUNT_BIT_WIDTH,
        )?;
        check_bit_width("a", self.a, BALANCE_BIT_WIDTH)?;
        check_bit_width("b", self.b, BALANCE_BIT_WIDTH)?;
        self.lhs.check_bit_widths(Side::Lhs)?;
        self.rhs.check_bit_widths(Side::Rhs)?;
        check_length("account_path", self.account_path.len(), ACCOUNT_TREE_DEPTH)?;
        check_length(
            "subtree_path.balances",
            self.subtree_path.balances.len(),
            SUBTREE_DEPTH,
        )?;
        check_length(
            "subtree_path.subaccounts",
            self.subtree_path.subaccounts.len(),
            SUBTREE_DEPTH,
        )?;
        Ok(())
    }
}
