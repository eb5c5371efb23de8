//! Withdrawals back to L1
//!
//! A partial exit is a signed debit. A full exit is forced from L1 and needs
//! no signature; it publishes the account's owner hash and subtree root and
//! resets the account leaf to empty.

use rollup_constraints::{Side, TxType};
use rollup_primitives::params::{
    ACCOUNT_BYTES, AMOUNT_PACKED_BYTES, FEE_PACKED_BYTES, NONCE_BYTES, TOKEN_BYTES,
};
use rollup_primitives::{Digest, Hash256};

use super::{BranchUpdate, OperationValidator, SigMessage, ValidationContext};
use crate::error::VerifyResult;
use crate::pubdata::PubdataWriter;
use crate::witness::{BranchRecord, OpArgs};

pub fn partial_exit_pubdata(args: &OpArgs, account: &BranchRecord) -> Vec<u8> {
    PubdataWriter::new(TxType::PartialExit)
        .uint(account.account, ACCOUNT_BYTES)
        .uint(account.token, TOKEN_BYTES)
        .uint(args.amount_packed, AMOUNT_PACKED_BYTES)
        .uint(args.fee_packed, FEE_PACKED_BYTES)
        .finish()
}

pub fn partial_exit_message(args: &OpArgs, account: &BranchRecord) -> Hash256 {
    SigMessage::new(TxType::PartialExit)
        .uint(account.account, ACCOUNT_BYTES)
        .uint(account.token, TOKEN_BYTES)
        .uint(account.account_nonce, NONCE_BYTES)
        .uint(args.amount_packed, AMOUNT_PACKED_BYTES)
        .uint(args.fee_packed, FEE_PACKED_BYTES)
        .finish()
}

pub fn full_exit_pubdata(account: &BranchRecord, subtree_root: &Digest) -> Vec<u8> {
    PubdataWriter::new(TxType::FullExit)
        .uint(account.account, ACCOUNT_BYTES)
        .bytes(&account.owner_pubkey.hash())
        .bytes(&subtree_root.to_bytes())
        .finish()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PartialExitValidator;

impl OperationValidator for PartialExitValidator {
    fn name(&self) -> &'static str {
        TxType::PartialExit.name()
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>> {
        if !ctx.is(TxType::PartialExit, Side::Lhs) {
            return Ok(None);
        }
        let (cur, args, computed) = (ctx.cur, ctx.args(), ctx.computed);
        let total = computed.amount.checked_add(computed.fee);
        let msg = partial_exit_message(args, cur);

        let authorized = ctx.authorized_by(&cur.owner_pubkey, &msg)
            && ctx.range_holds(Some(cur.balance), total);
        let Some(total) = total.filter(|_| authorized) else {
            return Ok(None);
        };

        ctx.expect_pubdata(|| partial_exit_pubdata(args, cur))?;
        let nonce = ctx.incremented_nonce()?;

        let mut record = cur.clone();
        record.balance = cur.balance - total;
        record.account_nonce = nonce;
        Ok(Some(BranchUpdate::new(record)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FullExitValidator;

impl OperationValidator for FullExitValidator {
    fn name(&self) -> &'static str {
        TxType::FullExit.name()
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>> {
        if !ctx.is(TxType::FullExit, Side::Lhs) || ctx.computed.account_is_empty {
            return Ok(None);
        }
        let cur = ctx.cur;

        ctx.expect_pubdata(|| full_exit_pubdata(cur, &ctx.computed.subtree_root))?;

        Ok(Some(BranchUpdate::cleared(BranchRecord {
            account: cur.account,
            token: cur.token,
            ..BranchRecord::default()
        })))
    }
}
