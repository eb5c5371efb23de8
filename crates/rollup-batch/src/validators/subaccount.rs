//! Subaccount lifecycle
//!
//! The owner (RHS) opens a subaccount funded from its main balance and names
//! a cosigner account (LHS). Closing it cooperatively pays the subaccount
//! balance back to the owner and the cosigner balance to the cosigner.

use rollup_constraints::{Side, TxType};
use rollup_primitives::params::{
    ACCOUNT_BYTES, AMOUNT_PACKED_BYTES, FEE_PACKED_BYTES, NONCE_BYTES, TOKEN_BYTES,
};
use rollup_primitives::Hash256;

use super::{BranchUpdate, OperationValidator, SigMessage, ValidationContext};
use crate::error::VerifyResult;
use crate::pubdata::PubdataWriter;
use crate::witness::{BranchRecord, OpArgs, SubaccountLeaf};

pub fn create_pubdata(args: &OpArgs, cosigner: &BranchRecord, owner: &BranchRecord) -> Vec<u8> {
    PubdataWriter::new(TxType::CreateSubaccount)
        .uint(owner.account, ACCOUNT_BYTES)
        .uint(owner.token, TOKEN_BYTES)
        .uint(cosigner.account, ACCOUNT_BYTES)
        .uint(args.amount_packed, AMOUNT_PACKED_BYTES)
        .uint(args.fee_packed, FEE_PACKED_BYTES)
        .finish()
}

pub fn create_message(args: &OpArgs, cosigner: &BranchRecord, owner: &BranchRecord) -> Hash256 {
    SigMessage::new(TxType::CreateSubaccount)
        .uint(owner.account, ACCOUNT_BYTES)
        .uint(cosigner.account, ACCOUNT_BYTES)
        .uint(owner.token, TOKEN_BYTES)
        .uint(owner.account_nonce, NONCE_BYTES)
        .uint(args.amount_packed, AMOUNT_PACKED_BYTES)
        .uint(args.fee_packed, FEE_PACKED_BYTES)
        .finish()
}

pub fn close_pubdata(args: &OpArgs, cosigner: &BranchRecord, owner: &BranchRecord) -> Vec<u8> {
    PubdataWriter::new(TxType::CloseSubaccount)
        .uint(owner.account, ACCOUNT_BYTES)
        .uint(owner.token, TOKEN_BYTES)
        .uint(cosigner.account, ACCOUNT_BYTES)
        .uint(owner.subaccount.creation_nonce, NONCE_BYTES)
        .uint(args.fee_packed, FEE_PACKED_BYTES)
        .finish()
}

pub fn close_message(args: &OpArgs, cosigner: &BranchRecord, owner: &BranchRecord) -> Hash256 {
    SigMessage::new(TxType::CloseSubaccount)
        .uint(owner.account, ACCOUNT_BYTES)
        .uint(cosigner.account, ACCOUNT_BYTES)
        .uint(owner.token, TOKEN_BYTES)
        .uint(owner.account_nonce, NONCE_BYTES)
        .uint(args.fee_packed, FEE_PACKED_BYTES)
        .finish()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CreateSubaccountValidator;

impl OperationValidator for CreateSubaccountValidator {
    fn name(&self) -> &'static str {
        TxType::CreateSubaccount.name()
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>> {
        if ctx.op.tx_type != TxType::CreateSubaccount {
            return Ok(None);
        }
        let (lhs, rhs, args) = (ctx.lhs(), ctx.rhs(), ctx.args());
        let (cur, computed) = (ctx.cur, ctx.computed);
        let total = computed.amount.checked_add(computed.fee);
        let layout = || create_pubdata(args, lhs, rhs);

        if ctx.side == Side::Lhs {
            // cosigner side only cross-checks the owner's funding
            if computed.account_is_empty || !ctx.range_holds(Some(rhs.balance), total) {
                return Ok(None);
            }
            ctx.expect_pubdata(layout)?;
            return Ok(Some(BranchUpdate::new(cur.clone())));
        }

        let sub = &cur.subaccount;
        let funded = sub.balance.checked_add(computed.amount);
        let remaining = total.and_then(|t| cur.balance.checked_sub(t));
        let authorized = ctx.authorized_by(&cur.owner_pubkey, &create_message(args, lhs, rhs))
            && computed.subaccount_is_empty
            && ctx.range_holds(funded, Some(sub.balance));
        let (Some(funded), Some(remaining)) = (funded, remaining) else {
            return Ok(None);
        };
        if !authorized {
            return Ok(None);
        }

        ctx.expect_pubdata(layout)?;
        let nonce = ctx.incremented_nonce()?;

        let mut record = cur.clone();
        record.subaccount = SubaccountLeaf {
            balance: funded,
            creation_nonce: cur.account_nonce,
            cosigner_pubkey: lhs.owner_pubkey,
            cosigner_balance: sub.cosigner_balance,
            token: cur.token,
        };
        record.balance = remaining;
        record.account_nonce = nonce;
        Ok(Some(BranchUpdate::new(record)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CloseSubaccountValidator;

impl OperationValidator for CloseSubaccountValidator {
    fn name(&self) -> &'static str {
        TxType::CloseSubaccount.name()
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>> {
        if ctx.op.tx_type != TxType::CloseSubaccount {
            return Ok(None);
        }
        let (lhs, rhs, args) = (ctx.lhs(), ctx.rhs(), ctx.args());
        let (cur, computed) = (ctx.cur, ctx.computed);
        let layout = || close_pubdata(args, lhs, rhs);

        if ctx.side == Side::Lhs {
            let sub = &rhs.subaccount;
            let credited = cur.balance.checked_add(sub.cosigner_balance);
            let authorized = !computed.account_is_empty
                && cur.token == rhs.token
                && !sub.is_empty()
                && sub.cosigner_pubkey == cur.owner_pubkey
                && ctx.range_holds(credited, Some(cur.balance));
            let Some(credited) = credited.filter(|_| authorized) else {
                return Ok(None);
            };
            ctx.expect_pubdata(layout)?;

            let mut record = cur.clone();
            record.balance = credited;
            return Ok(Some(BranchUpdate::new(record)));
        }

        let sub = &cur.subaccount;
        let released = cur.balance.checked_add(sub.balance);
        let authorized = ctx.authorized_by(&cur.owner_pubkey, &close_message(args, lhs, rhs))
            && !computed.subaccount_is_empty
            && sub.cosigner_pubkey == lhs.owner_pubkey
            && ctx.range_holds(released, Some(computed.fee));
        let Some(released) = released.filter(|_| authorized) else {
            return Ok(None);
        };

        ctx.expect_pubdata(layout)?;
        let nonce = ctx.incremented_nonce()?;

        let mut record = cur.clone();
        record.balance = released - computed.fee;
        record.subaccount = SubaccountLeaf::default();
        record.account_nonce = nonce;
        Ok(Some(BranchUpdate::new(record)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::error::VerifyError;
    use crate::witness::Operation;
    use rollup_constraints::{AMOUNT_FORMAT, FEE_FORMAT};

    fn create_op(chunk: u32) -> Operation {
        let owner = key("owner");
        let mut op = operation(TxType::CreateSubaccount, chunk);
        op.lhs.account = 10;
        op.lhs.owner_pubkey = key("cosigner").public_key();
        op.lhs.balance = 5;
        op.rhs.account = 11;
        op.rhs.owner_pubkey = owner.public_key();
        op.rhs.balance = 1_000;
        op.rhs.account_nonce = 2;
        op.args.amount_packed = AMOUNT_FORMAT.pack(600).unwrap();
        op.args.fee_packed = FEE_FORMAT.pack(10).unwrap();
        let msg = create_message(&op.args, &op.lhs, &op.rhs);
        sign(&mut op, Side::Rhs, &owner, msg);
        if chunk == 0 {
            op.a = 1_000;
            op.b = 610;
        } else {
            op.a = 600;
            op.b = 0;
        }
        op
    }

    fn close_op(chunk: u32) -> Operation {
        let owner = key("owner");
        let mut op = operation(TxType::CloseSubaccount, chunk);
        op.lhs.account = 10;
        op.lhs.owner_pubkey = key("cosigner").public_key();
        op.lhs.balance = 5;
        op.rhs.account = 11;
        op.rhs.owner_pubkey = owner.public_key();
        op.rhs.balance = 390;
        op.rhs.account_nonce = 3;
        op.rhs.subaccount = SubaccountLeaf {
            balance: 550,
            creation_nonce: 2,
            cosigner_pubkey: op.lhs.owner_pubkey,
            cosigner_balance: 50,
            token: 0,
        };
        op.args.fee_packed = FEE_FORMAT.pack(10).unwrap();
        let msg = close_message(&op.args, &op.lhs, &op.rhs);
        sign(&mut op, Side::Rhs, &owner, msg);
        if chunk == 0 {
            op.a = 55;
            op.b = 5;
        } else {
            op.a = 940;
            op.b = 10;
        }
        op
    }

    #[test]
    fn test_create_cosigner_side_unchanged() {
        let op = create_op(0);
        let update = run(&CreateSubaccountValidator, &op, 600, 10, &[], false)
            .unwrap()
            .unwrap();
        assert_eq!(update.record, op.lhs);
    }

    #[test]
    fn test_create_initializes_subaccount() {
        let op = create_op(1);
        let layout = create_pubdata(&op.args, &op.lhs, &op.rhs);
        let update = run(&CreateSubaccountValidator, &op, 600, 10, &layout, true)
            .unwrap()
            .unwrap();
        let record = update.record;
        assert_eq!(record.balance, 390);
        assert_eq!(record.account_nonce, 3);
        assert_eq!(record.subaccount.balance, 600);
        assert_eq!(record.subaccount.creation_nonce, 2);
        assert_eq!(record.subaccount.cosigner_pubkey, op.lhs.owner_pubkey);
    }

    #[test]
    fn test_create_over_existing_subaccount_declines() {
        let mut op = create_op(1);
        op.rhs.subaccount.balance = 1;
        op.a = 601;
        op.b = 1;
        let msg = create_message(&op.args, &op.lhs, &op.rhs);
        sign(&mut op, Side::Rhs, &key("owner"), msg);
        assert_eq!(run(&CreateSubaccountValidator, &op, 600, 10, &[], false), Ok(None));
    }

    #[test]
    fn test_create_underfunded_declines() {
        let mut op = create_op(1);
        op.rhs.balance = 609;
        let msg = create_message(&op.args, &op.lhs, &op.rhs);
        sign(&mut op, Side::Rhs, &key("owner"), msg);
        assert_eq!(run(&CreateSubaccountValidator, &op, 600, 10, &[], false), Ok(None));
    }

    #[test]
    fn test_close_pays_cosigner() {
        let op = close_op(0);
        let update = run(&CloseSubaccountValidator, &op, 0, 10, &[], false)
            .unwrap()
            .unwrap();
        assert_eq!(update.record.balance, 55);
    }

    #[test]
    fn test_close_returns_funds_to_owner() {
        let op = close_op(1);
        let layout = close_pubdata(&op.args, &op.lhs, &op.rhs);
        let update = run(&CloseSubaccountValidator, &op, 0, 10, &layout, true)
            .unwrap()
            .unwrap();
        assert_eq!(update.record.balance, 930);
        assert_eq!(update.record.account_nonce, 4);
        assert!(update.record.subaccount.is_empty());
    }

    #[test]
    fn test_close_with_foreign_cosigner_declines() {
        let mut op = close_op(0);
        op.lhs.owner_pubkey = key("stranger").public_key();
        assert_eq!(run(&CloseSubaccountValidator, &op, 0, 10, &[], false), Ok(None));
    }

    #[test]
    fn test_close_pubdata_mismatch() {
        let op = close_op(1);
        let mut layout = close_pubdata(&op.args, &op.lhs, &op.rhs);
        layout[8] ^= 0xff;
        assert!(matches!(
            run(&CloseSubaccountValidator, &op, 0, 10, &layout, true),
            Err(VerifyError::PubdataMismatch { .. })
        ));
    }
}
