//! Transfer into an account that does not exist yet
//!
//! The sender signs the recipient key itself; only its hash reaches pubdata,
//! alongside a compact (reduced precision) amount.

use rollup_constraints::{Side, TxType};
use rollup_primitives::params::{
    ACCOUNT_BYTES, COMPACT_AMOUNT_BYTES, FEE_PACKED_BYTES, TOKEN_BYTES,
};

use super::transfer::debit_sender;
use super::{BranchUpdate, OperationValidator, ValidationContext};
use crate::error::VerifyResult;
use crate::pubdata::PubdataWriter;
use crate::witness::{BranchRecord, OpArgs};

pub fn pubdata(args: &OpArgs, lhs: &BranchRecord, rhs: &BranchRecord) -> Vec<u8> {
    PubdataWriter::new(TxType::TransferToNew)
        .uint(lhs.account, ACCOUNT_BYTES)
        .uint(lhs.token, TOKEN_BYTES)
        .uint(args.compact_amount, COMPACT_AMOUNT_BYTES)
        .bytes(&args.new_pubkey.hash())
        .uint(rhs.account, ACCOUNT_BYTES)
        .uint(args.fee_packed, FEE_PACKED_BYTES)
        .finish()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferToNewValidator;

impl OperationValidator for TransferToNewValidator {
    fn name(&self) -> &'static str {
        TxType::TransferToNew.name()
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>> {
        if ctx.op.tx_type != TxType::TransferToNew {
            return Ok(None);
        }
        let (lhs, rhs, args) = (ctx.lhs(), ctx.rhs(), ctx.args());
        let layout = || pubdata(args, lhs, rhs);

        if ctx.side == Side::Lhs {
            return debit_sender(ctx, &args.new_pubkey, layout);
        }

        let (cur, computed) = (ctx.cur, ctx.computed);
        let authorized = computed.account_is_empty
            && cur.token == lhs.token
            && computed.compact_amount_correct
            && !args.new_pubkey.is_empty();
        if !authorized {
            return Ok(None);
        }

        ctx.expect_pubdata(layout)?;

        let mut record = cur.clone();
        record.owner_pubkey = args.new_pubkey;
        record.balance = computed.amount;
        Ok(Some(BranchUpdate::new(record)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::transfer::signed_message;
    use super::*;
    use crate::error::VerifyError;
    use crate::witness::Operation;
    use rollup_constraints::{AMOUNT_FORMAT, FEE_FORMAT};

    const AMOUNT: u128 = 256 * 12;

    fn transfer_to_new_op(chunk: u32) -> Operation {
        let alice = key("alice");
        let mut op = operation(TxType::TransferToNew, chunk);
        op.lhs.account = 3;
        op.lhs.owner_pubkey = alice.public_key();
        op.lhs.balance = 10_000;
        op.rhs.account = 9;
        op.args.amount_packed = AMOUNT_FORMAT.pack(AMOUNT).unwrap();
        op.args.fee_packed = FEE_FORMAT.pack(5).unwrap();
        op.args.compact_amount = 12;
        op.args.new_pubkey = key("newcomer").public_key();

        let msg = signed_message(TxType::TransferToNew, &op.args, &op.lhs, &op.args.new_pubkey);
        sign(&mut op, Side::Lhs, &alice, msg);
        op.a = 10_000;
        op.b = AMOUNT + 5;
        op
    }

    #[test]
    fn test_every_even_chunk_debits_sender() {
        for chunk in [0, 2, 4] {
            let op = transfer_to_new_op(chunk);
            let layout = pubdata(&op.args, &op.lhs, &op.rhs);
            let update = run(&TransferToNewValidator, &op, AMOUNT, 5, &layout, chunk == 4)
                .unwrap()
                .unwrap();
            assert_eq!(update.record.balance, 10_000 - AMOUNT - 5);
            assert_eq!(update.record.account_nonce, 1);
        }
    }

    #[test]
    fn test_recipient_account_created() {
        let op = transfer_to_new_op(1);
        let update = run(&TransferToNewValidator, &op, AMOUNT, 5, &[], false)
            .unwrap()
            .unwrap();
        assert_eq!(update.record.owner_pubkey, op.args.new_pubkey);
        assert_eq!(update.record.balance, AMOUNT);
    }

    #[test]
    fn test_wrong_compact_amount_declines() {
        let mut op = transfer_to_new_op(3);
        op.args.compact_amount = 13;
        assert_eq!(run(&TransferToNewValidator, &op, AMOUNT, 5, &[], false), Ok(None));
    }

    #[test]
    fn test_existing_recipient_declines() {
        let mut op = transfer_to_new_op(1);
        op.rhs.owner_pubkey = key("squatter").public_key();
        assert_eq!(run(&TransferToNewValidator, &op, AMOUNT, 5, &[], false), Ok(None));
    }

    #[test]
    fn test_pubdata_carries_recipient_hash() {
        let mut op = transfer_to_new_op(4);
        let layout = pubdata(&op.args, &op.lhs, &op.rhs);
        assert_eq!(&layout[10..30], &op.args.new_pubkey.hash());

        // recipient key swapped after signing: the message no longer matches
        op.args.new_pubkey = key("someone-else").public_key();
        assert_eq!(
            run(&TransferToNewValidator, &op, AMOUNT, 5, &layout, true),
            Ok(None)
        );
    }

    #[test]
    fn test_layout_mismatch_on_last_chunk() {
        let op = transfer_to_new_op(4);
        let mut layout = pubdata(&op.args, &op.lhs, &op.rhs);
        layout[31] ^= 1;
        assert!(matches!(
            run(&TransferToNewValidator, &op, AMOUNT, 5, &layout, true),
            Err(VerifyError::PubdataMismatch { .. })
        ));
    }
}
