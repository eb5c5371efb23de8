//! Padding operation

use rollup_constraints::{Side, TxType};

use super::{BranchUpdate, OperationValidator, ValidationContext};
use crate::error::VerifyResult;
use crate::pubdata::PubdataWriter;

pub fn pubdata() -> Vec<u8> {
    PubdataWriter::new(TxType::Noop).finish()
}

/// Accepts a noop whose single chunk is all zero and leaves the branch as is
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

impl OperationValidator for NoopValidator {
    fn name(&self) -> &'static str {
        TxType::Noop.name()
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>> {
        if !ctx.is(TxType::Noop, Side::Lhs) {
            return Ok(None);
        }
        ctx.expect_pubdata(pubdata)?;
        Ok(Some(BranchUpdate::new(ctx.cur.clone())))
    }
}
