//! Verification of successive batches
//!
//! Each batch's prior root must equal the previous batch's final root. The
//! batches themselves share no state, so they may be verified concurrently.

use rayon::prelude::*;
use tracing::{info, instrument, warn};

use super::batch_verifier::{BatchSummary, BatchVerifier};
use crate::error::{ChainError, VerifyResult};
use crate::witness::BatchInput;

impl BatchVerifier {
    /// Verify state transition chain
    ///
    /// Continuity is checked in order before any batch is executed. The first
    /// failing batch, by position, is reported.
    #[instrument(skip_all, fields(batches = batches.len()))]
    pub fn verify_chain(&self, batches: &[BatchInput]) -> Result<Vec<BatchSummary>, ChainError> {
        for (index, pair) in batches.windows(2).enumerate() {
            if pair[1].prior_root != pair[0].final_root {
                warn!(batch = index + 1, "chain discontinuity");
                return Err(ChainError::Discontinuity {
                    index: index + 1,
                    expected: pair[0].final_root,
                    actual: pair[1].prior_root,
                });
            }
        }

        let outcomes: Vec<VerifyResult<BatchSummary>> = if self.options().parallel_batches {
            self.in_pool(|| batches.par_iter().map(|batch| self.run(batch)).collect())
        } else {
            let mut outcomes = Vec::with_capacity(batches.len());
            for batch in batches {
                let outcome = self.run(batch);
                let failed = outcome.is_err();
                outcomes.push(outcome);
                if failed {
                    break;
                }
            }
            outcomes
        };

        let mut summaries = Vec::with_capacity(outcomes.len());
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(summary) => summaries.push(summary),
                Err(source) => {
                    warn!(batch = index, category = %source.category(), "chain rejected");
                    return Err(ChainError::Batch { index, source });
                }
            }
        }

        info!(batches = summaries.len(), "chain accepted");
        Ok(summaries)
    }
}
