//! Verifier Options
//!
//! Execution knobs that never change the verdict: they only decide where
//! independent work runs and how much gets logged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or validating verifier options
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("worker_threads must be greater than zero")]
    InvalidWorkerThreads,
    #[error("invalid options file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Options for batch verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierOptions {
    /// Evaluate the validator predicates of one chunk concurrently.
    /// They are pure, so the exactly-one reduction is unaffected.
    pub parallel_validators: bool,

    /// Verify the batches of a chain concurrently.
    /// Continuity between batches is still checked in order.
    pub parallel_batches: bool,

    /// Size of the thread pool used for parallel work.
    /// None uses the global rayon pool.
    pub worker_threads: Option<usize>,

    /// Emit a debug event for every processed chunk
    pub trace_chunks: bool,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self::sequential()
    }
}

impl VerifierOptions {
    /// Everything on the calling thread
    pub fn sequential() -> Self {
        Self {
            parallel_validators: false,
            parallel_batches: false,
            worker_threads: None,
            trace_chunks: false,
        }
    }

    /// Parallel validators and batches on the global pool
    pub fn parallel() -> Self {
        Self {
            parallel_validators: true,
            parallel_batches: true,
            worker_threads: None,
            trace_chunks: false,
        }
    }

    /// Parse options from TOML; missing keys take their default
    pub fn from_toml_str(s: &str) -> Result<Self, OptionsError> {
        let options: Self = toml::from_str(s)?;
        options.validate()?;
        Ok(options)
    }

    /// Validate options for internal consistency
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.worker_threads == Some(0) {
            return Err(OptionsError::InvalidWorkerThreads);
        }
        Ok(())
    }

    pub fn uses_parallelism(&self) -> bool {
        self.parallel_validators || self.parallel_batches
    }
}
