//! Fuzz target for batch deserialization
//!
//! This target ensures:
//! 1. Parsing a batch from arbitrary JSON never panics
//! 2. Verifying whatever parses never panics
//! 3. Verification is deterministic

#![no_main]

use libfuzzer_sys::fuzz_target;
use rollup_batch::{BatchVerifier, SerializableBatch};

fuzz_target!(|data: &[u8]| {
    // Limit input size to avoid OOM
    if data.len() > 64 * 1024 {
        return;
    }
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(parsed) = SerializableBatch::from_json(json) {
        let batch = parsed.into_batch();
        let verifier = BatchVerifier::new();
        let first = verifier.verify(&batch);
        let second = verifier.verify(&batch);

        assert_eq!(first.valid, second.valid);
        assert_eq!(first.category, second.category);
        assert_eq!(first.failed_operation, second.failed_operation);
    }
});
