//! Fuzz target for `bigbio_kb` JSON Lines parsing followed by validation.
//!
//! Deserialized documents can carry arbitrary offsets, so this also
//! exercises the validator's bounds handling.

#![no_main]

use bigbio::schema::io_jsonl::from_kb_jsonl_str;
use bigbio::validation::{validate_documents, ValidateOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(documents) = from_kb_jsonl_str(input) {
        let _ = validate_documents(&documents, &ValidateOptions::default());
    }
});
