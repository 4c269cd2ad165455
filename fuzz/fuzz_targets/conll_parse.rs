//! Fuzz target for CoNLL/IOB parsing.

#![no_main]

use bigbio::source::io_conll::{from_conll_slice, ConllOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_conll_slice(data, &ConllOptions::default());
});
