//! Fuzz target for delimited row parsing.

#![no_main]

use bigbio::source::io_tabular::{from_tabular_str, TabularOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let _ = from_tabular_str(input, b'\t', &TabularOptions::default());
});
