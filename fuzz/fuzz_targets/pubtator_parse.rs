//! Fuzz target for PubTator parsing.

#![no_main]

use bigbio::projection::ProjectionReport;
use bigbio::source::io_pubtator::from_pubtator_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let mut report = ProjectionReport::new("pubtator", "source");
    let _ = from_pubtator_slice(data, &mut report);
});
