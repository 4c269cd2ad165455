//! Fuzz target for BioC XML parsing.
//!
//! Feeds arbitrary byte sequences to the BioC reader, checking for panics,
//! crashes, or hangs.

#![no_main]

use bigbio::projection::ProjectionReport;
use bigbio::source::io_bioc_xml::{from_bioc_xml_slice, BiocOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let mut report = ProjectionReport::new("bioc", "source");
    let _ = from_bioc_xml_slice(data, &BiocOptions::default(), &mut report);
});
