//! Fuzz target for BRAT documents projected into `bigbio_kb`.
//!
//! The input is split at the first NUL byte into document text and `.ann`
//! content. Offsets in the annotations rarely match the text, which is
//! exactly what the offset reconciliation has to survive.

#![no_main]

use bigbio::projection::{projector_for, ProjectionReport, Projector};
use bigbio::schema::{IdGenerator, Schema};
use bigbio::source::io_brat::from_brat_str;
use bigbio::source::{SourceDocument, SourceFormat, SourceOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (text, annotations) = input.split_once('\0').unwrap_or((input, ""));

    let options = SourceOptions::default();
    let Ok(projector) = projector_for(SourceFormat::Brat, Schema::Kb, &options) else {
        return;
    };
    let mut report = ProjectionReport::new("brat", "bigbio_kb");
    let document = from_brat_str("fuzz", text, annotations, &options.brat, &mut report);
    let _ = projector.project(
        &SourceDocument::Brat(document),
        &mut IdGenerator::new(),
        &mut report,
    );
});
