//! Criterion microbenches for bigbio parsing, projection and merging.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the performance of:
//! - BRAT `.ann` parsing (from_brat_str)
//! - PubTator parsing (from_pubtator_str)
//! - BRAT → bigbio_kb projection, which includes offset reconciliation
//! - Two-annotator merge (merge_documents)

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use bigbio::merge::merge_documents;
use bigbio::projection::{project_all, projector_for, ProjectionReport};
use bigbio::schema::{IdGenerator, KbDocument, Record, Schema};
use bigbio::source::io_brat::{from_brat_str, BratOptions};
use bigbio::source::io_pubtator::from_pubtator_str;
use bigbio::source::{SourceDocument, SourceFormat, SourceOptions};

// Include test fixtures at compile time (no file I/O during benchmark)
const BRAT_TEXT: &str = include_str!("../tests/fixtures/brat/pmid1.txt");
const BRAT_ANN: &str = include_str!("../tests/fixtures/brat/pmid1.ann");
const ANNOTATOR_A_TEXT: &str = include_str!("../tests/fixtures/annotator_a/pmid1.txt");
const ANNOTATOR_A_ANN: &str = include_str!("../tests/fixtures/annotator_a/pmid1.ann");
const ANNOTATOR_B_TEXT: &str = include_str!("../tests/fixtures/annotator_b/pmid1.txt");
const ANNOTATOR_B_ANN: &str = include_str!("../tests/fixtures/annotator_b/pmid1.ann");
const PUBTATOR_FIXTURE: &str = include_str!("../tests/fixtures/sample.pubtator");

/// Benchmark BRAT annotation parsing.
fn bench_brat_parse(c: &mut Criterion) {
    let opts = BratOptions::default();
    let mut group = c.benchmark_group("brat_parse");
    group.throughput(Throughput::Bytes(BRAT_ANN.len() as u64));

    group.bench_function("from_brat_str", |b| {
        b.iter(|| {
            let mut report = ProjectionReport::new("brat", "source");
            let doc = from_brat_str(
                "pmid1",
                black_box(BRAT_TEXT),
                black_box(BRAT_ANN),
                &opts,
                &mut report,
            );
            black_box(doc)
        })
    });

    group.finish();
}

/// Benchmark PubTator parsing.
fn bench_pubtator_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("pubtator_parse");
    group.throughput(Throughput::Bytes(PUBTATOR_FIXTURE.len() as u64));

    group.bench_function("from_pubtator_str", |b| {
        b.iter(|| {
            let mut report = ProjectionReport::new("pubtator", "source");
            let docs = from_pubtator_str(black_box(PUBTATOR_FIXTURE), &mut report).unwrap();
            black_box(docs)
        })
    });

    group.finish();
}

fn brat_kb(text: &str, ann: &str) -> KbDocument {
    let options = SourceOptions::default();
    let projector = projector_for(SourceFormat::Brat, Schema::Kb, &options).unwrap();
    let mut report = ProjectionReport::new("brat", "bigbio_kb");
    let doc = from_brat_str("pmid1", text, ann, &options.brat, &mut report);
    let records = project_all(
        projector.as_ref(),
        &[SourceDocument::Brat(doc)],
        &mut IdGenerator::new(),
        &mut report,
    )
    .unwrap();
    match records.into_iter().next() {
        Some(Record::Kb(doc)) => doc,
        _ => panic!("BRAT fixture did not project to a kb document"),
    }
}

/// Benchmark BRAT → bigbio_kb projection.
///
/// The fixture is parsed once outside the timed region.
fn bench_brat_kb_projection(c: &mut Criterion) {
    let options = SourceOptions::default();
    let projector = projector_for(SourceFormat::Brat, Schema::Kb, &options).unwrap();
    let mut report = ProjectionReport::new("brat", "source");
    let documents = vec![SourceDocument::Brat(from_brat_str(
        "pmid1",
        BRAT_TEXT,
        BRAT_ANN,
        &options.brat,
        &mut report,
    ))];

    let mut group = c.benchmark_group("kb_projection");
    group.throughput(Throughput::Elements(documents.len() as u64));

    group.bench_function("brat_to_kb", |b| {
        b.iter(|| {
            let mut report = ProjectionReport::new("brat", "bigbio_kb");
            let records = project_all(
                projector.as_ref(),
                black_box(&documents),
                &mut IdGenerator::new(),
                &mut report,
            )
            .unwrap();
            black_box(records)
        })
    });

    group.finish();
}

/// Benchmark merging two annotators' views of one document.
fn bench_merge(c: &mut Criterion) {
    let left = brat_kb(ANNOTATOR_A_TEXT, ANNOTATOR_A_ANN);
    let right = brat_kb(ANNOTATOR_B_TEXT, ANNOTATOR_B_ANN);

    let mut group = c.benchmark_group("merge");
    group.throughput(Throughput::Elements(
        (left.entities.len() + right.entities.len()) as u64,
    ));

    group.bench_function("merge_documents", |b| {
        b.iter(|| {
            let merged =
                merge_documents(black_box(&left), black_box(&right), &mut IdGenerator::new())
                    .unwrap();
            black_box(merged)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_brat_parse,
    bench_pubtator_parse,
    bench_brat_kb_projection,
    bench_merge
);
criterion_main!(benches);
