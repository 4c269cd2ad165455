//! Integration tests reading every fixture format through the public API.

use std::path::Path;

use bigbio::offsets::{PassageCursor, TokenOffsets};
use bigbio::projection::{project_all, projector_for, ProjectionIssueCode, ProjectionReport};
use bigbio::schema::{IdGenerator, KbDocument, Record, Schema, Span};
use bigbio::source::{read_source, SourceFormat, SourceOptions};
use bigbio::validation::{validate_documents, IssueCode, ValidateOptions};

fn load_kb(format: SourceFormat, path: &str) -> (Vec<KbDocument>, ProjectionReport) {
    let options = SourceOptions::default();
    let projector = projector_for(format, Schema::Kb, &options).expect("kb projector");
    let mut report = ProjectionReport::new(format.name(), Schema::Kb.name());
    let documents =
        read_source(format, Path::new(path), &options, &mut report).expect("read fixture");
    let records = project_all(projector.as_ref(), &documents, &mut IdGenerator::new(), &mut report)
        .expect("project fixture");
    let docs = records
        .into_iter()
        .map(|record| match record {
            Record::Kb(doc) => doc,
            other => panic!("expected kb record, got {:?}", other),
        })
        .collect();
    (docs, report)
}

fn assert_valid(docs: &[KbDocument]) {
    let report = validate_documents(docs, &ValidateOptions::default());
    assert!(report.is_clean(), "{}", report);
}

#[test]
fn brat_fixture() {
    let (docs, report) = load_kb(SourceFormat::Brat, "tests/fixtures/brat");
    assert_eq!(docs.len(), 2);
    assert_eq!(report.count(ProjectionIssueCode::UnknownLineKind), 1);
    assert_eq!(report.count(ProjectionIssueCode::TriggersAreNotEntities), 1);

    let pmid1 = &docs[0];
    assert_eq!(pmid1.document_id, "pmid1");
    assert_eq!(pmid1.entities.len(), 3);
    assert_eq!(pmid1.events.len(), 1);
    assert_eq!(pmid1.events[0].trigger.text, vec!["activates"]);
    assert_eq!(pmid1.relations.len(), 1);
    assert_eq!(pmid1.coreferences.len(), 1);
    assert_eq!(pmid1.entities[0].normalized[0].db_name, "NCBIGene");
    assert_valid(&docs);
}

#[test]
fn pubtator_fixture() {
    let (docs, report) = load_kb(SourceFormat::PubTator, "tests/fixtures/sample.pubtator");
    assert_eq!(report.warning_count(), 0, "{}", report);
    assert_eq!(docs.len(), 2);

    let first = &docs[0];
    assert_eq!(first.passages[0].offsets, vec![Span::new(0, 23)]);
    assert_eq!(first.passages[1].offsets, vec![Span::new(24, 38)]);
    assert_eq!(first.entities.len(), 2);
    assert_eq!(first.relations.len(), 1);
    assert_eq!(first.relations[0].kind, "CID");
    assert_valid(&docs);
}

#[test]
fn bioc_fixture() {
    let (docs, report) = load_kb(SourceFormat::Bioc, "tests/fixtures/sample.bioc.xml");
    assert_eq!(report.warning_count(), 0, "{}", report);
    assert_eq!(docs.len(), 1);

    let doc = &docs[0];
    assert_eq!(doc.document_id, "10021369");
    assert_eq!(doc.passages.len(), 2);
    assert_eq!(doc.entities[1].text, vec!["asthma"]);
    assert_eq!(doc.entities[1].normalized[0].db_id, "D001249");
    assert_eq!(doc.relations.len(), 1);
    assert_valid(&docs);
}

#[test]
fn conll_fixture() {
    let (docs, report) = load_kb(SourceFormat::Conll, "tests/fixtures/sample.conll");
    assert_eq!(report.warning_count(), 0, "{}", report);
    assert_eq!(docs.len(), 1);

    let doc = &docs[0];
    assert_eq!(doc.document_id, "sample");
    assert_eq!(doc.passages.len(), 2);
    let aspirin = &doc.entities[0];
    assert_eq!(aspirin.text, vec!["aspirin"]);
    assert_eq!(aspirin.offsets, vec![Span::new(18, 25)]);
    assert_eq!(doc.entities[1].text, vec!["Fever"]);
    assert_valid(&docs);
}

#[test]
fn token_indices_resolve_after_empty_title() {
    let mut cursor = PassageCursor::new();
    let title = cursor.push("");
    let sentence = "Patients received aspirin daily.";
    let passage = cursor.push(sentence);
    assert_eq!(title, Span::new(0, 0));

    let tokens = ["Patients", "received", "aspirin", "daily", "."];
    let table = TokenOffsets::align(sentence, &tokens);
    let local = table.span(2, 2).unwrap();
    let global = local.shifted(passage.start);
    assert_eq!(global, Span::new(19, 26));
}

#[test]
fn csv_rows_project_into_pairs() {
    let mut options = SourceOptions::default();
    options.tabular.id_column = Some("id".to_string());
    let projector = projector_for(SourceFormat::Csv, Schema::Pairs, &options).unwrap();
    let mut report = ProjectionReport::new("csv", "bigbio_pairs");
    let rows = read_source(
        SourceFormat::Csv,
        Path::new("tests/fixtures/pairs.csv"),
        &options,
        &mut report,
    )
    .unwrap();
    let records =
        project_all(projector.as_ref(), &rows, &mut IdGenerator::new(), &mut report).unwrap();

    assert_eq!(records.len(), 2);
    let json = serde_json::to_value(&records[1]).unwrap();
    assert_eq!(json["document_id"], "p2");
    assert_eq!(json["label"], "unrelated");
}

#[test]
fn invalid_kb_fixture_reports_every_problem() {
    let docs = bigbio::schema::io_jsonl::read_kb_jsonl(Path::new("tests/fixtures/kb_invalid.jsonl"))
        .unwrap();
    let report = validate_documents(&docs, &ValidateOptions::default());
    assert_eq!(report.count(IssueCode::DuplicateId), 1);
    assert_eq!(report.count(IssueCode::SpanOutOfBounds), 1);
    assert_eq!(report.count(IssueCode::MissingRelationArg), 1);
    assert_eq!(report.count(IssueCode::EntityTextMismatch), 1);
    assert_eq!(report.error_count(), 3);
}
