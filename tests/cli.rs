use assert_cmd::Command;
use predicates::prelude::*;

fn bigbio() -> Command {
    let mut cmd = Command::cargo_bin("bigbio").unwrap();
    cmd.env_remove("BIGBIO_DATA_DIR");
    cmd
}

#[test]
fn runs() {
    bigbio().assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = bigbio();
    cmd.arg("-V");
    cmd.assert()
        .success()
        .stdout(format!("bigbio {}\n", env!("CARGO_PKG_VERSION")));
}

// Convert subcommand tests

#[test]
fn convert_brat_to_kb_reports_skipped_lines() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("out.jsonl");

    let mut cmd = bigbio();
    cmd.args(["convert", "tests/fixtures/brat", "--from", "brat", "--output"])
        .arg(&output);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("Wrote 2 bigbio_kb record(s)"))
        .stderr(predicates::str::contains("brat -> bigbio_kb"))
        .stderr(predicates::str::contains("UnknownLineKind"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written.lines().count(), 2);
    assert!(written.contains("\"document_id\":\"pmid1\""));
    assert!(written.contains("\"db_name\":\"NCBIGene\""));
}

#[test]
fn convert_strict_fails_on_dropped_lines() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("out.jsonl");

    let mut cmd = bigbio();
    cmd.args([
        "convert",
        "tests/fixtures/brat",
        "--from",
        "brat",
        "--strict",
        "--output",
    ])
    .arg(&output);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("strict mode"));
    assert!(!output.exists());
}

#[test]
fn convert_json_report() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("out.jsonl");

    let mut cmd = bigbio();
    cmd.args([
        "convert",
        "tests/fixtures/sample.pubtator",
        "--from",
        "pubtator",
        "--report",
        "json",
        "--output",
    ])
    .arg(&output);
    cmd.assert()
        .success()
        .stderr(predicates::str::contains("\"schema\": \"bigbio_kb\""))
        .stderr(predicates::str::contains("\"entities\": 3"));
}

#[test]
fn convert_csv_pairs_with_options() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("pairs.jsonl");

    let mut cmd = bigbio();
    cmd.args([
        "convert",
        "tests/fixtures/pairs.csv",
        "--from",
        "csv",
        "--schema",
        "bigbio_pairs",
        "--options",
        "tests/fixtures/pairs_options.yaml",
        "--output",
    ])
    .arg(&output);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("Wrote 2 bigbio_pairs record(s)"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("\"document_id\":\"p1\""));
    assert!(written.contains("\"label\":\"unrelated\""));
}

#[test]
fn convert_unknown_schema_names_it() {
    let mut cmd = bigbio();
    cmd.args([
        "convert",
        "tests/fixtures/brat",
        "--from",
        "brat",
        "--schema",
        "bigbio_graph",
        "--output",
        "unused.jsonl",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("Unknown schema: 'bigbio_graph'"));
}

#[test]
fn convert_unsupported_schema_names_both() {
    let mut cmd = bigbio();
    cmd.args([
        "convert",
        "tests/fixtures/sample.conll",
        "--from",
        "conll",
        "--schema",
        "bigbio_qa",
        "--output",
        "unused.jsonl",
    ]);
    cmd.assert().failure().stderr(predicates::str::contains(
        "Schema 'bigbio_qa' is not available for format 'conll'",
    ));
}

#[test]
fn convert_unknown_format_fails() {
    let mut cmd = bigbio();
    cmd.args([
        "convert",
        "tests/fixtures/brat",
        "--from",
        "not-a-format",
        "--output",
        "unused.jsonl",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("Unknown format: 'not-a-format'"));
}

// Load subcommand tests

#[test]
fn load_requires_data_dir_for_local_corpus() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = bigbio();
    cmd.args(["load", "--config", "tests/fixtures/corpus.yaml", "--output-dir"])
        .arg(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("local-only"));
}

#[test]
fn load_writes_one_file_per_split() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = bigbio();
    cmd.args([
        "load",
        "--config",
        "tests/fixtures/corpus.yaml",
        "--data-dir",
        "tests/fixtures",
        "--output-dir",
    ])
    .arg(temp.path());
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("train: wrote 2 record(s)"));

    let written = std::fs::read_to_string(temp.path().join("train.jsonl")).unwrap();
    assert!(written.contains("\"Positive_regulation\""));
}

#[test]
fn load_reads_data_dir_from_environment() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = bigbio();
    cmd.env("BIGBIO_DATA_DIR", "tests/fixtures");
    cmd.args([
        "load",
        "--config",
        "tests/fixtures/corpus.yaml",
        "--schema",
        "source",
        "--split",
        "train",
        "--output-dir",
    ])
    .arg(temp.path());
    cmd.assert().success();
    assert!(temp.path().join("train.jsonl").is_file());
}

#[test]
fn load_unknown_split_fails() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = bigbio();
    cmd.args([
        "load",
        "--config",
        "tests/fixtures/corpus.yaml",
        "--data-dir",
        "tests/fixtures",
        "--split",
        "test",
        "--output-dir",
    ])
    .arg(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("no split named 'test'"));
}

// Validate subcommand tests

#[test]
fn validate_valid_file_succeeds() {
    let mut cmd = bigbio();
    cmd.args(["validate", "tests/fixtures/kb_valid.jsonl"]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("Validation passed"));
}

#[test]
fn validate_invalid_file_fails() {
    let mut cmd = bigbio();
    cmd.args(["validate", "tests/fixtures/kb_invalid.jsonl"]);
    cmd.assert()
        .failure()
        .stdout(predicates::str::contains("DuplicateId"))
        .stdout(predicates::str::contains("SpanOutOfBounds"))
        .stdout(predicates::str::contains("MissingRelationArg"))
        .stdout(predicates::str::contains("EntityTextMismatch"));
}

#[test]
fn validate_json_output_format() {
    let mut cmd = bigbio();
    cmd.args([
        "validate",
        "tests/fixtures/kb_valid.jsonl",
        "--output",
        "json",
    ]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("\"error_count\": 0"))
        .stdout(predicates::str::contains("\"documents\": 2"));
}

#[test]
fn validate_nonexistent_file_fails() {
    let mut cmd = bigbio();
    cmd.args(["validate", "nonexistent_file.jsonl"]);
    cmd.assert().failure();
}

// Merge subcommand tests

#[test]
fn merge_keeps_agreed_annotations() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("merged.jsonl");

    let mut cmd = bigbio();
    cmd.args([
        "merge",
        "tests/fixtures/annotator_a",
        "tests/fixtures/annotator_b",
        "--output",
    ])
    .arg(&output);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("Merged 1 document(s)"));

    let merged = bigbio::schema::io_jsonl::read_kb_jsonl(&output).unwrap();
    assert_eq!(merged.len(), 1);
    let texts: Vec<&str> = merged[0]
        .entities
        .iter()
        .map(|e| e.text[0].as_str())
        .collect();
    assert_eq!(texts, vec!["IL-2", "NF-kB"]);
    assert_eq!(merged[0].relations.len(), 1);
}

#[test]
fn merged_output_validates() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("merged.jsonl");

    bigbio()
        .args([
            "merge",
            "tests/fixtures/annotator_a",
            "tests/fixtures/annotator_b",
            "--output",
        ])
        .arg(&output)
        .assert()
        .success();

    bigbio()
        .arg("validate")
        .arg(&output)
        .arg("--strict")
        .assert()
        .success()
        .stdout(predicates::str::contains("Validation passed").and(
            predicates::str::contains("1 document(s)"),
        ));
}
