//! BRAT standoff reader.
//!
//! A BRAT corpus is a directory of `<doc>.txt` files, each with one or more
//! annotation files next to it (`<doc>.ann`, or the shared-task split into
//! `<doc>.a1` for given entities and `<doc>.a2` for the annotations to
//! predict). All annotation files of a document are concatenated.
//!
//! # Annotation lines
//!
//! | Prefix | Kind          | Layout                                     |
//! |--------|---------------|--------------------------------------------|
//! | `T`    | text-bound    | `T1\tType 0 5;8 12\ttext`                  |
//! | `E`    | event         | `E1\tType:T3 Theme:T1 Cause:E2`            |
//! | `R`    | relation      | `R1\tType Arg1:T1 Arg2:T2`                 |
//! | `*`    | equivalence   | `*\tEquiv T1 T2 T3`                        |
//! | `A`/`M`| attribute     | `A1\tNegation E1` or `A2\tLevel T1 High`   |
//! | `N`    | normalization | `N1\tReference T1 MESH:D001\ttext`         |
//! | `#`    | note          | `#1\tAnnotatorNotes T1\tfree text`         |
//!
//! Lines that do not match their layout are skipped with a warning; the
//! rest of the document is still read.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::BigbioError;
use crate::offsets::split_discontinuous_text;
use crate::projection::{ProjectionIssue, ProjectionIssueCode, ProjectionReport};
use crate::schema::Span;

const TEXT_EXTENSION: &str = "txt";

/// Placeholder stored for notes without text.
pub const NULL_NOTE_TEXT: &str = "<BB_NULL_STR>";

/// Reader options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BratOptions {
    /// Annotation file extensions read for every `.txt` file, in order.
    pub annotation_suffixes: Vec<String>,

    /// Whether `#` annotator-note lines are kept.
    pub parse_notes: bool,
}

impl Default for BratOptions {
    fn default() -> Self {
        Self {
            annotation_suffixes: vec!["a1".into(), "a2".into(), "ann".into()],
            parse_notes: false,
        }
    }
}

/// One BRAT document: the raw text and every annotation table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BratDocument {
    pub document_id: String,
    pub text: String,
    pub text_bound_annotations: Vec<BratTextBound>,
    pub events: Vec<BratEvent>,
    pub relations: Vec<BratRelation>,
    pub equivalences: Vec<BratEquivalence>,
    pub attributes: Vec<BratAttribute>,
    pub normalizations: Vec<BratNormalization>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<BratNote>,
}

impl BratDocument {
    /// Looks up a text-bound annotation by id.
    pub fn text_bound(&self, id: &str) -> Option<&BratTextBound> {
        self.text_bound_annotations.iter().find(|tb| tb.id == id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BratTextBound {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub offsets: Vec<Span>,
    /// One chunk per offset range.
    pub text: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BratArgument {
    pub role: String,
    pub ref_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BratEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Id of the text-bound trigger.
    pub trigger: String,
    pub arguments: Vec<BratArgument>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BratRelation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub head: BratArgument,
    pub tail: BratArgument,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BratEquivalence {
    pub id: String,
    pub ref_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BratAttribute {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ref_id: String,
    /// Empty for binary attributes.
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BratNormalization {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ref_id: String,
    pub resource_name: String,
    pub cuid: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BratNote {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ref_id: String,
    pub text: String,
}

/// Reads a BRAT corpus.
///
/// `path` may be a directory (every `.txt` file below it is a document,
/// ordered by relative path) or a single `.txt` file.
pub fn read_brat_dir(
    path: &Path,
    opts: &BratOptions,
    report: &mut ProjectionReport,
) -> Result<Vec<BratDocument>, BigbioError> {
    let text_files = collect_text_files(path)?;
    debug!(path = %path.display(), documents = text_files.len(), "reading BRAT corpus");

    text_files
        .iter()
        .map(|txt_path| read_brat_document(txt_path, opts, report))
        .collect()
}

/// Reads one `.txt` file and its annotation files.
pub fn read_brat_document(
    txt_path: &Path,
    opts: &BratOptions,
    report: &mut ProjectionReport,
) -> Result<BratDocument, BigbioError> {
    let document_id = txt_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .ok_or_else(|| BigbioError::BratLayoutInvalid {
            path: txt_path.to_path_buf(),
            message: "text file has no file name".to_string(),
        })?;

    let text = fs::read_to_string(txt_path).map_err(BigbioError::Io)?;

    let mut annotations = String::new();
    let mut found_any = false;
    for suffix in &opts.annotation_suffixes {
        let ann_path = txt_path.with_extension(suffix.trim_start_matches('.'));
        if !ann_path.is_file() {
            continue;
        }
        found_any = true;
        let content = fs::read_to_string(&ann_path).map_err(BigbioError::Io)?;
        annotations.push_str(&content);
        if !content.ends_with('\n') {
            annotations.push('\n');
        }
    }

    if !found_any {
        report.add(
            ProjectionIssue::info(
                ProjectionIssueCode::MissingAnnotationFile,
                format!(
                    "no annotation file ({}) next to {}",
                    opts.annotation_suffixes.join(", "),
                    txt_path.display()
                ),
            )
            .in_document(&document_id),
        );
    }

    Ok(from_brat_str(&document_id, &text, &annotations, opts, report))
}

/// Builds a document from in-memory text and annotation content.
///
/// Useful for testing and fuzzing without file I/O.
pub fn from_brat_str(
    document_id: &str,
    text: &str,
    annotations: &str,
    opts: &BratOptions,
    report: &mut ProjectionReport,
) -> BratDocument {
    let mut document = BratDocument {
        document_id: document_id.to_string(),
        text: text.to_string(),
        ..Default::default()
    };

    for (line_idx, line) in annotations.lines().enumerate() {
        let line_num = line_idx + 1;
        match parse_ann_line(line, opts) {
            Ok(Some(parsed)) => parsed.push_into(&mut document),
            Ok(None) => {}
            Err(err) => {
                warn!(
                    document = document_id,
                    line = line_num,
                    "skipping BRAT annotation line: {}",
                    err.message
                );
                report.add(
                    ProjectionIssue::warning(
                        err.code,
                        format!("line {}: {} ({:?})", line_num, err.message, line.trim()),
                    )
                    .in_document(document_id),
                );
            }
        }
    }

    document
}

/// Fuzz-only entrypoint for single annotation line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_ann_line(line: &str) {
    let opts = BratOptions {
        parse_notes: true,
        ..Default::default()
    };
    let _ = parse_ann_line(line, &opts);
}

#[derive(Debug)]
enum AnnLine {
    TextBound(BratTextBound),
    Event(BratEvent),
    Relation(BratRelation),
    Equivalence(BratEquivalence),
    Attribute(BratAttribute),
    Normalization(BratNormalization),
    Note(BratNote),
}

impl AnnLine {
    fn push_into(self, document: &mut BratDocument) {
        match self {
            AnnLine::TextBound(tb) => document.text_bound_annotations.push(tb),
            AnnLine::Event(event) => document.events.push(event),
            AnnLine::Relation(relation) => document.relations.push(relation),
            AnnLine::Equivalence(equiv) => document.equivalences.push(equiv),
            AnnLine::Attribute(attr) => document.attributes.push(attr),
            AnnLine::Normalization(norm) => document.normalizations.push(norm),
            AnnLine::Note(note) => document.notes.push(note),
        }
    }
}

#[derive(Debug)]
struct LineError {
    code: ProjectionIssueCode,
    message: String,
}

impl LineError {
    fn malformed(message: impl Into<String>) -> Self {
        Self {
            code: ProjectionIssueCode::MalformedLine,
            message: message.into(),
        }
    }
}

fn parse_ann_line(line: &str, opts: &BratOptions) -> Result<Option<AnnLine>, LineError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = line.splitn(3, '\t').collect();
    if fields.len() < 2 {
        return Err(LineError::malformed("expected tab-separated id and body"));
    }
    let id = fields[0].trim().to_string();
    let body: Vec<&str> = fields[1].split_whitespace().collect();
    let text = fields.get(2).copied();

    let parsed = match line.chars().next() {
        Some('T') => AnnLine::TextBound(parse_text_bound(id, fields[1], text)?),
        Some('E') => AnnLine::Event(parse_event(id, &body)?),
        Some('R') => AnnLine::Relation(parse_relation(id, &body)?),
        Some('*') => AnnLine::Equivalence(parse_equivalence(id, &body)?),
        Some('A') | Some('M') => AnnLine::Attribute(parse_attribute(id, &body)?),
        Some('N') => AnnLine::Normalization(parse_normalization(id, &body, text)?),
        Some('#') if opts.parse_notes => AnnLine::Note(parse_note(id, &body, text)?),
        Some('#') => return Ok(None),
        _ => {
            return Err(LineError {
                code: ProjectionIssueCode::UnknownLineKind,
                message: format!("unknown annotation kind in id '{}'", id),
            })
        }
    };

    Ok(Some(parsed))
}

fn parse_text_bound(
    id: String,
    type_and_spans: &str,
    text: Option<&str>,
) -> Result<BratTextBound, LineError> {
    let type_and_spans = type_and_spans.trim();
    let (kind, span_str) = type_and_spans
        .split_once(char::is_whitespace)
        .ok_or_else(|| LineError::malformed("text-bound annotation without offsets"))?;

    let mut offsets = Vec::new();
    for fragment in span_str.split(';') {
        let numbers: Vec<&str> = fragment.split_whitespace().collect();
        let [start, end] = numbers.as_slice() else {
            return Err(LineError::malformed(format!(
                "offset fragment '{}' is not 'start end'",
                fragment.trim()
            )));
        };
        let start = parse_offset(start)?;
        let end = parse_offset(end)?;
        if start > end {
            return Err(LineError::malformed(format!(
                "offset start {} is after end {}",
                start, end
            )));
        }
        offsets.push(Span::new(start, end));
    }

    let text = text.ok_or_else(|| LineError::malformed("text-bound annotation without text"))?;

    Ok(BratTextBound {
        id,
        kind: kind.to_string(),
        text: split_discontinuous_text(text, &offsets),
        offsets,
    })
}

fn parse_offset(raw: &str) -> Result<usize, LineError> {
    raw.parse::<usize>()
        .map_err(|_| LineError::malformed(format!("invalid offset '{}'", raw)))
}

fn parse_role_ref(raw: &str) -> Result<BratArgument, LineError> {
    match raw.split_once(':') {
        Some((role, ref_id)) if !role.is_empty() && !ref_id.is_empty() => Ok(BratArgument {
            role: role.to_string(),
            ref_id: ref_id.to_string(),
        }),
        _ => Err(LineError::malformed(format!(
            "argument '{}' is not 'Role:Ref'",
            raw
        ))),
    }
}

fn parse_event(id: String, body: &[&str]) -> Result<BratEvent, LineError> {
    let (head, args) = body
        .split_first()
        .ok_or_else(|| LineError::malformed("event without type"))?;
    let type_trigger = parse_role_ref(head)?;
    let arguments = args
        .iter()
        .map(|arg| parse_role_ref(arg))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BratEvent {
        id,
        kind: type_trigger.role,
        trigger: type_trigger.ref_id,
        arguments,
    })
}

fn parse_relation(id: String, body: &[&str]) -> Result<BratRelation, LineError> {
    let [kind, head, tail, ..] = body else {
        return Err(LineError::malformed("relation needs a type and two arguments"));
    };

    Ok(BratRelation {
        id,
        kind: kind.to_string(),
        head: parse_role_ref(head)?,
        tail: parse_role_ref(tail)?,
    })
}

fn parse_equivalence(id: String, body: &[&str]) -> Result<BratEquivalence, LineError> {
    if body.len() < 2 {
        return Err(LineError::malformed("equivalence without members"));
    }

    Ok(BratEquivalence {
        id,
        ref_ids: body[1..].iter().map(|r| r.to_string()).collect(),
    })
}

fn parse_attribute(id: String, body: &[&str]) -> Result<BratAttribute, LineError> {
    let [kind, ref_id, rest @ ..] = body else {
        return Err(LineError::malformed("attribute needs a type and a target"));
    };

    Ok(BratAttribute {
        id,
        kind: kind.to_string(),
        ref_id: ref_id.to_string(),
        value: rest.first().map(|v| v.to_string()).unwrap_or_default(),
    })
}

fn parse_normalization(
    id: String,
    body: &[&str],
    text: Option<&str>,
) -> Result<BratNormalization, LineError> {
    let [kind, ref_id, db_ref, ..] = body else {
        return Err(LineError::malformed(
            "normalization needs a type, a target and a Db:Id reference",
        ));
    };
    let reference = parse_role_ref(db_ref)?;

    Ok(BratNormalization {
        id,
        kind: kind.to_string(),
        ref_id: ref_id.to_string(),
        resource_name: reference.role,
        cuid: reference.ref_id,
        text: text.unwrap_or_default().to_string(),
    })
}

fn parse_note(id: String, body: &[&str], text: Option<&str>) -> Result<BratNote, LineError> {
    let [kind, ref_id, ..] = body else {
        return Err(LineError::malformed("note needs a type and a target"));
    };

    Ok(BratNote {
        id,
        kind: kind.to_string(),
        ref_id: ref_id.to_string(),
        text: text.unwrap_or(NULL_NOTE_TEXT).to_string(),
    })
}

fn collect_text_files(path: &Path) -> Result<Vec<PathBuf>, BigbioError> {
    if path.is_file() {
        if has_text_extension(path) {
            return Ok(vec![path.to_path_buf()]);
        }
        return Err(BigbioError::BratLayoutInvalid {
            path: path.to_path_buf(),
            message: "expected a directory or a .txt file".to_string(),
        });
    }

    if !path.is_dir() {
        return Err(BigbioError::BratLayoutInvalid {
            path: path.to_path_buf(),
            message: "path does not exist".to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true) {
        let entry = entry.map_err(|source| BigbioError::BratLayoutInvalid {
            path: path.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;
        if entry.file_type().is_file() && has_text_extension(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_by_cached_key(|file| rel_string(path, file));
    Ok(files)
}

fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(TEXT_EXTENSION))
        .unwrap_or(false)
}

fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
