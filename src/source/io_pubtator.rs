//! PubTator reader.
//!
//! A PubTator file is a sequence of blank-line separated blocks:
//!
//! ```text
//! 6794356|t|Tricuspid valve regurgitation and lithium carbonate toxicity.
//! 6794356|a|Lithium carbonate was given ...
//! 6794356	0	29	Tricuspid valve regurgitation	Disease	D014262
//! 6794356	34	51	lithium carbonate	Chemical	D016651
//! 6794356	CID	D016651	D014262
//! ```
//!
//! Mention offsets are character offsets into `title + " " + abstract`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::BigbioError;
use crate::projection::{ProjectionIssue, ProjectionIssueCode, ProjectionReport};
use crate::schema::Span;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubTatorOptions {
    /// Database assumed for ids without a `db:` prefix.
    pub default_db_name: Option<String>,
}

impl Default for PubTatorOptions {
    fn default() -> Self {
        Self {
            default_db_name: Some("MESH".to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PubTatorDocument {
    pub pmid: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub mentions: Vec<PubTatorMention>,
    pub relations: Vec<PubTatorRelation>,
}

impl PubTatorDocument {
    /// The text mention offsets index into.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PubTatorMention {
    pub offsets: Span,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Raw concept id column (`D016651`, `MESH:D001|D002`, `-1`...).
    pub concept_ids: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PubTatorRelation {
    #[serde(rename = "type")]
    pub kind: String,
    pub concept_1: String,
    pub concept_2: String,
}

/// Reads a PubTator file.
pub fn read_pubtator_file(
    path: &Path,
    report: &mut ProjectionReport,
) -> Result<Vec<PubTatorDocument>, BigbioError> {
    let content = fs::read_to_string(path).map_err(BigbioError::Io)?;
    let documents = parse_pubtator_str(&content, path, report)?;
    debug!(path = %path.display(), documents = documents.len(), "read PubTator file");
    Ok(documents)
}

/// Parses PubTator content from a string.
///
/// Useful for testing and fuzzing without file I/O.
pub fn from_pubtator_str(
    input: &str,
    report: &mut ProjectionReport,
) -> Result<Vec<PubTatorDocument>, BigbioError> {
    parse_pubtator_str(input, Path::new("<memory>"), report)
}

/// Parses PubTator content from bytes.
///
/// The input must be valid UTF-8.
pub fn from_pubtator_slice(
    bytes: &[u8],
    report: &mut ProjectionReport,
) -> Result<Vec<PubTatorDocument>, BigbioError> {
    let input = std::str::from_utf8(bytes).map_err(|source| BigbioError::PubTatorParse {
        path: PathBuf::from("<memory>"),
        line: 0,
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    from_pubtator_str(input, report)
}

fn parse_pubtator_str(
    input: &str,
    path: &Path,
    report: &mut ProjectionReport,
) -> Result<Vec<PubTatorDocument>, BigbioError> {
    let mut documents = Vec::new();
    let mut current: Option<PubTatorDocument> = None;

    for (line_idx, raw_line) in input.lines().enumerate() {
        let line_num = line_idx + 1;
        let line = raw_line.trim_end_matches('\r');

        if line.trim().is_empty() {
            documents.extend(current.take());
            continue;
        }

        if let Some((pmid, section, text)) = parse_text_line(line) {
            let document = current.get_or_insert_with(|| PubTatorDocument {
                pmid: pmid.to_string(),
                ..Default::default()
            });
            if document.pmid != pmid {
                return Err(BigbioError::PubTatorParse {
                    path: path.to_path_buf(),
                    line: line_num,
                    message: format!(
                        "'{}|{}|' line inside the block of {}; blocks must be separated by a blank line",
                        pmid, section, document.pmid
                    ),
                });
            }
            match section {
                "t" => document.title = text.to_string(),
                _ => document.abstract_text = text.to_string(),
            }
            continue;
        }

        let Some(document) = current.as_mut() else {
            return Err(BigbioError::PubTatorParse {
                path: path.to_path_buf(),
                line: line_num,
                message: "annotation row before any 'PMID|t|title' line".to_string(),
            });
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields[0] != document.pmid {
            skip_row(
                report,
                &document.pmid,
                line_num,
                ProjectionIssueCode::DocumentIdMismatch,
                format!("row belongs to '{}'", fields[0]),
            );
            continue;
        }

        match parse_row(&fields) {
            Ok(Row::Mention(mention)) => document.mentions.push(mention),
            Ok(Row::Relation(relation)) => document.relations.push(relation),
            Err(message) => skip_row(
                report,
                &document.pmid,
                line_num,
                ProjectionIssueCode::MalformedLine,
                message,
            ),
        }
    }

    documents.extend(current);
    Ok(documents)
}

enum Row {
    Mention(PubTatorMention),
    Relation(PubTatorRelation),
}

/// `PMID|t|text` or `PMID|a|text`.
fn parse_text_line(line: &str) -> Option<(&str, &str, &str)> {
    let mut parts = line.splitn(3, '|');
    let pmid = parts.next()?;
    let section = parts.next()?;
    let text = parts.next()?;
    if pmid.contains('\t') || !matches!(section, "t" | "a") {
        return None;
    }
    Some((pmid, section, text))
}

fn parse_row(fields: &[&str]) -> Result<Row, String> {
    match fields.len() {
        4 if fields[1].parse::<usize>().is_err() => Ok(Row::Relation(PubTatorRelation {
            kind: fields[1].to_string(),
            concept_1: fields[2].to_string(),
            concept_2: fields[3].to_string(),
        })),
        n if n >= 5 => {
            let start = parse_offset(fields[1])?;
            let end = parse_offset(fields[2])?;
            if start > end {
                return Err(format!("mention start {} is after end {}", start, end));
            }
            Ok(Row::Mention(PubTatorMention {
                offsets: Span::new(start, end),
                text: fields[3].to_string(),
                kind: fields[4].to_string(),
                concept_ids: fields.get(5).copied().unwrap_or_default().to_string(),
            }))
        }
        n => Err(format!("expected 4 (relation) or 5+ (mention) fields, got {}", n)),
    }
}

fn parse_offset(raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid offset '{}'", raw))
}

fn skip_row(
    report: &mut ProjectionReport,
    pmid: &str,
    line_num: usize,
    code: ProjectionIssueCode,
    message: String,
) {
    warn!(document = pmid, line = line_num, "skipping PubTator row: {}", message);
    report.add(
        ProjectionIssue::warning(code, format!("line {}: {}", line_num, message))
            .in_document(pmid),
    );
}
