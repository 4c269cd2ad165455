//! CoNLL / IOB token-per-line reader.
//!
//! ```text
//! -DOCSTART- -X- O O
//!
//! # text = Patients received aspirin daily.
//! Patients   O
//! received   O
//! aspirin    B-Chemical
//! daily      O
//! .          O
//! ```
//!
//! Columns are tab separated when the line contains a tab, whitespace
//! separated otherwise. A line with a single column is a token tagged `O`.
//! `-DOCSTART-` lines and `# newdoc id = ...` comments start a new document;
//! `# text = ...` gives the raw sentence text used to recover offsets. A `#`
//! line opening a sentence is a comment unless its tag column holds a tag.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BigbioError;

const DOCSTART: &str = "-DOCSTART-";
const OUTSIDE: &str = "O";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConllOptions {
    /// Column holding the token text.
    pub token_column: usize,

    /// Column holding the tag; the last column when unset.
    pub tag_column: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConllDocument {
    pub document_id: String,
    pub sentences: Vec<ConllSentence>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConllSentence {
    /// Raw sentence text from a `# text =` comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub tokens: Vec<String>,
    pub tags: Vec<String>,
}

impl ConllSentence {
    /// Decodes the tag column into entity spans.
    pub fn tag_spans(&self) -> Vec<TagSpan> {
        decode_tags(&self.tags)
    }
}

/// An entity decoded from tags: type plus inclusive token range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagSpan {
    pub kind: String,
    pub first: usize,
    pub last: usize,
}

/// Reads a CoNLL file. Documents without an explicit id are named after the
/// file stem.
pub fn read_conll_file(
    path: &Path,
    opts: &ConllOptions,
) -> Result<Vec<ConllDocument>, BigbioError> {
    let content = fs::read_to_string(path).map_err(BigbioError::Io)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let documents = parse_conll_str(&content, &stem, path, opts)?;
    debug!(path = %path.display(), documents = documents.len(), "read CoNLL file");
    Ok(documents)
}

/// Parses CoNLL content from a string.
///
/// Useful for testing and fuzzing without file I/O.
pub fn from_conll_str(
    input: &str,
    document_prefix: &str,
    opts: &ConllOptions,
) -> Result<Vec<ConllDocument>, BigbioError> {
    parse_conll_str(input, document_prefix, Path::new("<memory>"), opts)
}

/// Parses CoNLL content from bytes.
///
/// The input must be valid UTF-8.
pub fn from_conll_slice(
    bytes: &[u8],
    opts: &ConllOptions,
) -> Result<Vec<ConllDocument>, BigbioError> {
    let input = std::str::from_utf8(bytes).map_err(|source| BigbioError::ConllParse {
        path: PathBuf::from("<memory>"),
        line: 0,
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    from_conll_str(input, "document", opts)
}

struct DocumentBuilder<'a> {
    prefix: &'a str,
    documents: Vec<ConllDocument>,
    current: ConllDocument,
    sentence: ConllSentence,
    explicit_id: bool,
}

impl<'a> DocumentBuilder<'a> {
    fn new(prefix: &'a str) -> Self {
        Self {
            prefix,
            documents: Vec::new(),
            current: ConllDocument::default(),
            sentence: ConllSentence::default(),
            explicit_id: false,
        }
    }

    fn end_sentence(&mut self) {
        if self.sentence.tokens.is_empty() {
            // A lone `# text =` with no tokens is dropped.
            self.sentence.text = None;
            return;
        }
        self.current
            .sentences
            .push(std::mem::take(&mut self.sentence));
    }

    fn start_document(&mut self, id: Option<String>) {
        self.end_sentence();
        if !self.current.sentences.is_empty() || self.explicit_id {
            self.finish_current();
        }
        self.explicit_id = id.is_some();
        self.current.document_id = id.unwrap_or_default();
    }

    fn finish_current(&mut self) {
        let mut document = std::mem::take(&mut self.current);
        if document.document_id.is_empty() {
            document.document_id = format!("{}_{}", self.prefix, self.documents.len());
        }
        self.documents.push(document);
    }

    fn finish(mut self) -> Vec<ConllDocument> {
        self.end_sentence();
        if !self.current.sentences.is_empty() || self.explicit_id {
            self.finish_current();
        }
        // A file without document markers is one document named after it.
        let unnamed = format!("{}_0", self.prefix);
        if self.documents.len() == 1 && self.documents[0].document_id == unnamed {
            self.documents[0].document_id = self.prefix.to_string();
        }
        self.documents
    }
}

fn parse_conll_str(
    input: &str,
    prefix: &str,
    path: &Path,
    opts: &ConllOptions,
) -> Result<Vec<ConllDocument>, BigbioError> {
    let mut builder = DocumentBuilder::new(prefix);

    for (line_idx, raw_line) in input.lines().enumerate() {
        let line_num = line_idx + 1;
        let line = raw_line.trim();

        if line.is_empty() {
            builder.end_sentence();
            continue;
        }

        if line.starts_with(DOCSTART) {
            builder.start_document(None);
            continue;
        }

        let columns: Vec<&str> = if raw_line.contains('\t') {
            raw_line.trim_end_matches(['\r', '\n']).split('\t').collect()
        } else {
            line.split_whitespace().collect()
        };

        if line.starts_with('#')
            && builder.sentence.tokens.is_empty()
            && !is_token_line(line, &columns, opts)
        {
            let comment = line.trim_start_matches('#').trim();
            if let Some(id) = comment_value(comment, "newdoc id") {
                builder.start_document(Some(id.to_string()));
            } else if let Some(text) = comment_value(comment, "text") {
                builder.sentence.text = Some(text.to_string());
            }
            continue;
        }

        let token = columns
            .get(opts.token_column)
            .ok_or_else(|| BigbioError::ConllParse {
                path: path.to_path_buf(),
                line: line_num,
                message: format!(
                    "line has {} column(s); token column is {}",
                    columns.len(),
                    opts.token_column
                ),
            })?;

        let tag = match opts.tag_column {
            Some(idx) => columns
                .get(idx)
                .copied()
                .ok_or_else(|| BigbioError::ConllParse {
                    path: path.to_path_buf(),
                    line: line_num,
                    message: format!("line has {} column(s); tag column is {}", columns.len(), idx),
                })?,
            None if columns.len() > 1 => columns[columns.len() - 1],
            None => OUTSIDE,
        };

        builder.sentence.tokens.push(token.trim().to_string());
        builder.sentence.tags.push(tag.trim().to_string());
    }

    Ok(builder.finish())
}

/// Whether a `#` line opening a sentence is a token (`#\tO`) rather than a
/// comment: not a `key = value` pair, and its tag column holds a tag.
fn is_token_line(line: &str, columns: &[&str], opts: &ConllOptions) -> bool {
    if columns.len() < 2 || line.trim_start_matches('#').contains('=') {
        return false;
    }
    let tag = match opts.tag_column {
        Some(idx) => columns.get(idx),
        None => columns.last(),
    };
    tag.is_some_and(|tag| is_tag(tag.trim()))
}

fn is_tag(tag: &str) -> bool {
    if tag == OUTSIDE || is_bare_prefix(tag) {
        return true;
    }
    tag.split_once(['-', '_'])
        .is_some_and(|(prefix, kind)| is_bare_prefix(prefix) && !kind.is_empty())
}

fn is_bare_prefix(tag: &str) -> bool {
    matches!(tag, "B" | "I" | "E" | "S" | "L" | "U")
}

fn comment_value<'a>(comment: &'a str, key: &str) -> Option<&'a str> {
    let (k, v) = comment.split_once('=')?;
    (k.trim() == key).then(|| v.trim())
}

/// Splits a tag into prefix and entity type (`B-Chemical` → `("B", "Chemical")`).
/// Untyped tags return an empty type; unprefixed tags are treated as inside
/// tags.
pub fn parse_tag(tag: &str) -> (&str, &str) {
    if tag == OUTSIDE || tag.is_empty() {
        return (OUTSIDE, "");
    }
    if is_bare_prefix(tag) {
        return (tag, "");
    }
    match tag.split_once(['-', '_']) {
        Some((prefix, kind)) if is_bare_prefix(prefix) => (prefix, kind),
        _ => ("I", tag),
    }
}

/// Decodes a tag sequence into entity spans.
///
/// Accepts IOB2, IOB1 (an `I-` of a new type opens an entity) and
/// BIOES/BILOU (`E-`/`L-` close, `S-`/`U-` are single-token entities).
pub fn decode_tags<S: AsRef<str>>(tags: &[S]) -> Vec<TagSpan> {
    let mut spans = Vec::new();
    let mut open: Option<TagSpan> = None;

    for (idx, tag) in tags.iter().enumerate() {
        let (prefix, kind) = parse_tag(tag.as_ref());
        match prefix {
            OUTSIDE => spans.extend(open.take()),
            "B" => {
                spans.extend(open.take());
                open = Some(TagSpan::single(kind, idx));
            }
            "S" | "U" => {
                spans.extend(open.take());
                spans.push(TagSpan::single(kind, idx));
            }
            "E" | "L" => match open.take() {
                Some(mut span) if span.kind == kind => {
                    span.last = idx;
                    spans.push(span);
                }
                other => {
                    spans.extend(other);
                    spans.push(TagSpan::single(kind, idx));
                }
            },
            _ => match open.as_mut() {
                Some(span) if span.kind == kind => span.last = idx,
                _ => {
                    spans.extend(open.take());
                    open = Some(TagSpan::single(kind, idx));
                }
            },
        }
    }

    spans.extend(open);
    spans
}

impl TagSpan {
    fn single(kind: &str, idx: usize) -> Self {
        Self {
            kind: kind.to_string(),
            first: idx,
            last: idx,
        }
    }
}
