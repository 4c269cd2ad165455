//! Integrity checks for `bigbio_kb` documents.
//!
//! This module checks:
//! - identity (ids unique within a document, document ids unique in a corpus)
//! - references (relation, event and coreference targets exist)
//! - offsets (ordered, in bounds, one text chunk per range)
//! - text (passages and mentions agree with the reconstructed document text)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::offsets::{char_len, CharIndex};
use crate::schema::{KbDocument, Normalization, Span};

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    ///
    /// The checks themselves do not change; severities stay as reported and
    /// callers decide whether warnings fail the run (see
    /// [`ValidationReport::warning_count`]).
    pub strict: bool,
}

/// Validates a corpus of documents and returns a report of all issues found.
pub fn validate_documents(documents: &[KbDocument], _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();
    report.documents = documents.len();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (idx, doc) in documents.iter().enumerate() {
        if let Some(first_idx) = seen.get(doc.document_id.as_str()) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateDocumentId,
                format!(
                    "Duplicate document_id '{}' (first seen at line {})",
                    doc.document_id,
                    first_idx + 1
                ),
                IssueContext::Corpus,
            ));
        } else {
            seen.insert(&doc.document_id, idx);
        }
        validate_document_into(doc, &mut report);
    }

    report
}

/// Validates a single document.
pub fn validate_document(doc: &KbDocument, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();
    report.documents = 1;
    validate_document_into(doc, &mut report);
    report
}

fn validate_document_into(doc: &KbDocument, report: &mut ValidationReport) {
    let doc_ctx = || IssueContext::Document {
        document_id: doc.document_id.clone(),
    };

    check_ids(doc, report);

    if doc.passages.is_empty() {
        report.add(ValidationIssue::warning(
            IssueCode::NoPassages,
            "Document has no passages",
            doc_ctx(),
        ));
    }

    let text = doc.text();
    let chars = CharIndex::new(&text);
    check_passages(doc, &chars, report);

    let entity_ids: HashSet<&str> = doc.entities.iter().map(|e| e.id.as_str()).collect();
    let event_ids: HashSet<&str> = doc.events.iter().map(|e| e.id.as_str()).collect();

    for entity in &doc.entities {
        let ctx = || IssueContext::Entity {
            document_id: doc.document_id.clone(),
            id: entity.id.clone(),
        };
        check_type(&entity.kind, ctx, report);
        check_normalizations(&entity.normalized, ctx, report);
        check_mention(
            &entity.text,
            &entity.offsets,
            &chars,
            IssueCode::EntityTextMismatch,
            ctx,
            report,
        );
    }

    for event in &doc.events {
        let ctx = || IssueContext::Event {
            document_id: doc.document_id.clone(),
            id: event.id.clone(),
        };
        check_type(&event.kind, ctx, report);
        check_mention(
            &event.trigger.text,
            &event.trigger.offsets,
            &chars,
            IssueCode::TriggerTextMismatch,
            ctx,
            report,
        );
        for arg in &event.arguments {
            let target = arg.ref_id.as_str();
            if !entity_ids.contains(target) && !event_ids.contains(target) {
                report.add(ValidationIssue::error(
                    IssueCode::MissingEventArg,
                    format!(
                        "Argument '{}' references unknown entity or event '{}'",
                        arg.role, target
                    ),
                    ctx(),
                ));
            }
        }
    }

    for relation in &doc.relations {
        let ctx = || IssueContext::Relation {
            document_id: doc.document_id.clone(),
            id: relation.id.clone(),
        };
        check_type(&relation.kind, ctx, report);
        check_normalizations(&relation.normalized, ctx, report);
        for (slot, target) in [("arg1", &relation.arg1_id), ("arg2", &relation.arg2_id)] {
            if !entity_ids.contains(target.as_str()) {
                report.add(ValidationIssue::error(
                    IssueCode::MissingRelationArg,
                    format!("{} '{}' is not an entity of the document", slot, target),
                    ctx(),
                ));
            }
        }
    }

    for coref in &doc.coreferences {
        for member in &coref.entity_ids {
            if !entity_ids.contains(member.as_str()) {
                report.add(ValidationIssue::error(
                    IssueCode::MissingCorefEntity,
                    format!("Member '{}' is not an entity of the document", member),
                    IssueContext::Coreference {
                        document_id: doc.document_id.clone(),
                        id: coref.id.clone(),
                    },
                ));
            }
        }
    }
}

/// Ids must be unique across every object kind of a document.
fn check_ids(doc: &KbDocument, report: &mut ValidationReport) {
    let ids = std::iter::once(("document", doc.id.as_str()))
        .chain(doc.passages.iter().map(|p| ("passage", p.id.as_str())))
        .chain(doc.entities.iter().map(|e| ("entity", e.id.as_str())))
        .chain(doc.events.iter().map(|e| ("event", e.id.as_str())))
        .chain(doc.relations.iter().map(|r| ("relation", r.id.as_str())))
        .chain(doc.coreferences.iter().map(|c| ("coreference", c.id.as_str())));

    let mut seen: HashMap<&str, &str> = HashMap::new();
    for (kind, id) in ids {
        if let Some(first_kind) = seen.get(id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateId,
                format!("Id '{}' of {} is already used by {}", id, kind, first_kind),
                IssueContext::Document {
                    document_id: doc.document_id.clone(),
                },
            ));
        } else {
            seen.insert(id, kind);
        }
    }
}

fn check_passages(doc: &KbDocument, chars: &CharIndex<'_>, report: &mut ValidationReport) {
    let mut previous_end: Option<usize> = None;

    for passage in &doc.passages {
        let ctx = || IssueContext::Passage {
            document_id: doc.document_id.clone(),
            id: passage.id.clone(),
        };
        check_type(&passage.kind, ctx, report);
        if !check_spans(&passage.text, &passage.offsets, chars, ctx, report) {
            continue;
        }

        for (text, span) in passage.text.iter().zip(&passage.offsets) {
            if char_len(text) != span.len() || chars.slice(*span) != Some(text.as_str()) {
                report.add(ValidationIssue::error(
                    IssueCode::PassageTextMismatch,
                    format!(
                        "Passage text does not match the document text at {}",
                        span
                    ),
                    ctx(),
                ));
            }
            if let Some(end) = previous_end {
                if span.start < end {
                    report.add(ValidationIssue::warning(
                        IssueCode::PassageOverlap,
                        format!(
                            "Passage at {} starts before the previous one ends ({})",
                            span, end
                        ),
                        ctx(),
                    ));
                }
            }
            previous_end = Some(span.end);
        }
    }
}

/// Structural span checks shared by every text-bound object. Returns false
/// when the text cannot be compared against the document.
fn check_spans(
    text: &[String],
    offsets: &[Span],
    chars: &CharIndex<'_>,
    ctx: impl Fn() -> IssueContext,
    report: &mut ValidationReport,
) -> bool {
    let mut comparable = true;

    if text.len() != offsets.len() {
        report.add(ValidationIssue::error(
            IssueCode::TextOffsetCountMismatch,
            format!("{} text chunk(s) for {} offset range(s)", text.len(), offsets.len()),
            ctx(),
        ));
        comparable = false;
    }

    for span in offsets {
        if !span.is_ordered() {
            report.add(ValidationIssue::error(
                IssueCode::InvertedSpan,
                format!("Span {} ends before it starts", span),
                ctx(),
            ));
            comparable = false;
        } else if span.end > chars.len() {
            report.add(ValidationIssue::error(
                IssueCode::SpanOutOfBounds,
                format!(
                    "Span {} extends past the document text ({} chars)",
                    span,
                    chars.len()
                ),
                ctx(),
            ));
            comparable = false;
        }
    }

    comparable
}

fn check_mention(
    text: &[String],
    offsets: &[Span],
    chars: &CharIndex<'_>,
    code: IssueCode,
    ctx: impl Fn() -> IssueContext,
    report: &mut ValidationReport,
) {
    if !check_spans(text, offsets, chars, &ctx, report) {
        return;
    }
    for (chunk, span) in text.iter().zip(offsets) {
        let actual = chars.slice(*span).unwrap_or_default();
        if actual != chunk.as_str() {
            report.add(ValidationIssue::warning(
                code,
                format!("Text '{}' but document has '{}' at {}", chunk, actual, span),
                ctx(),
            ));
        }
    }
}

fn check_type(kind: &str, ctx: impl Fn() -> IssueContext, report: &mut ValidationReport) {
    if kind.trim().is_empty() {
        report.add(ValidationIssue::warning(
            IssueCode::EmptyType,
            "Empty type",
            ctx(),
        ));
    }
}

fn check_normalizations(
    normalized: &[Normalization],
    ctx: impl Fn() -> IssueContext,
    report: &mut ValidationReport,
) {
    for norm in normalized {
        if norm.db_id.trim().is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyNormalizationId,
                format!("Normalization to '{}' has an empty id", norm.db_name),
                ctx(),
            ));
        }
    }
}
