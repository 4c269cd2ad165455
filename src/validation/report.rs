//! Issues found while checking `bigbio_kb` documents.
//!
//! Reports are printed as text for people or serialized to JSON for
//! scripts; issue codes are stable across releases.

use serde::{Serialize, Serializer};
use std::fmt;

/// The result of validating a set of `bigbio_kb` documents.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    /// Number of documents checked.
    pub documents: usize,

    /// In the order the checks found them.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    fn with_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn error_count(&self) -> usize {
        self.with_severity(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.with_severity(Severity::Warning)
    }

    /// No errors; warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Neither errors nor warnings.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of issues with the given code.
    pub fn count(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }

    /// JSON form used by `bigbio validate --output json`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            documents: usize,
            error_count: usize,
            warning_count: usize,
            issues: &'a [ValidationIssue],
        }
        serde_json::to_string_pretty(&JsonReport {
            documents: self.documents,
            error_count: self.error_count(),
            warning_count: self.warning_count(),
            issues: &self.issues,
        })
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(
                f,
                "Validation passed: no issues found in {} document(s)",
                self.documents
            );
        }

        writeln!(
            f,
            "Validation of {} document(s) completed with {} error(s) and {} warning(s):",
            self.documents,
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// One problem with one object.
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,

    pub code: IssueCode,

    pub message: String,

    /// The object the issue is about.
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

/// The severity of a validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Suspicious but usable data.
    Warning,
    /// Data that breaks a schema invariant.
    Error,
}

/// A stable code identifying the type of validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    // Identity
    /// Two objects of one document share an id.
    DuplicateId,
    /// Two documents share a `document_id`.
    DuplicateDocumentId,

    // Structure
    /// A document has no passages.
    NoPassages,
    /// `text` and `offsets` have different lengths.
    TextOffsetCountMismatch,
    /// A span ends before it starts.
    InvertedSpan,
    /// A span reaches past the end of the document text.
    SpanOutOfBounds,
    /// Passages overlap or are out of order.
    PassageOverlap,
    /// A passage's text differs from the document text at its offsets.
    PassageTextMismatch,

    // Surface text
    /// An entity's text differs from the document text at its offsets.
    EntityTextMismatch,
    /// A trigger's text differs from the document text at its offsets.
    TriggerTextMismatch,

    // References
    /// A relation argument is not an entity of the document.
    MissingRelationArg,
    /// An event argument is neither an entity nor an event of the document.
    MissingEventArg,
    /// A coreference member is not an entity of the document.
    MissingCorefEntity,

    // Labels
    /// An object has an empty type.
    EmptyType,
    /// A normalization has an empty database id.
    EmptyNormalizationId,
}

/// Where a validation issue occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssueContext {
    Corpus,
    Document { document_id: String },
    Passage { document_id: String, id: String },
    Entity { document_id: String, id: String },
    Event { document_id: String, id: String },
    Relation { document_id: String, id: String },
    Coreference { document_id: String, id: String },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Corpus => write!(f, "corpus"),
            IssueContext::Document { document_id } => write!(f, "document {}", document_id),
            IssueContext::Passage { document_id, id } => {
                write!(f, "passage {} of {}", id, document_id)
            }
            IssueContext::Entity { document_id, id } => {
                write!(f, "entity {} of {}", id, document_id)
            }
            IssueContext::Event { document_id, id } => {
                write!(f, "event {} of {}", id, document_id)
            }
            IssueContext::Relation { document_id, id } => {
                write!(f, "relation {} of {}", id, document_id)
            }
            IssueContext::Coreference { document_id, id } => {
                write!(f, "coreference {} of {}", id, document_id)
            }
        }
    }
}

impl Serialize for IssueContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
