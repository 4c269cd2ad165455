//! Projection report types for tracking dropped annotations and policy
//! decisions.
//!
//! Readers and projectors never lose data silently: every skipped line,
//! unmatched entity or unrepresentable relation is recorded here with a
//! stable code, similar to how `validation::ValidationReport` tracks
//! document issues.

use serde::Serialize;
use std::fmt;

/// A report generated while reading and projecting a corpus.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ProjectionReport {
    /// Source format name.
    pub format: String,
    /// Target schema name.
    pub schema: String,
    /// Counts of what was read from the source files.
    pub input: ProjectionCounts,
    /// Counts of what was produced.
    pub output: ProjectionCounts,
    /// Issues discovered while reading and projecting.
    pub issues: Vec<ProjectionIssue>,
}

impl ProjectionReport {
    /// Create a new empty report.
    pub fn new(format: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            schema: schema.into(),
            ..Default::default()
        }
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: ProjectionIssue) {
        self.issues.push(issue);
    }

    /// Count of warning-level issues (information was dropped).
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ProjectionSeverity::Warning)
            .count()
    }

    /// Count of info-level issues.
    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ProjectionSeverity::Info)
            .count()
    }

    /// Number of issues with the given code.
    pub fn count(&self, code: ProjectionIssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }

    /// Returns true if anything was dropped.
    pub fn is_lossy(&self) -> bool {
        self.warning_count() > 0
    }

    /// Folds another report's counts and issues into this one.
    pub fn absorb(&mut self, other: ProjectionReport) {
        self.input.add(&other.input);
        self.output.add(&other.output);
        self.issues.extend(other.issues);
    }
}

impl fmt::Display for ProjectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} -> {}", self.format, self.schema)?;
        writeln!(f, "  read:     {}", self.input)?;
        if self.output != self.input {
            writeln!(f, "  produced: {}", self.output)?;
        }

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", warnings)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ProjectionSeverity::Warning)
            {
                writeln!(f, "  - {}", issue)?;
            }
        }

        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({}):", infos)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ProjectionSeverity::Info)
            {
                writeln!(f, "  - {}", issue)?;
            }
        }

        Ok(())
    }
}

/// Counts of corpus elements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionCounts {
    pub documents: usize,
    pub passages: usize,
    pub entities: usize,
    pub relations: usize,
    pub events: usize,
    pub coreferences: usize,
}

impl ProjectionCounts {
    /// Adds `other` field by field.
    pub fn add(&mut self, other: &ProjectionCounts) {
        self.documents += other.documents;
        self.passages += other.passages;
        self.entities += other.entities;
        self.relations += other.relations;
        self.events += other.events;
        self.coreferences += other.coreferences;
    }
}

impl fmt::Display for ProjectionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents, {} passages, {} entities, {} relations, {} events, {} coreferences",
            self.documents,
            self.passages,
            self.entities,
            self.relations,
            self.events,
            self.coreferences
        )
    }
}

/// A single issue discovered during reading or projection.
#[derive(Clone, Debug, Serialize)]
pub struct ProjectionIssue {
    pub severity: ProjectionSeverity,
    pub code: ProjectionIssueCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl ProjectionIssue {
    /// Create a warning-level issue (information was dropped).
    pub fn warning(code: ProjectionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ProjectionSeverity::Warning,
            code,
            message: message.into(),
            document_id: None,
        }
    }

    /// Create an info-level issue (policy note).
    pub fn info(code: ProjectionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ProjectionSeverity::Info,
            code,
            message: message.into(),
            document_id: None,
        }
    }

    /// Attach the document the issue occurred in.
    pub fn in_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }
}

impl fmt::Display for ProjectionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.document_id {
            Some(doc) => write!(f, "[{:?}] {}: {}", self.code, doc, self.message),
            None => write!(f, "[{:?}] {}", self.code, self.message),
        }
    }
}

/// Severity level for projection issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionSeverity {
    /// Something in the source could not be carried over.
    Warning,
    /// A policy decision; nothing was lost.
    Info,
}

/// Stable issue codes for programmatic consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionIssueCode {
    // Reader issues
    /// An annotation line could not be parsed and was skipped.
    MalformedLine,
    /// An annotation line of an unknown kind was skipped.
    UnknownLineKind,
    /// A text file had no annotation file next to it.
    MissingAnnotationFile,
    /// A row belonged to a different document than its block.
    DocumentIdMismatch,

    // Projection issues
    /// A passage whose offsets cannot be represented was dropped.
    PassageDropped,
    /// An entity whose offsets could not be reconciled with the text was dropped.
    EntityDropped,
    /// An entity's stored text differs from the text at its offsets.
    EntityTextMismatch,
    /// An entity was found at a different position than its stated offsets.
    EntityRelocated,
    /// An annotation without a type was dropped.
    MissingType,
    /// A relation between non-entity annotations was skipped.
    RelationArgNotEntity,
    /// A relation whose arguments could not be resolved was skipped.
    RelationUnresolved,
    /// An event whose trigger is not a text-bound annotation was skipped.
    EventTriggerMissing,
    /// An event argument that points at nothing projectable was dropped.
    EventArgUnresolved,
    /// A normalization whose target is not an entity was dropped.
    NormalizationUnresolved,
    /// Attributes and notes have no place in `bigbio_kb`.
    AttributesDropped,
    /// An equivalence set containing non-entities was skipped.
    CoreferenceNotEntities,

    // Policy notes
    /// Ids are assigned from a per-load counter.
    IdAssignment,
    /// Text-bound annotations used as event triggers are not entities.
    TriggersAreNotEntities,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_not_lossy() {
        let report = ProjectionReport::new("brat", "bigbio_kb");
        assert!(!report.is_lossy());
        assert_eq!(report.warning_count(), 0);
        assert_eq!(report.info_count(), 0);
    }

    #[test]
    fn warning_makes_report_lossy() {
        let mut report = ProjectionReport::new("conll", "bigbio_kb");
        report.add(
            ProjectionIssue::warning(ProjectionIssueCode::EntityDropped, "no span for 'IL-2'")
                .in_document("doc1"),
        );
        assert!(report.is_lossy());
        assert_eq!(report.count(ProjectionIssueCode::EntityDropped), 1);
    }

    #[test]
    fn absorb_sums_counts() {
        let mut total = ProjectionReport::new("pubtator", "bigbio_kb");
        let mut part = ProjectionReport::new("pubtator", "bigbio_kb");
        part.input.documents = 2;
        part.output.entities = 5;
        part.add(ProjectionIssue::info(ProjectionIssueCode::IdAssignment, "x"));
        total.absorb(part.clone());
        total.absorb(part);
        assert_eq!(total.input.documents, 4);
        assert_eq!(total.output.entities, 10);
        assert_eq!(total.info_count(), 2);
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = ProjectionReport::new("brat", "bigbio_kb");
        report.input.entities = 3;
        report.add(
            ProjectionIssue::warning(ProjectionIssueCode::RelationArgNotEntity, "R1 skipped")
                .in_document("PMID-1"),
        );

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"format\":\"brat\""));
        assert!(json.contains("\"severity\":\"warning\""));
        assert!(json.contains("\"code\":\"relation_arg_not_entity\""));
        assert!(json.contains("\"document_id\":\"PMID-1\""));
    }

    #[test]
    fn display_lists_warnings() {
        let mut report = ProjectionReport::new("brat", "bigbio_kb");
        report.add(ProjectionIssue::warning(
            ProjectionIssueCode::MalformedLine,
            "line 3 skipped",
        ));
        let text = report.to_string();
        assert!(text.contains("Warnings (1):"));
        assert!(text.contains("MalformedLine"));
    }
}
