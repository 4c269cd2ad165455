//! Projection of source documents into an output schema.
//!
//! A [`Projector`] is chosen once per load by [`projector_for`] and then
//! applied to every document of the split. Projectors never drop data
//! silently: whatever cannot be carried into the target schema is recorded
//! in the [`ProjectionReport`].

pub mod kb;
pub mod report;
mod rows;

pub use report::{
    ProjectionCounts, ProjectionIssue, ProjectionIssueCode, ProjectionReport, ProjectionSeverity,
};

use tracing::debug;

use crate::error::BigbioError;
use crate::schema::{IdGenerator, Record, Schema};
use crate::source::{SourceDocument, SourceFormat, SourceOptions};

/// Turns one source document into zero or more records of a schema.
pub trait Projector {
    /// The schema records are produced in.
    fn schema(&self) -> Schema;

    /// Projects one document. Synthetic ids are drawn from `ids`.
    fn project(
        &self,
        document: &SourceDocument,
        ids: &mut IdGenerator,
        report: &mut ProjectionReport,
    ) -> Result<Vec<Record>, BigbioError>;

    /// Adds notes on policies that apply to every document.
    fn add_policy_notes(&self, _report: &mut ProjectionReport) {}
}

/// Selects the projector for a format/schema pair.
pub fn projector_for(
    format: SourceFormat,
    schema: Schema,
    options: &SourceOptions,
) -> Result<Box<dyn Projector>, BigbioError> {
    if !format.supports(schema) {
        return Err(BigbioError::UnsupportedSchema {
            format: format.name().to_string(),
            schema: schema.name().to_string(),
        });
    }

    let projector: Box<dyn Projector> = match schema {
        Schema::Source => Box::new(SourceProjector),
        Schema::Kb => Box::new(kb::KbProjector::new(options.clone())),
        _ => Box::new(rows::RowProjector::new(schema, options.tabular.clone())),
    };
    debug!(format = %format, schema = %schema, "selected projector");
    Ok(projector)
}

/// Projects every document, adding output counts and policy notes to
/// `report`.
pub fn project_all(
    projector: &dyn Projector,
    documents: &[SourceDocument],
    ids: &mut IdGenerator,
    report: &mut ProjectionReport,
) -> Result<Vec<Record>, BigbioError> {
    let mut records = Vec::with_capacity(documents.len());
    for document in documents {
        for record in projector.project(document, ids, report)? {
            report.output.add(&record_counts(&record));
            records.push(record);
        }
    }
    projector.add_policy_notes(report);
    Ok(records)
}

fn record_counts(record: &Record) -> ProjectionCounts {
    match record {
        Record::Kb(doc) => ProjectionCounts {
            documents: 1,
            passages: doc.passages.len(),
            entities: doc.entities.len(),
            relations: doc.relations.len(),
            events: doc.events.len(),
            coreferences: doc.coreferences.len(),
        },
        Record::Source(doc) => doc.counts(),
        _ => ProjectionCounts {
            documents: 1,
            ..Default::default()
        },
    }
}

/// Emits the source document unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceProjector;

impl Projector for SourceProjector {
    fn schema(&self) -> Schema {
        Schema::Source
    }

    fn project(
        &self,
        document: &SourceDocument,
        _ids: &mut IdGenerator,
        _report: &mut ProjectionReport,
    ) -> Result<Vec<Record>, BigbioError> {
        Ok(vec![Record::Source(document.clone())])
    }
}
