//! Config-driven split loading.
//!
//! Every corpus follows the same template: pick the schema, locate the split
//! files, then read and project them. [`CorpusLoader`] does the first two
//! steps once, when it is built, and [`CorpusLoader::generate_examples`] the
//! last one per split.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::CorpusConfig;
use crate::error::BigbioError;
use crate::projection::{project_all, projector_for, ProjectionReport, Projector};
use crate::schema::{IdGenerator, Record, Schema};
use crate::source::read_source;

/// A configured corpus, ready to produce records.
pub struct CorpusLoader {
    config: CorpusConfig,
    data_dir: PathBuf,
    schema: Schema,
    projector: Box<dyn Projector>,
}

impl CorpusLoader {
    /// Builds a loader. `data_dir` and `schema` override the config values.
    pub fn new(
        config: CorpusConfig,
        data_dir: Option<&Path>,
        schema: Option<Schema>,
    ) -> Result<Self, BigbioError> {
        let schema = schema.unwrap_or(config.schema);
        config.check_schema(schema)?;
        let data_dir = config.resolve_data_dir(data_dir)?;
        if !data_dir.is_dir() {
            return Err(BigbioError::ConfigInvalid {
                message: format!(
                    "data dir {} of corpus '{}' is not a directory",
                    data_dir.display(),
                    config.name
                ),
            });
        }
        let projector = projector_for(config.format, schema, &config.options)?;

        Ok(Self {
            config,
            data_dir,
            schema,
            projector,
        })
    }

    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Split names in sorted order.
    pub fn splits(&self) -> Vec<String> {
        self.config.split_names().map(str::to_string).collect()
    }

    pub fn split_path(&self, split: &str) -> Result<PathBuf, BigbioError> {
        self.config.split_path(&self.data_dir, split)
    }

    /// Reads and projects one split.
    ///
    /// Ids restart at zero for every split. Skipped lines and dropped
    /// annotations are recorded in `report`.
    pub fn generate_examples(
        &self,
        split: &str,
        report: &mut ProjectionReport,
    ) -> Result<Vec<Record>, BigbioError> {
        let path = self.split_path(split)?;
        let documents = read_source(self.config.format, &path, &self.config.options, report)?;

        let mut ids = IdGenerator::new();
        let records = project_all(self.projector.as_ref(), &documents, &mut ids, report)?;
        info!(
            corpus = %self.config.name,
            split,
            schema = %self.schema,
            records = records.len(),
            warnings = report.warning_count(),
            "generated split"
        );
        Ok(records)
    }

    /// A fresh report labelled for this loader.
    pub fn new_report(&self) -> ProjectionReport {
        ProjectionReport::new(self.config.format.name(), self.schema.name())
    }
}
