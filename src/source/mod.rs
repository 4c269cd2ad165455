//! On-disk corpus formats.
//!
//! One `io_*` module per format, each exposing `read_*` (path based) and
//! `from_*_str` (in-memory) functions that return the format's own document
//! type. [`read_source`] dispatches on [`SourceFormat`] and wraps the result
//! in [`SourceDocument`], the `source` schema record.

pub mod io_bioc_xml;
pub mod io_brat;
pub mod io_conll;
pub mod io_pubtator;
pub mod io_tabular;
pub mod normalize;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BigbioError;
use crate::projection::{ProjectionCounts, ProjectionReport};
use crate::schema::Schema;

use io_bioc_xml::{BiocDocument, BiocOptions};
use io_brat::{BratDocument, BratOptions};
use io_conll::{ConllDocument, ConllOptions};
use io_pubtator::{PubTatorDocument, PubTatorOptions};
use io_tabular::{TabularOptions, TabularRow};

/// Supported input formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Brat,
    Bioc,
    PubTator,
    Conll,
    Csv,
    Tsv,
}

impl SourceFormat {
    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::Brat => "brat",
            SourceFormat::Bioc => "bioc",
            SourceFormat::PubTator => "pubtator",
            SourceFormat::Conll => "conll",
            SourceFormat::Csv => "csv",
            SourceFormat::Tsv => "tsv",
        }
    }

    /// Whether documents of this format can be projected into `schema`.
    ///
    /// Annotation formats project into `bigbio_kb`; delimited rows into the
    /// record schemas. Every format has a `source` view.
    pub fn supports(&self, schema: Schema) -> bool {
        match self {
            SourceFormat::Brat
            | SourceFormat::Bioc
            | SourceFormat::PubTator
            | SourceFormat::Conll => matches!(schema, Schema::Source | Schema::Kb),
            SourceFormat::Csv | SourceFormat::Tsv => schema != Schema::Kb,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceFormat {
    type Err = BigbioError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "brat" | "standoff" => Ok(SourceFormat::Brat),
            "bioc" | "bioc-xml" | "bioc_xml" => Ok(SourceFormat::Bioc),
            "pubtator" => Ok(SourceFormat::PubTator),
            "conll" | "iob" | "bio" => Ok(SourceFormat::Conll),
            "csv" => Ok(SourceFormat::Csv),
            "tsv" => Ok(SourceFormat::Tsv),
            _ => Err(BigbioError::UnknownFormat(raw.to_string())),
        }
    }
}

impl Serialize for SourceFormat {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SourceFormat {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as Deserialize>::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Per-format reader and projection options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    pub brat: BratOptions,
    pub bioc: BiocOptions,
    pub pubtator: PubTatorOptions,
    pub conll: ConllOptions,
    pub tabular: TabularOptions,
}

/// A document in its source structure.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceDocument {
    Brat(BratDocument),
    Bioc(BiocDocument),
    PubTator(PubTatorDocument),
    Conll(ConllDocument),
    Row(TabularRow),
}

impl SourceDocument {
    /// Source-corpus identifier of the document.
    pub fn document_id(&self) -> &str {
        match self {
            SourceDocument::Brat(doc) => &doc.document_id,
            SourceDocument::Bioc(doc) => &doc.id,
            SourceDocument::PubTator(doc) => &doc.pmid,
            SourceDocument::Conll(doc) => &doc.document_id,
            SourceDocument::Row(row) => &row.id,
        }
    }

    /// Counts of what the document contains, before projection.
    pub fn counts(&self) -> ProjectionCounts {
        let mut counts = ProjectionCounts {
            documents: 1,
            ..Default::default()
        };
        match self {
            SourceDocument::Brat(doc) => {
                counts.passages = 1;
                counts.entities = doc.text_bound_annotations.len();
                counts.relations = doc.relations.len();
                counts.events = doc.events.len();
                counts.coreferences = doc.equivalences.len();
            }
            SourceDocument::Bioc(doc) => {
                counts.passages = doc.passages.len();
                counts.entities = doc.annotations().count();
                counts.relations = doc.all_relations().count();
            }
            SourceDocument::PubTator(doc) => {
                counts.passages = 2;
                counts.entities = doc.mentions.len();
                counts.relations = doc.relations.len();
            }
            SourceDocument::Conll(doc) => {
                counts.passages = doc.sentences.len();
                counts.entities = doc.sentences.iter().map(|s| s.tag_spans().len()).sum();
            }
            SourceDocument::Row(_) => {}
        }
        counts
    }
}

/// Reads every document of one split.
///
/// Input counts are added to `report`; skipped lines become report issues.
pub fn read_source(
    format: SourceFormat,
    path: &Path,
    options: &SourceOptions,
    report: &mut ProjectionReport,
) -> Result<Vec<SourceDocument>, BigbioError> {
    let documents: Vec<SourceDocument> = match format {
        SourceFormat::Brat => io_brat::read_brat_dir(path, &options.brat, report)?
            .into_iter()
            .map(SourceDocument::Brat)
            .collect(),
        SourceFormat::Bioc => io_bioc_xml::read_bioc_xml(path, &options.bioc, report)?
            .into_iter()
            .map(SourceDocument::Bioc)
            .collect(),
        SourceFormat::PubTator => io_pubtator::read_pubtator_file(path, report)?
            .into_iter()
            .map(SourceDocument::PubTator)
            .collect(),
        SourceFormat::Conll => io_conll::read_conll_file(path, &options.conll)?
            .into_iter()
            .map(SourceDocument::Conll)
            .collect(),
        SourceFormat::Csv => io_tabular::read_tabular_file(path, b',', &options.tabular)?
            .into_iter()
            .map(SourceDocument::Row)
            .collect(),
        SourceFormat::Tsv => io_tabular::read_tabular_file(path, b'\t', &options.tabular)?
            .into_iter()
            .map(SourceDocument::Row)
            .collect(),
    };

    for document in &documents {
        let counts = document.counts();
        report.input.add(&counts);
    }
    info!(
        format = %format,
        path = %path.display(),
        documents = documents.len(),
        "read source documents"
    );

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_parse_back() {
        for format in [
            SourceFormat::Brat,
            SourceFormat::Bioc,
            SourceFormat::PubTator,
            SourceFormat::Conll,
            SourceFormat::Csv,
            SourceFormat::Tsv,
        ] {
            assert_eq!(format.name().parse::<SourceFormat>().unwrap(), format);
        }
        assert!(matches!(
            "parquet".parse::<SourceFormat>(),
            Err(BigbioError::UnknownFormat(name)) if name == "parquet"
        ));
    }

    #[test]
    fn schema_support_matrix() {
        assert!(SourceFormat::Brat.supports(Schema::Kb));
        assert!(SourceFormat::Brat.supports(Schema::Source));
        assert!(!SourceFormat::PubTator.supports(Schema::Qa));
        assert!(SourceFormat::Csv.supports(Schema::Pairs));
        assert!(!SourceFormat::Tsv.supports(Schema::Kb));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: SourceOptions =
            serde_yaml::from_str("pubtator:\n  default_db_name: NCBIGene\n").unwrap();
        assert_eq!(
            options.pubtator.default_db_name.as_deref(),
            Some("NCBIGene")
        );
        assert_eq!(options.brat, BratOptions::default());
    }
}
