//! Corpus configuration files.
//!
//! A corpus is described by a small YAML file naming its on-disk format,
//! the schema to produce and where each split lives:
//!
//! ```yaml
//! name: bionlp_st_2013_ge
//! format: brat
//! schema: bigbio_kb
//! local: true
//! splits:
//!   train: train
//!   validation: dev
//! brat:
//!   annotation_suffixes: [a1, a2]
//! ```
//!
//! Per-format option blocks (`brat`, `bioc`, `pubtator`, `conll`,
//! `tabular`) are optional and default individually.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BigbioError;
use crate::schema::Schema;
use crate::source::{SourceFormat, SourceOptions};

/// Description of one corpus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: String,

    /// Schema produced when the caller does not ask for another one.
    #[serde(default = "default_schema")]
    pub schema: Schema,

    pub format: SourceFormat,

    /// The corpus files cannot be fetched and must be supplied by the user.
    #[serde(default)]
    pub local: bool,

    /// Root of the extracted corpus. Relative paths are resolved against the
    /// directory holding the config file.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Split name → file or directory, relative to the data dir.
    #[serde(default)]
    pub splits: BTreeMap<String, PathBuf>,

    #[serde(flatten)]
    pub options: SourceOptions,

    /// Directory of the config file, for resolving relative paths.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_schema() -> Schema {
    Schema::Source
}

impl CorpusConfig {
    /// Reads and checks a config file.
    pub fn load(path: &Path) -> Result<Self, BigbioError> {
        let data = fs::read_to_string(path).map_err(BigbioError::Io)?;
        let mut config = Self::parse(&data, path)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parses a config from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, BigbioError> {
        Self::parse(yaml, Path::new("<memory>"))
    }

    fn parse(yaml: &str, path: &Path) -> Result<Self, BigbioError> {
        let config: CorpusConfig =
            serde_yaml::from_str(yaml).map_err(|source| BigbioError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), BigbioError> {
        if self.name.trim().is_empty() {
            return Err(BigbioError::ConfigInvalid {
                message: "corpus name is empty".to_string(),
            });
        }
        if self.splits.is_empty() {
            return Err(BigbioError::ConfigInvalid {
                message: format!("corpus '{}' declares no splits", self.name),
            });
        }
        self.check_schema(self.schema)
    }

    /// Fails when the corpus format has no view in `schema`.
    pub fn check_schema(&self, schema: Schema) -> Result<(), BigbioError> {
        if self.format.supports(schema) {
            Ok(())
        } else {
            Err(BigbioError::UnsupportedSchema {
                format: self.format.name().to_string(),
                schema: schema.name().to_string(),
            })
        }
    }

    /// Picks the data directory: an explicit override first, then the
    /// configured `data_dir`, then the config file's own directory.
    ///
    /// Local-only corpora must name their data dir one way or the other.
    pub fn resolve_data_dir(&self, data_dir: Option<&Path>) -> Result<PathBuf, BigbioError> {
        if let Some(dir) = data_dir {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &self.data_dir {
            return Ok(match &self.base_dir {
                Some(base) if dir.is_relative() => base.join(dir),
                _ => dir.clone(),
            });
        }
        if self.local {
            return Err(BigbioError::MissingDataDir {
                corpus: self.name.clone(),
            });
        }
        Ok(self.base_dir.clone().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Path of `split` under `data_dir`.
    pub fn split_path(&self, data_dir: &Path, split: &str) -> Result<PathBuf, BigbioError> {
        self.splits
            .get(split)
            .map(|relative| data_dir.join(relative))
            .ok_or_else(|| BigbioError::MissingSplit {
                corpus: self.name.clone(),
                split: split.to_string(),
            })
    }

    /// Split names in sorted order.
    pub fn split_names(&self) -> impl Iterator<Item = &str> {
        self.splits.keys().map(String::as_str)
    }
}
