//! CSV / TSV reader for pair, classification, QA and entailment corpora.
//!
//! A header row is required. Each data row becomes a [`TabularRow`]: a row
//! id plus the header → value map. Which columns feed which schema field is
//! decided at projection time through [`TabularOptions::column`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BigbioError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularOptions {
    /// Field delimiter; `,` for csv and a tab for tsv when unset.
    pub delimiter: Option<char>,

    /// Column holding the row id; the 0-based row index when unset.
    pub id_column: Option<String>,

    /// Schema field → column name overrides. Fields without an entry are
    /// read from the column of the same name.
    pub columns: BTreeMap<String, String>,

    /// Separator for list-valued fields (labels, answers, choices).
    pub list_separator: String,

    /// Names recorded in `bigbio_t2t` records.
    pub text_1_name: String,
    pub text_2_name: String,

    /// Question type for `bigbio_qa` when no `type` column exists.
    pub question_type: Option<String>,
}

impl Default for TabularOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            id_column: None,
            columns: BTreeMap::new(),
            list_separator: "|".to_string(),
            text_1_name: "text_1".to_string(),
            text_2_name: "text_2".to_string(),
            question_type: None,
        }
    }
}

impl TabularOptions {
    /// Column that holds a schema field.
    pub fn column<'a>(&'a self, field: &'a str) -> &'a str {
        self.columns.get(field).map(String::as_str).unwrap_or(field)
    }

    /// Splits a list-valued cell. Empty cells give an empty list.
    pub fn split_list(&self, value: &str) -> Vec<String> {
        if value.trim().is_empty() {
            return Vec::new();
        }
        if self.list_separator.is_empty() {
            return vec![value.trim().to_string()];
        }
        value
            .split(self.list_separator.as_str())
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }
}

/// One data row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularRow {
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

impl TabularRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// Reads a delimited file.
pub fn read_tabular_file(
    path: &Path,
    default_delimiter: u8,
    opts: &TabularOptions,
) -> Result<Vec<TabularRow>, BigbioError> {
    let file = File::open(path).map_err(BigbioError::Io)?;
    let rows = parse_rows(BufReader::new(file), path, default_delimiter, opts)?;
    debug!(path = %path.display(), rows = rows.len(), "read delimited file");
    Ok(rows)
}

/// Parses delimited content from a string.
///
/// Useful for testing without file I/O.
pub fn from_tabular_str(
    input: &str,
    default_delimiter: u8,
    opts: &TabularOptions,
) -> Result<Vec<TabularRow>, BigbioError> {
    parse_rows(input.as_bytes(), Path::new("<memory>"), default_delimiter, opts)
}

fn parse_rows<R: Read>(
    reader: R,
    path: &Path,
    default_delimiter: u8,
    opts: &TabularOptions,
) -> Result<Vec<TabularRow>, BigbioError> {
    let delimiter = match opts.delimiter {
        Some(ch) if ch.is_ascii() => ch as u8,
        Some(ch) => {
            return Err(BigbioError::ConfigInvalid {
                message: format!("delimiter '{ch}' is not a single-byte character"),
            })
        }
        None => default_delimiter,
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let tabular_error = |source: csv::Error| BigbioError::TabularParse {
        path: path.to_path_buf(),
        source,
    };

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(tabular_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if let Some(id_column) = &opts.id_column {
        if !headers.iter().any(|h| h == id_column) {
            return Err(BigbioError::TabularColumnMissing {
                path: path.to_path_buf(),
                column: id_column.clone(),
            });
        }
    }

    let mut rows = Vec::new();
    for (idx, record) in csv_reader.records().enumerate() {
        let record = record.map_err(tabular_error)?;
        let fields: BTreeMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(ToOwned::to_owned))
            .collect();
        let id = opts
            .id_column
            .as_ref()
            .and_then(|column| fields.get(column).cloned())
            .unwrap_or_else(|| idx.to_string());
        rows.push(TabularRow { id, fields });
    }

    Ok(rows)
}
