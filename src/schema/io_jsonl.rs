//! JSON Lines reading and writing.
//!
//! Records are written one JSON object per line, the layout dataset hubs
//! consume directly. Only `bigbio_kb` documents are read back (for
//! validation and merging).

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use super::kb::KbDocument;
use crate::error::BigbioError;

/// Reads `bigbio_kb` documents from a JSON Lines file. Blank lines are
/// ignored.
pub fn read_kb_jsonl(path: &Path) -> Result<Vec<KbDocument>, BigbioError> {
    let file = File::open(path).map_err(BigbioError::Io)?;
    let reader = BufReader::new(file);

    let mut documents = Vec::new();
    for (line_idx, line) in reader.lines().enumerate() {
        let line = line.map_err(BigbioError::Io)?;
        if line.trim().is_empty() {
            continue;
        }
        let document =
            serde_json::from_str(&line).map_err(|source| BigbioError::KbJsonParse {
                path: path.to_path_buf(),
                line: line_idx + 1,
                source,
            })?;
        documents.push(document);
    }

    Ok(documents)
}

/// Writes records to a JSON Lines file.
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<(), BigbioError> {
    let file = File::create(path).map_err(BigbioError::Io)?;
    let mut writer = BufWriter::new(file);

    for record in records {
        serde_json::to_writer(&mut writer, record).map_err(|source| BigbioError::JsonlWrite {
            path: path.to_path_buf(),
            source,
        })?;
        writer.write_all(b"\n").map_err(BigbioError::Io)?;
    }

    writer.flush().map_err(BigbioError::Io)
}

/// Parses `bigbio_kb` documents from a JSON Lines string.
///
/// Useful for testing without file I/O.
pub fn from_kb_jsonl_str(jsonl: &str) -> Result<Vec<KbDocument>, serde_json::Error> {
    jsonl
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect()
}

/// Serializes records to a JSON Lines string.
pub fn to_jsonl_string<T: Serialize>(records: &[T]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}
