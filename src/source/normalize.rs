//! Entity identifier normalization.
//!
//! Corpora spell database references in many ways: `MESH:D001241`,
//! `mesh:D001241`, a bare `D001241` with the database implied by the corpus,
//! composite `D001|D002` lists for mentions mapped to several concepts, and
//! `-1` for "no concept". These helpers turn all of them into
//! [`Normalization`] values.

use crate::schema::Normalization;

/// Separators between several ids attached to one mention.
const ID_SEPARATORS: [char; 3] = ['|', ',', ';'];

/// Values meaning "no identifier".
const NULL_IDS: [&str; 4] = ["", "-", "-1", "<BB_NULL_STR>"];

/// Databases whose prefixes are canonicalized to a fixed spelling.
const KNOWN_DATABASES: [&str; 12] = [
    "MESH", "OMIM", "NCBIGene", "NCBITaxon", "CHEBI", "UMLS", "GO", "UniProt", "CL", "DOID",
    "HGNC", "dbSNP",
];

/// Parses a raw identifier string into normalizations.
///
/// `default_db` is used for ids without a `db:` prefix; without it such ids
/// are dropped.
pub fn parse_db_ids(raw: &str, default_db: Option<&str>) -> Vec<Normalization> {
    raw.split(ID_SEPARATORS)
        .map(str::trim)
        .filter(|id| !is_null_id(id))
        .filter_map(|id| parse_single_id(id, default_db))
        .collect()
}

/// Returns true for the placeholder values that mean "no identifier".
pub fn is_null_id(id: &str) -> bool {
    NULL_IDS.contains(&id.trim())
}

/// Canonical spelling of a database name (`mesh` → `MESH`,
/// `NCBI Gene` → `NCBIGene`). Unknown names are returned unchanged.
pub fn canonical_db_name(name: &str) -> String {
    let trimmed = name.trim();
    let compact: String = trimmed.chars().filter(|c| *c != ' ' && *c != '_').collect();
    KNOWN_DATABASES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(&compact))
        .map(|known| known.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

fn parse_single_id(id: &str, default_db: Option<&str>) -> Option<Normalization> {
    match id.split_once(':') {
        // "CHEBI:CHEBI:1234" style double prefixes keep everything after the
        // first colon as the id.
        Some((db, rest)) if !db.is_empty() && !rest.is_empty() => {
            Some(Normalization::new(canonical_db_name(db), rest.trim()))
        }
        Some(_) => None,
        None => default_db.map(|db| Normalization::new(canonical_db_name(db), id)),
    }
}
