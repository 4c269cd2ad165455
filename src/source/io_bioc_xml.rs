//! BioC XML reader.
//!
//! BioC stores a `<collection>` of `<document>`s; each document has passages
//! with an absolute `<offset>`, their `<text>`, `<annotation>`s located by
//! `<location offset length>` and `<relation>`s whose `<node refid role>`s
//! point at annotations. Relations may also sit directly on the document.
//!
//! Passages that only carry `<sentence>` children (sentence-split corpora)
//! are flattened: every sentence becomes its own passage of type
//! `sentence`. When a passage has both, sentence annotations are folded into
//! the passage.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Node;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::BigbioError;
use crate::projection::{ProjectionIssue, ProjectionIssueCode, ProjectionReport};
use crate::schema::Span;

const BIOC_XML_EXTENSION: &str = "xml";

/// Reader options. Also carries the infon keys used when projecting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiocOptions {
    /// Annotation locations are relative to their passage rather than the
    /// document.
    pub local_offsets: bool,

    /// Infon holding the entity type.
    pub type_infon: String,

    /// Infons holding database identifiers. A key that names a database
    /// (e.g. `MESH`) is used as the database for bare ids.
    pub identifier_infons: Vec<String>,

    /// Database assumed for bare ids under a generic key like `identifier`.
    pub default_db_name: Option<String>,
}

impl Default for BiocOptions {
    fn default() -> Self {
        Self {
            local_offsets: false,
            type_infon: "type".to_string(),
            identifier_infons: vec![
                "identifier".to_string(),
                "Identifier".to_string(),
                "MESH".to_string(),
                "NCBI Gene".to_string(),
            ],
            default_db_name: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BiocDocument {
    pub id: String,
    pub infons: BTreeMap<String, String>,
    pub passages: Vec<BiocPassage>,
    /// Document-level relations.
    pub relations: Vec<BiocRelation>,
}

impl BiocDocument {
    /// Every annotation of every passage, in document order.
    pub fn annotations(&self) -> impl Iterator<Item = &BiocAnnotation> {
        self.passages.iter().flat_map(|p| p.annotations.iter())
    }

    /// Every relation, passage-level first.
    pub fn all_relations(&self) -> impl Iterator<Item = &BiocRelation> {
        self.passages
            .iter()
            .flat_map(|p| p.relations.iter())
            .chain(self.relations.iter())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BiocPassage {
    pub infons: BTreeMap<String, String>,
    /// Document-level character offset of the passage text.
    pub offset: usize,
    pub text: String,
    pub annotations: Vec<BiocAnnotation>,
    pub relations: Vec<BiocRelation>,
}

impl BiocPassage {
    /// Passage type from the `type` infon, or `passage`.
    pub fn kind(&self) -> &str {
        self.infons
            .get("type")
            .map(String::as_str)
            .unwrap_or("passage")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BiocAnnotation {
    pub id: String,
    pub infons: BTreeMap<String, String>,
    /// Document-level spans, one per `<location>`.
    pub locations: Vec<Span>,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BiocRelation {
    pub id: String,
    pub infons: BTreeMap<String, String>,
    pub nodes: Vec<BiocNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiocNode {
    pub refid: String,
    pub role: String,
}

/// Reads a BioC XML file, or every `.xml` file below a directory.
pub fn read_bioc_xml(
    path: &Path,
    opts: &BiocOptions,
    report: &mut ProjectionReport,
) -> Result<Vec<BiocDocument>, BigbioError> {
    let files = collect_xml_files(path)?;
    let mut documents = Vec::new();
    for file in files {
        debug!(path = %file.display(), "reading BioC XML");
        let xml = fs::read_to_string(&file).map_err(BigbioError::Io)?;
        documents.extend(parse_bioc_xml_str(&xml, &file, opts, report)?);
    }
    Ok(documents)
}

/// Parses BioC XML from a UTF-8 string.
///
/// Useful for testing and fuzzing without file I/O.
pub fn from_bioc_xml_str(
    xml: &str,
    opts: &BiocOptions,
    report: &mut ProjectionReport,
) -> Result<Vec<BiocDocument>, BigbioError> {
    parse_bioc_xml_str(xml, Path::new("<memory>"), opts, report)
}

/// Parses BioC XML from bytes.
///
/// The input must be valid UTF-8.
pub fn from_bioc_xml_slice(
    bytes: &[u8],
    opts: &BiocOptions,
    report: &mut ProjectionReport,
) -> Result<Vec<BiocDocument>, BigbioError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| BigbioError::BiocXmlParse {
        path: PathBuf::from("<memory>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    from_bioc_xml_str(xml, opts, report)
}

fn parse_bioc_xml_str(
    xml: &str,
    path: &Path,
    opts: &BiocOptions,
    report: &mut ProjectionReport,
) -> Result<Vec<BiocDocument>, BigbioError> {
    let document = roxmltree::Document::parse(xml).map_err(|source| BigbioError::BiocXmlParse {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;

    let collection = document.root_element();
    if collection.tag_name().name() != "collection" {
        return Err(BigbioError::BiocXmlParse {
            path: path.to_path_buf(),
            message: "missing <collection> root element".to_string(),
        });
    }

    child_elements(collection, "document")
        .map(|node| parse_document(node, path, opts, report))
        .collect()
}

fn parse_document(
    node: Node<'_, '_>,
    path: &Path,
    opts: &BiocOptions,
    report: &mut ProjectionReport,
) -> Result<BiocDocument, BigbioError> {
    let id = optional_child_text(node, "id").ok_or_else(|| BigbioError::BiocXmlParse {
        path: path.to_path_buf(),
        message: "missing <id> in <document>".to_string(),
    })?;

    let mut passages = Vec::new();
    for passage_node in child_elements(node, "passage") {
        passages.extend(parse_passage(passage_node, &id, path, opts, report)?);
    }

    let relations = child_elements(node, "relation")
        .map(parse_relation)
        .collect();

    Ok(BiocDocument {
        infons: parse_infons(node),
        id,
        passages,
        relations,
    })
}

fn parse_passage(
    node: Node<'_, '_>,
    document_id: &str,
    path: &Path,
    opts: &BiocOptions,
    report: &mut ProjectionReport,
) -> Result<Vec<BiocPassage>, BigbioError> {
    let infons = parse_infons(node);
    let offset = parse_offset(node, path, "<passage>")?;
    let text = child_element(node, "text").and_then(|t| t.text());

    let mut sentences = Vec::new();
    for sentence_node in child_elements(node, "sentence") {
        let sentence_offset = parse_offset(sentence_node, path, "<sentence>")?;
        let mut sentence_infons = parse_infons(sentence_node);
        sentence_infons
            .entry("type".to_string())
            .or_insert_with(|| "sentence".to_string());
        sentences.push(BiocPassage {
            infons: sentence_infons,
            offset: sentence_offset,
            text: child_element(sentence_node, "text")
                .and_then(|t| t.text())
                .unwrap_or_default()
                .to_string(),
            annotations: parse_annotations(
                sentence_node,
                sentence_offset,
                document_id,
                opts,
                report,
            ),
            relations: child_elements(sentence_node, "relation")
                .map(parse_relation)
                .collect(),
        });
    }

    let mut passage = BiocPassage {
        infons,
        offset,
        text: text.unwrap_or_default().to_string(),
        annotations: parse_annotations(node, offset, document_id, opts, report),
        relations: child_elements(node, "relation")
            .map(parse_relation)
            .collect(),
    };

    if text.is_none() && !sentences.is_empty() {
        if !passage.annotations.is_empty() || !passage.relations.is_empty() {
            // Passage-level annotations stay with the first sentence.
            sentences[0].annotations.append(&mut passage.annotations);
            sentences[0].relations.append(&mut passage.relations);
        }
        return Ok(sentences);
    }

    for sentence in sentences {
        passage.annotations.extend(sentence.annotations);
        passage.relations.extend(sentence.relations);
    }
    Ok(vec![passage])
}

fn parse_annotations(
    node: Node<'_, '_>,
    base_offset: usize,
    document_id: &str,
    opts: &BiocOptions,
    report: &mut ProjectionReport,
) -> Vec<BiocAnnotation> {
    let shift = if opts.local_offsets { base_offset } else { 0 };

    let mut annotations = Vec::new();
    for annotation in child_elements(node, "annotation") {
        let id = annotation.attribute("id").unwrap_or_default().to_string();
        match parse_locations(annotation, shift) {
            Ok(locations) => annotations.push(BiocAnnotation {
                infons: parse_infons(annotation),
                text: child_element(annotation, "text")
                    .and_then(|t| t.text())
                    .unwrap_or_default()
                    .to_string(),
                id,
                locations,
            }),
            Err(message) => {
                warn!(
                    document = document_id,
                    annotation = %id,
                    "skipping BioC annotation: {}",
                    message
                );
                report.add(
                    ProjectionIssue::warning(
                        ProjectionIssueCode::MalformedLine,
                        format!("annotation '{}': {}", id, message),
                    )
                    .in_document(document_id),
                );
            }
        }
    }
    annotations
}

fn parse_locations(annotation: Node<'_, '_>, shift: usize) -> Result<Vec<Span>, String> {
    let mut locations = Vec::new();
    for location in child_elements(annotation, "location") {
        let offset = parse_usize_attr(location, "offset")?;
        let length = parse_usize_attr(location, "length")?;
        let start = offset
            .checked_add(shift)
            .ok_or_else(|| "location overflows".to_string())?;
        let end = start
            .checked_add(length)
            .ok_or_else(|| "location overflows".to_string())?;
        locations.push(Span::new(start, end));
    }
    if locations.is_empty() {
        return Err("no <location>".to_string());
    }
    locations.sort();
    Ok(locations)
}

fn parse_usize_attr(node: Node<'_, '_>, name: &str) -> Result<usize, String> {
    let raw = node
        .attribute(name)
        .ok_or_else(|| format!("<location> without '{name}'"))?;
    raw.trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid location {name} '{raw}'"))
}

fn parse_relation(node: Node<'_, '_>) -> BiocRelation {
    BiocRelation {
        id: node.attribute("id").unwrap_or_default().to_string(),
        infons: parse_infons(node),
        nodes: child_elements(node, "node")
            .map(|n| BiocNode {
                refid: n.attribute("refid").unwrap_or_default().to_string(),
                role: n.attribute("role").unwrap_or_default().to_string(),
            })
            .collect(),
    }
}

fn parse_infons(node: Node<'_, '_>) -> BTreeMap<String, String> {
    child_elements(node, "infon")
        .filter_map(|infon| {
            let key = infon.attribute("key")?;
            let value = infon.text().unwrap_or_default().trim();
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

fn parse_offset(node: Node<'_, '_>, path: &Path, context: &str) -> Result<usize, BigbioError> {
    let raw = optional_child_text(node, "offset").unwrap_or_else(|| "0".to_string());
    raw.parse::<usize>()
        .map_err(|_| BigbioError::BiocXmlParse {
            path: path.to_path_buf(),
            message: format!("invalid <offset> value '{raw}' in {context}; expected usize"),
        })
}

fn child_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |child| child.is_element() && child.tag_name().name() == tag)
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn collect_xml_files(path: &Path) -> Result<Vec<PathBuf>, BigbioError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(BigbioError::BiocXmlParse {
            path: path.to_path_buf(),
            message: "path does not exist".to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true) {
        let entry = entry.map_err(|source| BigbioError::BiocXmlParse {
            path: path.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;
        let is_xml = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(BIOC_XML_EXTENSION))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_xml {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<collection>
  <source>PubMed</source>
  <document>
    <id>1000</id>
    <passage>
      <infon key="type">title</infon>
      <offset>0</offset>
      <text>Aspirin and asthma</text>
      <annotation id="T1">
        <infon key="type">Chemical</infon>
        <infon key="identifier">MESH:D001241</infon>
        <location offset="0" length="7"/>
        <text>Aspirin</text>
      </annotation>
    </passage>
    <passage>
      <infon key="type">abstract</infon>
      <offset>19</offset>
      <text>Asthma follows aspirin.</text>
      <annotation id="T2">
        <infon key="type">Disease</infon>
        <location offset="19" length="6"/>
        <text>Asthma</text>
      </annotation>
      <annotation id="T3">
        <infon key="type">Disease</infon>
        <location offset="x" length="6"/>
        <text>broken</text>
      </annotation>
    </passage>
    <relation id="R1">
      <infon key="type">CID</infon>
      <node refid="T1" role="Chemical"/>
      <node refid="T2" role="Disease"/>
    </relation>
  </document>
</collection>"#;

    #[test]
    fn parses_documents_passages_and_relations() {
        let mut report = ProjectionReport::default();
        let docs = from_bioc_xml_str(SAMPLE, &BiocOptions::default(), &mut report).unwrap();

        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.id, "1000");
        assert_eq!(doc.passages.len(), 2);
        assert_eq!(doc.passages[1].kind(), "abstract");
        assert_eq!(doc.passages[1].offset, 19);
        assert_eq!(doc.annotations().count(), 2);
        assert_eq!(doc.relations[0].nodes[1].refid, "T2");
        assert_eq!(report.count(ProjectionIssueCode::MalformedLine), 1);
    }

    #[test]
    fn sentences_are_flattened() {
        let xml = r#"<collection><document><id>d</id>
            <passage><offset>0</offset>
              <sentence><offset>0</offset><text>First one.</text>
                <annotation id="a"><infon key="type">X</infon><location offset="0" length="5"/><text>First</text></annotation>
              </sentence>
              <sentence><offset>11</offset><text>Second one.</text></sentence>
            </passage></document></collection>"#;
        let mut report = ProjectionReport::default();
        let docs = from_bioc_xml_str(xml, &BiocOptions::default(), &mut report).unwrap();

        let passages = &docs[0].passages;
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].kind(), "sentence");
        assert_eq!(passages[1].offset, 11);
        assert_eq!(passages[0].annotations[0].locations, vec![Span::new(0, 5)]);
    }

    #[test]
    fn local_offsets_are_shifted() {
        let xml = r#"<collection><document><id>d</id>
            <passage><offset>100</offset><text>abc def</text>
              <annotation id="a"><location offset="4" length="3"/><text>def</text></annotation>
            </passage></document></collection>"#;
        let opts = BiocOptions {
            local_offsets: true,
            ..Default::default()
        };
        let mut report = ProjectionReport::default();
        let docs = from_bioc_xml_str(xml, &opts, &mut report).unwrap();
        assert_eq!(
            docs[0].passages[0].annotations[0].locations,
            vec![Span::new(104, 107)]
        );
    }

    #[test]
    fn overflowing_location_is_skipped() {
        let xml = r#"<collection><document><id>d</id>
            <passage><offset>0</offset><text>abc def</text>
              <annotation id="a"><location offset="18446744073709551615" length="2"/><text>ab</text></annotation>
              <annotation id="b"><location offset="4" length="3"/><text>def</text></annotation>
            </passage></document></collection>"#;
        let opts = BiocOptions {
            local_offsets: true,
            ..Default::default()
        };
        let mut report = ProjectionReport::default();
        let docs = from_bioc_xml_str(xml, &opts, &mut report).unwrap();

        let annotations = &docs[0].passages[0].annotations;
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].id, "b");
        assert_eq!(report.count(ProjectionIssueCode::MalformedLine), 1);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let mut report = ProjectionReport::default();
        let err = from_bioc_xml_str("<collection><document>", &BiocOptions::default(), &mut report)
            .unwrap_err();
        assert!(matches!(err, BigbioError::BiocXmlParse { .. }));

        let err = from_bioc_xml_str("<corpus/>", &BiocOptions::default(), &mut report).unwrap_err();
        assert!(err.to_string().contains("<collection>"));
    }
}
