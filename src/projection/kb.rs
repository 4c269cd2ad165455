//! Source → `bigbio_kb` projection.
//!
//! Source ids (`T1`, `E3`, BioC annotation ids...) are never carried over.
//! Every kb object gets a fresh id from the caller's [`IdGenerator`], and
//! references are rewritten through a per-document lookup table. Objects are
//! numbered in dependency order (document, passages, entities, events,
//! relations, coreferences), so an id always exists before anything points
//! at it.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::{Projector, ProjectionIssue, ProjectionIssueCode, ProjectionReport};
use crate::error::BigbioError;
use crate::offsets::{
    char_len, split_discontinuous_text, CharIndex, MentionLocator, PassageCursor, TokenOffsets,
};
use crate::schema::{
    Coreference, Entity, Event, EventArgument, IdGenerator, KbDocument, Normalization, Passage,
    Record, Relation, Schema, Span, Trigger,
};
use crate::source::io_bioc_xml::{BiocAnnotation, BiocDocument, BiocOptions};
use crate::source::io_brat::BratDocument;
use crate::source::io_conll::ConllDocument;
use crate::source::io_pubtator::{PubTatorDocument, PubTatorOptions};
use crate::source::normalize::{canonical_db_name, parse_db_ids};
use crate::source::{SourceDocument, SourceOptions};

/// Projects annotation corpora into `bigbio_kb`.
#[derive(Clone, Debug, Default)]
pub struct KbProjector {
    options: SourceOptions,
}

impl KbProjector {
    pub fn new(options: SourceOptions) -> Self {
        Self { options }
    }
}

impl Projector for KbProjector {
    fn schema(&self) -> Schema {
        Schema::Kb
    }

    fn project(
        &self,
        document: &SourceDocument,
        ids: &mut IdGenerator,
        report: &mut ProjectionReport,
    ) -> Result<Vec<Record>, BigbioError> {
        let kb = match document {
            SourceDocument::Brat(doc) => brat_to_kb(doc, ids, report),
            SourceDocument::Bioc(doc) => bioc_to_kb(doc, &self.options.bioc, ids, report),
            SourceDocument::PubTator(doc) => {
                pubtator_to_kb(doc, &self.options.pubtator, ids, report)
            }
            SourceDocument::Conll(doc) => conll_to_kb(doc, ids, report),
            SourceDocument::Row(_) => {
                return Err(BigbioError::UnsupportedSchema {
                    format: "csv/tsv".to_string(),
                    schema: Schema::Kb.name().to_string(),
                })
            }
        };
        Ok(vec![Record::Kb(kb)])
    }

    fn add_policy_notes(&self, report: &mut ProjectionReport) {
        report.add(ProjectionIssue::info(
            ProjectionIssueCode::IdAssignment,
            "kb ids are assigned from a per-split counter; source annotation ids are not kept",
        ));
        if report.format == "brat" && report.input.events > 0 {
            report.add(ProjectionIssue::info(
                ProjectionIssueCode::TriggersAreNotEntities,
                "text-bound annotations used as event triggers become triggers, not entities",
            ));
        }
    }
}

/// BRAT: one passage over the whole text.
///
/// Text-bound annotations that trigger an event become that event's trigger
/// instead of entities. Relations need two entity arguments; equivalence
/// sets become coreferences only when every member is an entity.
pub fn brat_to_kb(
    doc: &BratDocument,
    ids: &mut IdGenerator,
    report: &mut ProjectionReport,
) -> KbDocument {
    let document_id = doc.document_id.as_str();
    let mut kb = KbDocument::new(ids.next_id(), document_id);
    kb.passages.push(Passage::new(
        ids.next_id(),
        "document",
        doc.text.clone(),
        Span::new(0, char_len(&doc.text)),
    ));
    let index = CharIndex::new(&doc.text);

    let trigger_ids: HashSet<&str> = doc.events.iter().map(|e| e.trigger.as_str()).collect();
    let mut entity_ids: HashMap<&str, String> = HashMap::new();
    let mut entity_pos: HashMap<&str, usize> = HashMap::new();

    for tb in &doc.text_bound_annotations {
        if trigger_ids.contains(tb.id.as_str()) {
            continue;
        }
        let entity = Entity {
            id: ids.next_id(),
            kind: tb.kind.clone(),
            text: tb.text.clone(),
            offsets: tb.offsets.clone(),
            normalized: Vec::new(),
        };
        check_surface(&index, &entity, document_id, report);
        entity_ids.insert(tb.id.as_str(), entity.id.clone());
        entity_pos.insert(tb.id.as_str(), kb.entities.len());
        kb.entities.push(entity);
    }

    for norm in &doc.normalizations {
        match entity_pos.get(norm.ref_id.as_str()) {
            Some(&pos) => kb.entities[pos].normalized.push(Normalization::new(
                canonical_db_name(&norm.resource_name),
                norm.cuid.clone(),
            )),
            None => dropped(
                report,
                ProjectionIssueCode::NormalizationUnresolved,
                document_id,
                format!("{} targets '{}', which is not an entity", norm.id, norm.ref_id),
            ),
        }
    }

    let mut event_ids: HashMap<&str, String> = HashMap::new();
    let mut kept_events = Vec::with_capacity(doc.events.len());
    for event in &doc.events {
        match doc.text_bound(&event.trigger) {
            Some(trigger) => {
                event_ids.insert(event.id.as_str(), ids.next_id());
                kept_events.push((event, trigger));
            }
            None => dropped(
                report,
                ProjectionIssueCode::EventTriggerMissing,
                document_id,
                format!(
                    "{} has trigger '{}', which is not a text-bound annotation",
                    event.id, event.trigger
                ),
            ),
        }
    }

    for (event, trigger) in kept_events {
        let mut arguments = Vec::with_capacity(event.arguments.len());
        for arg in &event.arguments {
            let target = entity_ids
                .get(arg.ref_id.as_str())
                .or_else(|| event_ids.get(arg.ref_id.as_str()));
            match target {
                Some(ref_id) => arguments.push(EventArgument {
                    role: arg.role.clone(),
                    ref_id: ref_id.clone(),
                }),
                None => dropped(
                    report,
                    ProjectionIssueCode::EventArgUnresolved,
                    document_id,
                    format!(
                        "{} argument {}:{} is neither an entity nor an event",
                        event.id, arg.role, arg.ref_id
                    ),
                ),
            }
        }

        kb.events.push(Event {
            id: event_ids[event.id.as_str()].clone(),
            kind: event.kind.clone(),
            trigger: Trigger {
                text: trigger.text.clone(),
                offsets: trigger.offsets.clone(),
            },
            arguments,
        });
    }

    for relation in &doc.relations {
        let head = entity_ids.get(relation.head.ref_id.as_str());
        let tail = entity_ids.get(relation.tail.ref_id.as_str());
        match (head, tail) {
            (Some(head), Some(tail)) => kb.relations.push(Relation::new(
                ids.next_id(),
                relation.kind.clone(),
                head.clone(),
                tail.clone(),
            )),
            _ => dropped(
                report,
                ProjectionIssueCode::RelationArgNotEntity,
                document_id,
                format!(
                    "{} links {} and {}; both must be entities",
                    relation.id, relation.head.ref_id, relation.tail.ref_id
                ),
            ),
        }
    }

    for equivalence in &doc.equivalences {
        let members: Option<Vec<String>> = equivalence
            .ref_ids
            .iter()
            .map(|ref_id| entity_ids.get(ref_id.as_str()).cloned())
            .collect();
        match members {
            Some(entity_ids) => kb.coreferences.push(Coreference {
                id: ids.next_id(),
                entity_ids,
            }),
            None => dropped(
                report,
                ProjectionIssueCode::CoreferenceNotEntities,
                document_id,
                format!(
                    "equivalence {{{}}} contains non-entities",
                    equivalence.ref_ids.join(", ")
                ),
            ),
        }
    }

    if !doc.attributes.is_empty() || !doc.notes.is_empty() {
        dropped(
            report,
            ProjectionIssueCode::AttributesDropped,
            document_id,
            format!(
                "{} attribute(s) and {} note(s) are not represented",
                doc.attributes.len(),
                doc.notes.len()
            ),
        );
    }

    kb
}

/// BioC: passages at their BioC offsets; annotations become entities and
/// relations need exactly two resolvable nodes.
pub fn bioc_to_kb(
    doc: &BiocDocument,
    opts: &BiocOptions,
    ids: &mut IdGenerator,
    report: &mut ProjectionReport,
) -> KbDocument {
    let document_id = doc.id.as_str();
    let mut kb = KbDocument::new(ids.next_id(), document_id);
    for passage in &doc.passages {
        let Some(end) = passage.offset.checked_add(char_len(&passage.text)) else {
            dropped(
                report,
                ProjectionIssueCode::PassageDropped,
                document_id,
                format!("passage at offset {} overflows", passage.offset),
            );
            continue;
        };
        let span = Span::new(passage.offset, end);
        kb.passages.push(Passage::new(
            ids.next_id(),
            passage.kind(),
            passage.text.clone(),
            span,
        ));
    }

    let text = kb.text();
    let index = CharIndex::new(&text);
    let mut entity_ids: HashMap<&str, String> = HashMap::new();

    for annotation in doc.annotations() {
        let Some(kind) = annotation
            .infons
            .get(&opts.type_infon)
            .filter(|kind| !kind.is_empty())
        else {
            dropped(
                report,
                ProjectionIssueCode::MissingType,
                document_id,
                format!(
                    "annotation '{}' has no '{}' infon",
                    annotation.id, opts.type_infon
                ),
            );
            continue;
        };

        let entity = Entity {
            id: ids.next_id(),
            kind: kind.clone(),
            text: split_discontinuous_text(&annotation.text, &annotation.locations),
            offsets: annotation.locations.clone(),
            normalized: bioc_normalizations(annotation, opts),
        };
        check_surface(&index, &entity, document_id, report);
        if !annotation.id.is_empty() {
            entity_ids.insert(annotation.id.as_str(), entity.id.clone());
        }
        kb.entities.push(entity);
    }

    for relation in doc.all_relations() {
        let kind = relation
            .infons
            .get("type")
            .or_else(|| relation.infons.get("relation"))
            .filter(|kind| !kind.is_empty());
        let args: Option<Vec<&String>> = relation
            .nodes
            .iter()
            .map(|node| entity_ids.get(node.refid.as_str()))
            .collect();

        match (kind, args.as_deref()) {
            (Some(kind), Some([arg1, arg2])) => kb.relations.push(Relation::new(
                ids.next_id(),
                kind.clone(),
                arg1.to_string(),
                arg2.to_string(),
            )),
            _ => dropped(
                report,
                ProjectionIssueCode::RelationUnresolved,
                document_id,
                format!(
                    "relation '{}' needs a type and two nodes that point at annotations",
                    relation.id
                ),
            ),
        }
    }

    kb
}

fn bioc_normalizations(annotation: &BiocAnnotation, opts: &BiocOptions) -> Vec<Normalization> {
    let mut normalized: Vec<Normalization> = Vec::new();
    for key in &opts.identifier_infons {
        let Some(value) = annotation.infons.get(key) else {
            continue;
        };
        let default_db = if key.eq_ignore_ascii_case("identifier") {
            opts.default_db_name.as_deref()
        } else {
            Some(key.as_str())
        };
        for norm in parse_db_ids(value, default_db) {
            if !normalized.contains(&norm) {
                normalized.push(norm);
            }
        }
    }
    normalized
}

/// PubTator: title and abstract passages laid out by the running cursor.
///
/// Mentions whose offsets do not reproduce their text are searched for near
/// the stated position; those that cannot be found are dropped. Relation
/// rows name concepts, and link the first mention normalized to each.
pub fn pubtator_to_kb(
    doc: &PubTatorDocument,
    opts: &PubTatorOptions,
    ids: &mut IdGenerator,
    report: &mut ProjectionReport,
) -> KbDocument {
    let document_id = doc.pmid.as_str();
    let default_db = opts.default_db_name.as_deref();
    let mut kb = KbDocument::new(ids.next_id(), document_id);

    let mut cursor = PassageCursor::new();
    let title_span = cursor.push(&doc.title);
    kb.passages.push(Passage::new(ids.next_id(), "title", doc.title.clone(), title_span));
    let abstract_span = cursor.push(&doc.abstract_text);
    kb.passages.push(Passage::new(
        ids.next_id(),
        "abstract",
        doc.abstract_text.clone(),
        abstract_span,
    ));

    let text = doc.text();
    let index = CharIndex::new(&text);
    let mut locator = MentionLocator::new(&text);

    let verified: Vec<bool> = doc
        .mentions
        .iter()
        .map(|m| index.slice(m.offsets) == Some(m.text.as_str()))
        .collect();
    for (mention, ok) in doc.mentions.iter().zip(&verified) {
        if *ok {
            locator.consume(mention.offsets);
        }
    }

    let mut concept_entity: HashMap<Normalization, String> = HashMap::new();
    for (mention, ok) in doc.mentions.iter().zip(verified) {
        let span = if ok {
            mention.offsets
        } else {
            match locator.locate(&mention.text, Some(mention.offsets.start)) {
                Some(span) => {
                    relocated(report, document_id, &mention.text, mention.offsets, span);
                    span
                }
                None => {
                    dropped(
                        report,
                        ProjectionIssueCode::EntityDropped,
                        document_id,
                        format!(
                            "'{}' at {} does not occur in the text",
                            mention.text, mention.offsets
                        ),
                    );
                    continue;
                }
            }
        };

        let entity = Entity {
            id: ids.next_id(),
            kind: mention.kind.clone(),
            text: vec![mention.text.clone()],
            offsets: vec![span],
            normalized: parse_db_ids(&mention.concept_ids, default_db),
        };
        for norm in &entity.normalized {
            concept_entity
                .entry(norm.clone())
                .or_insert_with(|| entity.id.clone());
        }
        kb.entities.push(entity);
    }

    let first_mention = |concept: &str| {
        parse_db_ids(concept, default_db)
            .into_iter()
            .find_map(|norm| concept_entity.get(&norm).cloned())
    };
    for relation in &doc.relations {
        match (
            first_mention(&relation.concept_1),
            first_mention(&relation.concept_2),
        ) {
            (Some(arg1), Some(arg2)) => kb.relations.push(Relation::new(
                ids.next_id(),
                relation.kind.clone(),
                arg1,
                arg2,
            )),
            _ => dropped(
                report,
                ProjectionIssueCode::RelationUnresolved,
                document_id,
                format!(
                    "{} {} → {}: a concept has no mention",
                    relation.kind, relation.concept_1, relation.concept_2
                ),
            ),
        }
    }

    kb
}

/// CoNLL: one passage per sentence, entities from the tag column.
///
/// Token spans are translated through a per-sentence [`TokenOffsets`]
/// table; entities over unaligned tokens fall back to a surface search.
pub fn conll_to_kb(
    doc: &ConllDocument,
    ids: &mut IdGenerator,
    report: &mut ProjectionReport,
) -> KbDocument {
    let document_id = doc.document_id.as_str();
    let mut kb = KbDocument::new(ids.next_id(), document_id);

    let mut cursor = PassageCursor::new();
    let mut sentences = Vec::with_capacity(doc.sentences.len());
    for sentence in &doc.sentences {
        let (text, table) = match &sentence.text {
            Some(text) => (text.clone(), TokenOffsets::align(text, &sentence.tokens)),
            None => TokenOffsets::joined(&sentence.tokens),
        };
        let span = cursor.push(&text);
        kb.passages
            .push(Passage::new(ids.next_id(), "sentence", text.clone(), span));
        sentences.push((sentence, span.start, text, table));
    }

    for (sentence, passage_start, text, table) in &sentences {
        let index = CharIndex::new(text);
        let mut locator = MentionLocator::new(text);
        let tag_spans = sentence.tag_spans();

        let resolved: Vec<Option<Span>> = tag_spans
            .iter()
            .map(|tag| table.span(tag.first, tag.last))
            .collect();
        for span in resolved.iter().flatten() {
            locator.consume(*span);
        }

        for (tag, resolved) in tag_spans.iter().zip(resolved) {
            let local = match resolved {
                Some(span) => span,
                None => {
                    let surface = sentence
                        .tokens
                        .get(tag.first..=tag.last)
                        .map(|tokens| tokens.join(" "))
                        .unwrap_or_default();
                    let hint = (0..tag.first)
                        .rev()
                        .find_map(|idx| table.get(idx))
                        .map(|span| span.end);
                    match locator.locate(&surface, hint) {
                        Some(span) => {
                            debug!(
                                document = document_id,
                                surface = %surface,
                                "located entity over unaligned tokens"
                            );
                            span
                        }
                        None => {
                            dropped(
                                report,
                                ProjectionIssueCode::EntityDropped,
                                document_id,
                                format!(
                                    "{} entity over tokens {}..={} ('{}') has no consistent span",
                                    tag.kind, tag.first, tag.last, surface
                                ),
                            );
                            continue;
                        }
                    }
                }
            };

            let surface = index.slice(local).unwrap_or_default();
            kb.entities.push(Entity::new(
                ids.next_id(),
                tag.kind.clone(),
                surface,
                local.shifted(*passage_start),
            ));
        }
    }

    kb
}

fn check_surface(
    index: &CharIndex<'_>,
    entity: &Entity,
    document_id: &str,
    report: &mut ProjectionReport,
) {
    let expected = entity.text.join(" ");
    match index.slice_joined(&entity.offsets) {
        Some(actual) if actual == expected => {}
        actual => {
            let actual = actual.unwrap_or_else(|| "<out of bounds>".to_string());
            warn!(
                document = document_id,
                entity = %entity.id,
                "entity text '{}' differs from text at offsets '{}'",
                expected,
                actual
            );
            report.add(
                ProjectionIssue::warning(
                    ProjectionIssueCode::EntityTextMismatch,
                    format!(
                        "{} '{}' != '{}' at {:?}",
                        entity.kind, expected, actual, entity.offsets
                    ),
                )
                .in_document(document_id),
            );
        }
    }
}

fn dropped(
    report: &mut ProjectionReport,
    code: ProjectionIssueCode,
    document_id: &str,
    message: String,
) {
    warn!(document = document_id, code = ?code, "{}", message);
    report.add(ProjectionIssue::warning(code, message).in_document(document_id));
}

fn relocated(
    report: &mut ProjectionReport,
    document_id: &str,
    surface: &str,
    stated: Span,
    found: Span,
) {
    debug!(document = document_id, surface, "mention relocated");
    report.add(
        ProjectionIssue::info(
            ProjectionIssueCode::EntityRelocated,
            format!("'{}' stated at {} found at {}", surface, stated, found),
        )
        .in_document(document_id),
    );
}
