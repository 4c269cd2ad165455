#![allow(dead_code)]

use std::collections::BTreeSet;

use bigbio::schema::{
    Coreference, Entity, Event, EventArgument, IdGenerator, KbDocument, Passage, Relation, Span,
    Trigger,
};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const ENTITY_TYPES: [&str; 3] = ["Chemical", "Disease", "Gene"];
pub const RELATION_TYPES: [&str; 2] = ["CID", "Binds"];
pub const EVENT_TYPES: [&str; 2] = ["Expression", "Regulation"];

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_words(max_words: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zé]{1,6}", 1..=max_words)
}

/// Annotation layer over a fixed word sequence, in word indices.
#[derive(Clone, Debug)]
pub struct AnnotationSpec {
    /// (first word, word count, type index, with normalization)
    pub entities: Vec<(usize, usize, usize, bool)>,
    /// (entity index, entity index, type index)
    pub relations: Vec<(usize, usize, usize)>,
    /// (trigger word, type index, theme entity index)
    pub events: Vec<(usize, usize, usize)>,
    /// entity indices
    pub coreferences: Vec<Vec<usize>>,
}

pub fn arb_annotations(max_entities: usize) -> impl Strategy<Value = AnnotationSpec> {
    (
        prop::collection::vec((0usize..64, 1usize..4, 0usize..3, any::<bool>()), 0..=max_entities),
        prop::collection::vec((0usize..64, 0usize..64, 0usize..2), 0..4),
        prop::collection::vec((0usize..64, 0usize..2, 0usize..64), 0..3),
        prop::collection::vec(prop::collection::vec(0usize..64, 2..4), 0..3),
    )
        .prop_map(|(entities, relations, events, coreferences)| AnnotationSpec {
            entities,
            relations,
            events,
            coreferences,
        })
}

/// Character spans of whitespace-joined words.
pub fn word_spans(words: &[String]) -> Vec<Span> {
    let mut spans = Vec::with_capacity(words.len());
    let mut pos = 0;
    for word in words {
        let len = word.chars().count();
        spans.push(Span::new(pos, pos + len));
        pos += len + 1;
    }
    spans
}

/// Builds a consistent document: one passage over the joined words, no
/// duplicate annotations, every reference resolvable.
pub fn build_document(document_id: &str, words: &[String], spec: &AnnotationSpec) -> KbDocument {
    let mut ids = IdGenerator::new();
    let text = words.join(" ");
    let chars: Vec<char> = text.chars().collect();
    let spans = word_spans(words);
    let slice = |span: Span| chars[span.start..span.end].iter().collect::<String>();

    let mut doc = KbDocument::new(ids.next_id(), document_id);
    doc.passages.push(Passage::new(
        ids.next_id(),
        "abstract",
        text.clone(),
        Span::new(0, chars.len()),
    ));

    let mut seen = BTreeSet::new();
    for &(first, count, kind, normalized) in &spec.entities {
        let first = first % words.len();
        let last = (first + count - 1).min(words.len() - 1);
        let span = Span::new(spans[first].start, spans[last].end);
        if !seen.insert((span, kind)) {
            continue;
        }
        let mut entity = Entity::new(ids.next_id(), ENTITY_TYPES[kind], slice(span), span);
        if normalized {
            entity = entity.with_normalization("MESH", format!("D{:06}", first));
        }
        doc.entities.push(entity);
    }

    if !doc.entities.is_empty() {
        let n = doc.entities.len();

        let mut seen = BTreeSet::new();
        for &(trigger, kind, theme) in &spec.events {
            let span = spans[trigger % words.len()];
            let theme = doc.entities[theme % n].id.clone();
            if !seen.insert((span, kind, theme.clone())) {
                continue;
            }
            doc.events.push(Event {
                id: ids.next_id(),
                kind: EVENT_TYPES[kind].to_string(),
                trigger: Trigger {
                    text: vec![slice(span)],
                    offsets: vec![span],
                },
                arguments: vec![EventArgument {
                    role: "Theme".to_string(),
                    ref_id: theme,
                }],
            });
        }

        let mut seen = BTreeSet::new();
        for &(a, b, kind) in &spec.relations {
            let (a, b) = (a % n, b % n);
            if !seen.insert((a, b, kind)) {
                continue;
            }
            doc.relations.push(Relation::new(
                ids.next_id(),
                RELATION_TYPES[kind],
                doc.entities[a].id.clone(),
                doc.entities[b].id.clone(),
            ));
        }

        let mut seen = BTreeSet::new();
        for members in &spec.coreferences {
            let members: BTreeSet<usize> = members.iter().map(|m| m % n).collect();
            if members.len() < 2 || !seen.insert(members.clone()) {
                continue;
            }
            doc.coreferences.push(Coreference {
                id: ids.next_id(),
                entity_ids: members
                    .iter()
                    .map(|&m| doc.entities[m].id.clone())
                    .collect(),
            });
        }
    }

    doc
}

/// A document and two annotators' views of it.
pub fn arb_annotator_pair(
    max_words: usize,
    max_entities: usize,
) -> impl Strategy<Value = (KbDocument, KbDocument)> {
    (
        arb_words(max_words),
        arb_annotations(max_entities),
        arb_annotations(max_entities),
    )
        .prop_map(|(words, a, b)| {
            (
                build_document("doc", &words, &a),
                build_document("doc", &words, &b),
            )
        })
}

pub fn arb_kb_document(
    max_words: usize,
    max_entities: usize,
) -> impl Strategy<Value = KbDocument> {
    (arb_words(max_words), arb_annotations(max_entities))
        .prop_map(|(words, spec)| build_document("doc", &words, &spec))
}

/// Id-free view of a document's annotations, for comparing documents whose
/// ids were assigned differently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationSemantics {
    pub entities: Vec<(String, Vec<Span>, Vec<String>, Vec<(String, String)>)>,
    pub relations: Vec<(String, Vec<Span>, Vec<Span>)>,
    pub events: Vec<(String, Vec<Span>, Vec<(String, Vec<Span>)>)>,
    pub coreferences: Vec<Vec<Vec<Span>>>,
}

pub fn annotation_semantics(doc: &KbDocument) -> AnnotationSemantics {
    let offsets_of = |id: &str| -> Vec<Span> {
        doc.entities
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.offsets.clone())
            .or_else(|| {
                doc.events
                    .iter()
                    .find(|e| e.id == id)
                    .map(|e| e.trigger.offsets.clone())
            })
            .unwrap_or_default()
    };

    let mut entities: Vec<_> = doc
        .entities
        .iter()
        .map(|e| {
            let mut norms: Vec<(String, String)> = e
                .normalized
                .iter()
                .map(|n| (n.db_name.clone(), n.db_id.clone()))
                .collect();
            norms.sort();
            (e.kind.clone(), e.offsets.clone(), e.text.clone(), norms)
        })
        .collect();
    entities.sort();

    let mut relations: Vec<_> = doc
        .relations
        .iter()
        .map(|r| (r.kind.clone(), offsets_of(&r.arg1_id), offsets_of(&r.arg2_id)))
        .collect();
    relations.sort();

    let mut events: Vec<_> = doc
        .events
        .iter()
        .map(|e| {
            let mut args: Vec<_> = e
                .arguments
                .iter()
                .map(|a| (a.role.clone(), offsets_of(&a.ref_id)))
                .collect();
            args.sort();
            (e.kind.clone(), e.trigger.offsets.clone(), args)
        })
        .collect();
    events.sort();

    let mut coreferences: Vec<_> = doc
        .coreferences
        .iter()
        .map(|c| {
            let mut members: Vec<_> = c.entity_ids.iter().map(|id| offsets_of(id)).collect();
            members.sort();
            members
        })
        .collect();
    coreferences.sort();

    AnnotationSemantics {
        entities,
        relations,
        events,
        coreferences,
    }
}
