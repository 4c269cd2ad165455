//! Multi-annotator agreement merge.
//!
//! Two `bigbio_kb` projections of the same document (one per annotator) are
//! reduced to the annotations both annotators agree on:
//!
//! - entities: same type and overlapping offsets, matched one-to-one by
//!   decreasing overlap. The longer surface text wins; normalizations are
//!   unioned.
//! - relations: same type between agreed entities.
//! - events: same type, overlapping triggers and the same (role, argument)
//!   multiset, where arguments are agreed entities or agreed events. Nested
//!   events are resolved in rounds until nothing new agrees.
//! - coreferences: clusters are paired one-to-one by the number of agreed
//!   entities they share; the shared part survives when it has at least two.
//!
//! The result does not depend on which annotator is passed first, and every
//! id in it is freshly assigned in a canonical order.

mod interval;

pub use interval::IntervalIndex;

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::error::BigbioError;
use crate::schema::{
    Coreference, Entity, Event, EventArgument, IdGenerator, KbDocument, Normalization, Passage,
    Relation, Span, Trigger,
};

/// Merges two annotators' versions of one document.
///
/// Both sides must describe the same document: equal `document_id` and
/// passages with equal text and offsets.
pub fn merge_documents(
    left: &KbDocument,
    right: &KbDocument,
    ids: &mut IdGenerator,
) -> Result<KbDocument, BigbioError> {
    check_same_document(left, right)?;

    let mut merged = KbDocument::new(ids.next_id(), left.document_id.clone());
    merged.passages = left
        .passages
        .iter()
        .map(|p| Passage {
            id: ids.next_id(),
            ..p.clone()
        })
        .collect();

    let mut left_map: HashMap<&str, String> = HashMap::new();
    let mut right_map: HashMap<&str, String> = HashMap::new();

    merged.entities = merge_entities(left, right, ids, &mut left_map, &mut right_map);
    merged.events = merge_events(left, right, ids, &mut left_map, &mut right_map);
    merged.relations = merge_relations(left, right, ids, &left_map, &right_map);
    merged.coreferences = merge_coreferences(left, right, ids, &left_map, &right_map);

    debug!(
        document = %merged.document_id,
        entities = merged.entities.len(),
        events = merged.events.len(),
        relations = merged.relations.len(),
        coreferences = merged.coreferences.len(),
        "merged annotator documents"
    );
    Ok(merged)
}

/// Merges two corpora document by document, pairing on `document_id`.
///
/// Documents annotated on only one side have no agreed annotations and are
/// left out with a warning.
pub fn merge_corpora(
    left: &[KbDocument],
    right: &[KbDocument],
    ids: &mut IdGenerator,
) -> Result<Vec<KbDocument>, BigbioError> {
    let right_by_id: HashMap<&str, &KbDocument> = right
        .iter()
        .map(|doc| (doc.document_id.as_str(), doc))
        .collect();

    let mut merged = Vec::with_capacity(left.len());
    for doc in left {
        match right_by_id.get(doc.document_id.as_str()) {
            Some(other) => merged.push(merge_documents(doc, other, ids)?),
            None => warn!(
                document = %doc.document_id,
                "document missing from second annotator; skipped"
            ),
        }
    }

    let left_ids: BTreeSet<&str> = left.iter().map(|d| d.document_id.as_str()).collect();
    for doc in right {
        if !left_ids.contains(doc.document_id.as_str()) {
            warn!(document = %doc.document_id, "document missing from first annotator; skipped");
        }
    }

    Ok(merged)
}

fn check_same_document(left: &KbDocument, right: &KbDocument) -> Result<(), BigbioError> {
    let mismatch = |message: String| BigbioError::MergeMismatch {
        left: left.document_id.clone(),
        right: right.document_id.clone(),
        message,
    };

    if left.document_id != right.document_id {
        return Err(mismatch("document ids differ".to_string()));
    }
    if left.passages.len() != right.passages.len() {
        return Err(mismatch(format!(
            "{} vs {} passages",
            left.passages.len(),
            right.passages.len()
        )));
    }
    for (idx, (a, b)) in left.passages.iter().zip(&right.passages).enumerate() {
        if a.text != b.text || a.offsets != b.offsets {
            return Err(mismatch(format!("passage {} differs", idx)));
        }
    }
    Ok(())
}

/// Sum of pairwise overlaps between two (possibly discontinuous) mentions.
fn total_overlap(a: &[Span], b: &[Span]) -> usize {
    a.iter()
        .flat_map(|x| b.iter().map(move |y| x.overlap(y)))
        .fold(0, usize::saturating_add)
}

fn surface_len(text: &[String]) -> usize {
    text.iter().map(|t| t.chars().count()).sum()
}

/// Canonical ordering key of a mention.
type MentionKey<'a> = (&'a [Span], &'a str, &'a [String]);

fn entity_key(entity: &Entity) -> MentionKey<'_> {
    (&entity.offsets, &entity.kind, &entity.text)
}

/// Greedy one-to-one matching. Candidates are `(overlap, left_idx,
/// right_idx)`; ties on overlap are broken by the unordered pair of keys, so
/// swapping the sides yields the same matching.
fn greedy_match<K: Ord>(
    mut candidates: Vec<(usize, usize, usize)>,
    left_key: impl Fn(usize) -> K,
    right_key: impl Fn(usize) -> K,
) -> Vec<(usize, usize)> {
    candidates.sort_by(|&(ov_a, la, ra), &(ov_b, lb, rb)| {
        let pair = |l: usize, r: usize| {
            let (kl, kr) = (left_key(l), right_key(r));
            if kl <= kr {
                (kl, kr)
            } else {
                (kr, kl)
            }
        };
        Reverse(ov_a)
            .cmp(&Reverse(ov_b))
            .then_with(|| pair(la, ra).cmp(&pair(lb, rb)))
    });

    let mut left_used = BTreeSet::new();
    let mut right_used = BTreeSet::new();
    let mut matches = Vec::new();
    for (_, l, r) in candidates {
        if left_used.contains(&l) || right_used.contains(&r) {
            continue;
        }
        left_used.insert(l);
        right_used.insert(r);
        matches.push((l, r));
    }
    matches
}

/// Picks the canonical mention of a matched pair: the longer surface text,
/// then the smaller key.
fn pick_canonical<'a>(
    a: (&'a [String], MentionKey<'a>),
    b: (&'a [String], MentionKey<'a>),
) -> MentionKey<'a> {
    match surface_len(a.0).cmp(&surface_len(b.0)) {
        Ordering::Greater => a.1,
        Ordering::Less => b.1,
        Ordering::Equal => a.1.min(b.1),
    }
}

fn merge_entities<'a>(
    left: &'a KbDocument,
    right: &'a KbDocument,
    ids: &mut IdGenerator,
    left_map: &mut HashMap<&'a str, String>,
    right_map: &mut HashMap<&'a str, String>,
) -> Vec<Entity> {
    let index = IntervalIndex::new(
        right
            .entities
            .iter()
            .enumerate()
            .flat_map(|(idx, e)| e.offsets.iter().map(move |span| (*span, idx)))
            .collect(),
    );

    let mut candidates = Vec::new();
    for (l, entity) in left.entities.iter().enumerate() {
        let mut partners: Vec<usize> = entity
            .offsets
            .iter()
            .flat_map(|span| index.overlapping(*span))
            .collect();
        partners.sort_unstable();
        partners.dedup();
        for r in partners {
            let other = &right.entities[r];
            if other.kind != entity.kind {
                continue;
            }
            let overlap = total_overlap(&entity.offsets, &other.offsets);
            if overlap > 0 {
                candidates.push((overlap, l, r));
            }
        }
    }

    let matches = greedy_match(
        candidates,
        |l| entity_key(&left.entities[l]),
        |r| entity_key(&right.entities[r]),
    );

    let mut agreed: Vec<(Entity, usize, usize)> = matches
        .into_iter()
        .map(|(l, r)| {
            let a = &left.entities[l];
            let b = &right.entities[r];
            let (offsets, kind, text) =
                pick_canonical((&a.text, entity_key(a)), (&b.text, entity_key(b)));
            let normalized: BTreeSet<&Normalization> =
                a.normalized.iter().chain(&b.normalized).collect();
            let entity = Entity {
                id: String::new(),
                kind: kind.to_string(),
                text: text.to_vec(),
                offsets: offsets.to_vec(),
                normalized: normalized.into_iter().cloned().collect(),
            };
            (entity, l, r)
        })
        .collect();

    agreed.sort_by(|(a, ..), (b, ..)| {
        entity_key(a)
            .cmp(&entity_key(b))
            .then_with(|| a.normalized.cmp(&b.normalized))
    });

    agreed
        .into_iter()
        .map(|(mut entity, l, r)| {
            entity.id = ids.next_id();
            left_map.insert(left.entities[l].id.as_str(), entity.id.clone());
            right_map.insert(right.entities[r].id.as_str(), entity.id.clone());
            entity
        })
        .collect()
}

/// Arguments rewritten through an id map, sorted; `None` if any argument
/// points at something that has not been agreed on.
fn mapped_arguments(event: &Event, map: &HashMap<&str, String>) -> Option<Vec<EventArgument>> {
    let mut args = event
        .arguments
        .iter()
        .map(|arg| {
            map.get(arg.ref_id.as_str()).map(|ref_id| EventArgument {
                role: arg.role.clone(),
                ref_id: ref_id.clone(),
            })
        })
        .collect::<Option<Vec<_>>>()?;
    args.sort();
    Some(args)
}

fn merge_events<'a>(
    left: &'a KbDocument,
    right: &'a KbDocument,
    ids: &mut IdGenerator,
    left_map: &mut HashMap<&'a str, String>,
    right_map: &mut HashMap<&'a str, String>,
) -> Vec<Event> {
    let mut left_done = vec![false; left.events.len()];
    let mut right_done = vec![false; right.events.len()];
    // Agreed events carry provisional `#n` ids until all rounds are done.
    let mut agreed: Vec<Event> = Vec::new();

    loop {
        let left_ready: Vec<(usize, Vec<EventArgument>)> = ready_events(left, &left_done, left_map);
        let right_ready: Vec<(usize, Vec<EventArgument>)> =
            ready_events(right, &right_done, right_map);

        let right_args: HashMap<usize, &Vec<EventArgument>> =
            right_ready.iter().map(|(r, args)| (*r, args)).collect();
        let left_args: HashMap<usize, &Vec<EventArgument>> =
            left_ready.iter().map(|(l, args)| (*l, args)).collect();

        let mut candidates = Vec::new();
        for (l, l_args) in &left_ready {
            let a = &left.events[*l];
            for (r, r_args) in &right_ready {
                let b = &right.events[*r];
                if a.kind != b.kind || l_args != r_args {
                    continue;
                }
                let overlap = total_overlap(&a.trigger.offsets, &b.trigger.offsets);
                if overlap > 0 {
                    candidates.push((overlap, *l, *r));
                }
            }
        }

        let matches = greedy_match(
            candidates,
            |l| event_key(&left.events[l], left_args[&l]),
            |r| event_key(&right.events[r], right_args[&r]),
        );
        if matches.is_empty() {
            break;
        }

        let mut round: Vec<(Event, usize, usize)> = matches
            .into_iter()
            .map(|(l, r)| {
                let a = &left.events[l];
                let b = &right.events[r];
                let a_key = (&a.trigger.offsets[..], a.kind.as_str(), &a.trigger.text[..]);
                let b_key = (&b.trigger.offsets[..], b.kind.as_str(), &b.trigger.text[..]);
                let (offsets, kind, text) =
                    pick_canonical((&a.trigger.text, a_key), (&b.trigger.text, b_key));
                let event = Event {
                    id: String::new(),
                    kind: kind.to_string(),
                    trigger: Trigger {
                        text: text.to_vec(),
                        offsets: offsets.to_vec(),
                    },
                    arguments: left_args[&l].clone(),
                };
                (event, l, r)
            })
            .collect();

        round.sort_by(|(a, ..), (b, ..)| {
            (&a.trigger.offsets, &a.kind, &a.trigger.text, &a.arguments).cmp(&(
                &b.trigger.offsets,
                &b.kind,
                &b.trigger.text,
                &b.arguments,
            ))
        });

        for (mut event, l, r) in round {
            event.id = format!("#{}", agreed.len());
            left_done[l] = true;
            right_done[r] = true;
            left_map.insert(left.events[l].id.as_str(), event.id.clone());
            right_map.insert(right.events[r].id.as_str(), event.id.clone());
            agreed.push(event);
        }
    }

    // Replace provisional ids with fresh ones, in agreement order.
    let final_ids: HashMap<String, String> = agreed
        .iter()
        .map(|event| (event.id.clone(), ids.next_id()))
        .collect();
    let rewrite = |id: &mut String| {
        if let Some(new_id) = final_ids.get(id.as_str()) {
            *id = new_id.clone();
        }
    };
    for event in &mut agreed {
        rewrite(&mut event.id);
        for arg in &mut event.arguments {
            rewrite(&mut arg.ref_id);
        }
    }
    for value in left_map.values_mut().chain(right_map.values_mut()) {
        rewrite(value);
    }

    agreed
}

/// Canonical ordering key of an event with its mapped arguments.
fn event_key<'e>(
    event: &'e Event,
    args: &'e [EventArgument],
) -> (&'e [Span], &'e str, &'e [String], &'e [EventArgument]) {
    (&event.trigger.offsets, &event.kind, &event.trigger.text, args)
}

fn ready_events(
    doc: &KbDocument,
    done: &[bool],
    map: &HashMap<&str, String>,
) -> Vec<(usize, Vec<EventArgument>)> {
    doc.events
        .iter()
        .enumerate()
        .filter(|(idx, _)| !done[*idx])
        .filter_map(|(idx, event)| mapped_arguments(event, map).map(|args| (idx, args)))
        .collect()
}

fn relation_keys(
    doc: &KbDocument,
    map: &HashMap<&str, String>,
) -> BTreeMap<(String, String, String), BTreeSet<Normalization>> {
    let mut keys: BTreeMap<(String, String, String), BTreeSet<Normalization>> = BTreeMap::new();
    for relation in &doc.relations {
        let (Some(arg1), Some(arg2)) = (
            map.get(relation.arg1_id.as_str()),
            map.get(relation.arg2_id.as_str()),
        ) else {
            continue;
        };
        keys.entry((relation.kind.clone(), arg1.clone(), arg2.clone()))
            .or_default()
            .extend(relation.normalized.iter().cloned());
    }
    keys
}

fn merge_relations(
    left: &KbDocument,
    right: &KbDocument,
    ids: &mut IdGenerator,
    left_map: &HashMap<&str, String>,
    right_map: &HashMap<&str, String>,
) -> Vec<Relation> {
    let left_keys = relation_keys(left, left_map);
    let mut right_keys = relation_keys(right, right_map);

    let mut relations = Vec::new();
    for ((kind, arg1, arg2), mut normalized) in left_keys {
        let Some(other) = right_keys.remove(&(kind.clone(), arg1.clone(), arg2.clone())) else {
            continue;
        };
        normalized.extend(other);
        let mut relation = Relation::new(ids.next_id(), kind, arg1, arg2);
        relation.normalized = normalized.into_iter().collect();
        relations.push(relation);
    }
    relations
}

fn merge_coreferences(
    left: &KbDocument,
    right: &KbDocument,
    ids: &mut IdGenerator,
    left_map: &HashMap<&str, String>,
    right_map: &HashMap<&str, String>,
) -> Vec<Coreference> {
    let clusters = |doc: &KbDocument, map: &HashMap<&str, String>| -> Vec<BTreeSet<String>> {
        doc.coreferences
            .iter()
            .map(|c| {
                c.entity_ids
                    .iter()
                    .filter_map(|id| map.get(id.as_str()).cloned())
                    .collect()
            })
            .collect()
    };
    let left_clusters = clusters(left, left_map);
    let right_clusters = clusters(right, right_map);

    let mut candidates = Vec::new();
    for (l, a) in left_clusters.iter().enumerate() {
        for (r, b) in right_clusters.iter().enumerate() {
            let shared = a.intersection(b).count();
            if shared >= 2 {
                candidates.push((shared, l, r));
            }
        }
    }
    let matches = greedy_match(candidates, |l| &left_clusters[l], |r| &right_clusters[r]);

    let agreed: BTreeSet<BTreeSet<String>> = matches
        .into_iter()
        .map(|(l, r)| {
            left_clusters[l]
                .intersection(&right_clusters[r])
                .cloned()
                .collect()
        })
        .collect();

    agreed
        .into_iter()
        .map(|entity_ids| Coreference {
            id: ids.next_id(),
            entity_ids: entity_ids.into_iter().collect(),
        })
        .collect()
}
