//! The `bigbio_kb` knowledge-base schema.
//!
//! A single document shape unifying passages, entities, relations, events
//! and coreference clusters across every source corpus. All offsets are
//! character offsets into the document text obtained by placing each
//! passage at its offsets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open character range `[start, end)`.
///
/// Serialized as a two-element array (`[start, end]`), the way the bigbio
/// schemas store offsets.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of characters covered (zero for inverted spans).
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns true if `start <= end`.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// Length of the intersection with `other` (zero when disjoint).
    pub fn overlap(&self, other: &Span) -> usize {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        end.saturating_sub(start)
    }

    /// Returns true if the two spans share at least one character.
    #[inline]
    pub fn overlaps(&self, other: &Span) -> bool {
        self.overlap(other) > 0
    }

    /// Shifts the span right by `delta` characters.
    #[inline]
    pub fn shifted(&self, delta: usize) -> Span {
        Span::new(self.start + delta, self.end + delta)
    }
}

impl From<[usize; 2]> for Span {
    fn from([start, end]: [usize; 2]) -> Self {
        Span::new(start, end)
    }
}

impl From<Span> for [usize; 2] {
    fn from(span: Span) -> Self {
        [span.start, span.end]
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Spaces [`KbDocument::text`] may insert beyond the passage text itself.
pub const MAX_TEXT_PADDING: usize = 1 << 20;

/// A `bigbio_kb` document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KbDocument {
    /// Synthetic record id.
    pub id: String,

    /// Identifier of the document in the source corpus (PMID, file stem...).
    pub document_id: String,

    #[serde(default)]
    pub passages: Vec<Passage>,

    #[serde(default)]
    pub entities: Vec<Entity>,

    #[serde(default)]
    pub events: Vec<Event>,

    #[serde(default)]
    pub coreferences: Vec<Coreference>,

    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl KbDocument {
    /// Creates an empty document.
    pub fn new(id: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            ..Default::default()
        }
    }

    /// Reconstructs the full document text by placing every passage at its
    /// offsets. Gaps between passages are filled with spaces.
    ///
    /// Passages whose text and offsets disagree in length are placed as far
    /// as the text reaches; validation reports the mismatch separately.
    /// Padding is bounded by the amount of passage text plus
    /// [`MAX_TEXT_PADDING`]; a passage that would need more is left out, so
    /// its span falls outside the returned text.
    pub fn text(&self) -> String {
        let mut placed: Vec<(Span, &str)> = self
            .passages
            .iter()
            .flat_map(|p| p.offsets.iter().copied().zip(p.text.iter().map(String::as_str)))
            .filter(|(span, _)| span.is_ordered())
            .collect();
        placed.sort_by_key(|(span, _)| (span.start, span.end));

        let mut slack = placed
            .iter()
            .map(|(_, text)| text.chars().count())
            .sum::<usize>()
            .saturating_add(MAX_TEXT_PADDING);

        let mut chars: Vec<char> = Vec::new();
        for (span, text) in placed {
            let end = span.end.max(chars.len());
            let padding = (end - chars.len()).saturating_sub(text.chars().count());
            if padding > slack {
                continue;
            }
            slack -= padding;
            chars.resize(end, ' ');
            for (slot, ch) in chars[span.start..span.end].iter_mut().zip(text.chars()) {
                *slot = ch;
            }
        }
        chars.into_iter().collect()
    }

    /// Distinct entity types in the document.
    pub fn entity_types(&self) -> std::collections::BTreeSet<&str> {
        self.entities.iter().map(|e| e.kind.as_str()).collect()
    }
}

/// A contiguous block of document text (title, abstract, sentence...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub text: Vec<String>,

    pub offsets: Vec<Span>,
}

impl Passage {
    /// Creates a single-span passage.
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        text: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            text: vec![text.into()],
            offsets: vec![span],
        }
    }
}

/// A database reference attached to an entity or relation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Normalization {
    pub db_name: String,
    pub db_id: String,
}

impl Normalization {
    pub fn new(db_name: impl Into<String>, db_id: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            db_id: db_id.into(),
        }
    }
}

/// A typed mention, possibly discontinuous (one text chunk per range).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub text: Vec<String>,

    pub offsets: Vec<Span>,

    #[serde(default)]
    pub normalized: Vec<Normalization>,
}

impl Entity {
    /// Creates a contiguous entity without normalizations.
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        text: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            text: vec![text.into()],
            offsets: vec![span],
            normalized: Vec::new(),
        }
    }

    /// Adds a normalization.
    pub fn with_normalization(
        mut self,
        db_name: impl Into<String>,
        db_id: impl Into<String>,
    ) -> Self {
        self.normalized.push(Normalization::new(db_name, db_id));
        self
    }

    /// Total number of surface characters across all chunks.
    pub fn surface_len(&self) -> usize {
        self.text.iter().map(|t| t.chars().count()).sum()
    }
}

/// The text-bound anchor of an event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub text: Vec<String>,
    pub offsets: Vec<Span>,
}

/// A role-labelled reference from an event to an entity or another event.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventArgument {
    pub role: String,
    pub ref_id: String,
}

/// An n-ary event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub trigger: Trigger,

    #[serde(default)]
    pub arguments: Vec<EventArgument>,
}

/// A set of co-referring entity ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coreference {
    pub id: String,
    pub entity_ids: Vec<String>,
}

/// A typed binary relation between two entities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub arg1_id: String,

    pub arg2_id: String,

    #[serde(default)]
    pub normalized: Vec<Normalization>,
}

impl Relation {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        arg1_id: impl Into<String>,
        arg2_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            arg1_id: arg1_id.into(),
            arg2_id: arg2_id.into(),
            normalized: Vec::new(),
        }
    }
}
