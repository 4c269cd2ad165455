//! The canonical bigbio schemas.
//!
//! Every corpus, whatever its on-disk format, is projected into one of these
//! shapes. `bigbio_kb` is the hub for annotation corpora: readers produce a
//! source document, the projector turns it into a [`KbDocument`], and
//! validation and merging operate on that representation only.
//!
//! # Example
//!
//! ```
//! use bigbio::schema::{Entity, KbDocument, Passage, Span};
//!
//! let mut doc = KbDocument::new("0", "PMC123");
//! doc.passages.push(Passage::new("1", "abstract", "Aspirin helps.", Span::new(0, 14)));
//! doc.entities.push(Entity::new("2", "Chemical", "Aspirin", Span::new(0, 7)));
//! assert_eq!(doc.text(), "Aspirin helps.");
//! ```

mod ids;
pub mod io_jsonl;
mod kb;
mod records;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use ids::IdGenerator;
pub use kb::{
    Coreference, Entity, Event, EventArgument, KbDocument, Normalization, Passage, Relation, Span,
    Trigger,
};
pub use records::{EntailmentRecord, PairsRecord, QaRecord, Text2TextRecord, TextRecord};

use crate::error::BigbioError;
use crate::source::SourceDocument;

/// The output schema a corpus is projected into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Schema {
    /// The corpus' own structure.
    Source,
    Kb,
    Qa,
    Pairs,
    Text,
    Text2Text,
    Entailment,
}

impl Schema {
    /// Every schema, in declaration order.
    pub const ALL: [Schema; 7] = [
        Schema::Source,
        Schema::Kb,
        Schema::Qa,
        Schema::Pairs,
        Schema::Text,
        Schema::Text2Text,
        Schema::Entailment,
    ];

    /// Canonical configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Schema::Source => "source",
            Schema::Kb => "bigbio_kb",
            Schema::Qa => "bigbio_qa",
            Schema::Pairs => "bigbio_pairs",
            Schema::Text => "bigbio_text",
            Schema::Text2Text => "bigbio_t2t",
            Schema::Entailment => "bigbio_te",
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Schema {
    type Err = BigbioError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        let short = normalized.strip_prefix("bigbio_").unwrap_or(&normalized);
        match short {
            "source" => Ok(Schema::Source),
            "kb" => Ok(Schema::Kb),
            "qa" => Ok(Schema::Qa),
            "pairs" => Ok(Schema::Pairs),
            "text" => Ok(Schema::Text),
            "t2t" | "text2text" => Ok(Schema::Text2Text),
            "te" | "entailment" => Ok(Schema::Entailment),
            _ => Err(BigbioError::UnknownSchema(raw.to_string())),
        }
    }
}

impl serde::Serialize for Schema {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> serde::Deserialize<'de> for Schema {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One produced record, in whichever schema the projector targets.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Record {
    Source(SourceDocument),
    Kb(KbDocument),
    Qa(QaRecord),
    Pairs(PairsRecord),
    Text(TextRecord),
    Text2Text(Text2TextRecord),
    Entailment(EntailmentRecord),
}

impl Record {
    /// The kb document, if this is a kb record.
    pub fn as_kb(&self) -> Option<&KbDocument> {
        match self {
            Record::Kb(doc) => Some(doc),
            _ => None,
        }
    }
}
