//! The non-kb bigbio schemas: question answering, text pairs, text
//! classification, text-to-text and entailment.

use serde::{Deserialize, Serialize};

/// A `bigbio_qa` record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    pub id: String,
    pub question_id: String,
    pub document_id: String,
    pub question: String,

    /// Question type, e.g. `yesno`, `multiple_choice`, `extractive`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub choices: Vec<String>,

    pub context: String,

    #[serde(default)]
    pub answer: Vec<String>,
}

/// A `bigbio_pairs` record: two texts and a label.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PairsRecord {
    pub id: String,
    pub document_id: String,
    pub text_1: String,
    pub text_2: String,
    pub label: String,
}

/// A `bigbio_text` (classification) record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    pub id: String,
    pub document_id: String,
    pub text: String,

    #[serde(default)]
    pub labels: Vec<String>,
}

/// A `bigbio_t2t` (text-to-text) record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Text2TextRecord {
    pub id: String,
    pub document_id: String,
    pub text_1: String,
    pub text_2: String,
    pub text_1_name: String,
    pub text_2_name: String,
}

/// A `bigbio_te` (entailment) record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntailmentRecord {
    pub id: String,
    pub premise: String,
    pub hypothesis: String,
    pub label: String,
}
