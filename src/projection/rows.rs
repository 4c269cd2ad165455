//! Delimited rows → record schemas (qa, pairs, text, t2t, te).

use super::{Projector, ProjectionReport};
use crate::error::BigbioError;
use crate::schema::{
    EntailmentRecord, IdGenerator, PairsRecord, QaRecord, Record, Schema, Text2TextRecord,
    TextRecord,
};
use crate::source::io_tabular::{TabularOptions, TabularRow};
use crate::source::SourceDocument;

#[derive(Clone, Debug)]
pub struct RowProjector {
    schema: Schema,
    options: TabularOptions,
}

impl RowProjector {
    pub fn new(schema: Schema, options: TabularOptions) -> Self {
        Self { schema, options }
    }

    fn required<'a>(&self, row: &'a TabularRow, field: &str) -> Result<&'a str, BigbioError> {
        let column = self.options.column(field);
        row.get(column).ok_or_else(|| BigbioError::RowColumnMissing {
            row: row.id.clone(),
            column: column.to_string(),
        })
    }

    fn optional<'a>(&self, row: &'a TabularRow, field: &str) -> Option<&'a str> {
        row.get(self.options.column(field))
    }

    fn document_id(&self, row: &TabularRow) -> String {
        self.optional(row, "document_id")
            .unwrap_or(row.id.as_str())
            .to_string()
    }

    fn project_row(&self, row: &TabularRow, ids: &mut IdGenerator) -> Result<Record, BigbioError> {
        let record = match self.schema {
            Schema::Qa => {
                let choices = self
                    .optional(row, "choices")
                    .map(|raw| self.options.split_list(raw))
                    .unwrap_or_default();
                let kind = self
                    .optional(row, "type")
                    .map(ToOwned::to_owned)
                    .or_else(|| self.options.question_type.clone())
                    .unwrap_or_else(|| {
                        let inferred = if choices.is_empty() {
                            "factoid"
                        } else {
                            "multiple_choice"
                        };
                        inferred.to_string()
                    });
                Record::Qa(QaRecord {
                    id: ids.next_id(),
                    question_id: self
                        .optional(row, "question_id")
                        .unwrap_or(row.id.as_str())
                        .to_string(),
                    document_id: self.document_id(row),
                    question: self.required(row, "question")?.to_string(),
                    kind,
                    choices,
                    context: self.optional(row, "context").unwrap_or_default().to_string(),
                    answer: self.options.split_list(self.required(row, "answer")?),
                })
            }
            Schema::Pairs => Record::Pairs(PairsRecord {
                id: ids.next_id(),
                document_id: self.document_id(row),
                text_1: self.required(row, "text_1")?.to_string(),
                text_2: self.required(row, "text_2")?.to_string(),
                label: self.required(row, "label")?.to_string(),
            }),
            Schema::Text => Record::Text(TextRecord {
                id: ids.next_id(),
                document_id: self.document_id(row),
                text: self.required(row, "text")?.to_string(),
                labels: self.options.split_list(self.required(row, "labels")?),
            }),
            Schema::Text2Text => Record::Text2Text(Text2TextRecord {
                id: ids.next_id(),
                document_id: self.document_id(row),
                text_1: self.required(row, "text_1")?.to_string(),
                text_2: self.required(row, "text_2")?.to_string(),
                text_1_name: self.options.text_1_name.clone(),
                text_2_name: self.options.text_2_name.clone(),
            }),
            Schema::Entailment => Record::Entailment(EntailmentRecord {
                id: ids.next_id(),
                premise: self.required(row, "premise")?.to_string(),
                hypothesis: self.required(row, "hypothesis")?.to_string(),
                label: self.required(row, "label")?.to_string(),
            }),
            Schema::Source | Schema::Kb => {
                return Err(BigbioError::UnsupportedSchema {
                    format: "csv/tsv".to_string(),
                    schema: self.schema.name().to_string(),
                })
            }
        };
        Ok(record)
    }
}

impl Projector for RowProjector {
    fn schema(&self) -> Schema {
        self.schema
    }

    fn project(
        &self,
        document: &SourceDocument,
        ids: &mut IdGenerator,
        _report: &mut ProjectionReport,
    ) -> Result<Vec<Record>, BigbioError> {
        match document {
            SourceDocument::Row(row) => Ok(vec![self.project_row(row, ids)?]),
            other => Err(BigbioError::UnsupportedSchema {
                format: source_kind(other).to_string(),
                schema: self.schema.name().to_string(),
            }),
        }
    }
}

fn source_kind(document: &SourceDocument) -> &'static str {
    match document {
        SourceDocument::Brat(_) => "brat",
        SourceDocument::Bioc(_) => "bioc",
        SourceDocument::PubTator(_) => "pubtator",
        SourceDocument::Conll(_) => "conll",
        SourceDocument::Row(_) => "csv/tsv",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::io_tabular::from_tabular_str;

    fn project(
        schema: Schema,
        options: TabularOptions,
        input: &str,
    ) -> Result<Vec<Record>, BigbioError> {
        let rows = from_tabular_str(input, b',', &options)?;
        let projector = RowProjector::new(schema, options);
        let mut ids = IdGenerator::new();
        let mut report = ProjectionReport::default();
        let mut records = Vec::new();
        for row in rows {
            records.extend(projector.project(&SourceDocument::Row(row), &mut ids, &mut report)?);
        }
        Ok(records)
    }

    #[test]
    fn pairs_use_column_overrides() {
        let mut options = TabularOptions::default();
        options.columns.insert("text_1".into(), "sentence1".into());
        options.columns.insert("text_2".into(), "sentence2".into());
        let records = project(
            Schema::Pairs,
            options,
            "sentence1,sentence2,label\nA is B.,B is A.,equivalent\n",
        )
        .unwrap();

        let Record::Pairs(pair) = &records[0] else {
            panic!("expected a pairs record");
        };
        assert_eq!(pair.id, "0");
        assert_eq!(pair.document_id, "0");
        assert_eq!(pair.text_2, "B is A.");
        assert_eq!(pair.label, "equivalent");
    }

    #[test]
    fn qa_splits_lists_and_infers_type() {
        let records = project(
            Schema::Qa,
            TabularOptions::default(),
            "question,context,answer,choices\nIs it?,ctx,yes,yes|no|maybe\n",
        )
        .unwrap();
        let Record::Qa(qa) = &records[0] else {
            panic!("expected a qa record");
        };
        assert_eq!(qa.kind, "multiple_choice");
        assert_eq!(qa.choices, vec!["yes", "no", "maybe"]);
        assert_eq!(qa.answer, vec!["yes"]);
    }

    #[test]
    fn text_labels_and_entailment() {
        let records = project(
            Schema::Text,
            TabularOptions::default(),
            "text,labels\nsome abstract,A|B\n",
        )
        .unwrap();
        let Record::Text(text) = &records[0] else {
            panic!("expected a text record");
        };
        assert_eq!(text.labels, vec!["A", "B"]);

        let records = project(
            Schema::Entailment,
            TabularOptions::default(),
            "premise,hypothesis,label\np,h,entailment\n",
        )
        .unwrap();
        assert!(matches!(&records[0], Record::Entailment(te) if te.label == "entailment"));
    }

    #[test]
    fn missing_column_names_row_and_column() {
        let err = project(Schema::Pairs, TabularOptions::default(), "text_1,label\na,b\n")
            .unwrap_err();
        match err {
            BigbioError::RowColumnMissing { row, column } => {
                assert_eq!(row, "0");
                assert_eq!(column, "text_2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
