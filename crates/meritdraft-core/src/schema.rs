/// Arrow schema definitions for the legal knowledge base.
pub mod legal {
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    use crate::chunk::EMBEDDING_DIM;

    pub const LEGAL_CHUNKS_TABLE: &str = "legal_chunks";

    /// Schema for embedded legal text chunks.
    pub fn legal_chunks_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("chunk_text", DataType::Utf8, false),
            Field::new("source_type", DataType::Utf8, false),
            Field::new("source_document", DataType::Utf8, true),
            Field::new(
                "regulatory_citation",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                true,
            ),
            Field::new("case_citation", DataType::Utf8, true),
            Field::new("appeal_citation", DataType::Utf8, true),
            Field::new("criterion_tag", DataType::Utf8, true),
            Field::new("legal_standard", DataType::Utf8, true),
            Field::new("legal_test", DataType::Utf8, true),
            Field::new("is_winning_argument", DataType::Boolean, false),
            Field::new("is_holding", DataType::Boolean, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    EMBEDDING_DIM as i32,
                ),
                false,
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::legal;
    use arrow::datatypes::DataType;

    #[test]
    fn legal_chunks_schema_has_expected_fields() {
        let schema = legal::legal_chunks_schema();
        assert_eq!(schema.fields().len(), 13);
        assert!(schema.field_with_name("criterion_tag").unwrap().is_nullable());
        assert!(!schema.field_with_name("is_holding").unwrap().is_nullable());
    }

    #[test]
    fn embedding_column_is_fixed_size() {
        let schema = legal::legal_chunks_schema();
        let field = schema.field_with_name("embedding").unwrap();
        assert!(matches!(field.data_type(), DataType::FixedSizeList(_, 768)));
    }
}
