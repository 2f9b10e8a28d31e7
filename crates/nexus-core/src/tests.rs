//! Snapshot tests for serialized core types

#[cfg(test)]
mod snapshot_tests {
    use crate::{AnswerResult, Language, MetadataFilter, MetadataValue, RagConfig, SourceRef, StoreConfig};
    use insta::{assert_snapshot, assert_yaml_snapshot};

    #[test]
    fn test_config_defaults_snapshot() {
        assert_yaml_snapshot!(RagConfig::default(), @r###"
        chunk_size: 1000
        chunk_overlap: 200
        top_k: 5
        max_context_chars: 4000
        embed_batch_size: 32
        "###);

        assert_yaml_snapshot!(StoreConfig::default(), @r###"
        data_dir: data
        backend: local
        collection: campus_documents
        qdrant_url: "http://localhost:6334"
        "###);
    }

    #[test]
    fn test_answer_json_snapshot() {
        let answer = AnswerResult {
            answer: "La biblioteca abre a las 9.".to_string(),
            sources: vec![SourceRef {
                filename: "handbook.pdf".to_string(),
                page: Some(4),
                chunk_text: "The library opens at 9am....".to_string(),
                relevance_score: 0.5,
            }],
            confidence_score: 0.75,
            language: Language::Spanish,
        };

        assert_snapshot!(serde_json::to_string_pretty(&answer).unwrap(), @r###"
        {
          "answer": "La biblioteca abre a las 9.",
          "sources": [
            {
              "filename": "handbook.pdf",
              "page": 4,
              "chunk_text": "The library opens at 9am....",
              "relevance_score": 0.5
            }
          ],
          "confidence_score": 0.75,
          "language": "es"
        }
        "###);
    }

    #[test]
    fn test_filter_json_snapshot() {
        let filter = MetadataFilter::new()
            .with("file_type", "pdf")
            .with("page", MetadataValue::Integer(3))
            .with("approved", true);

        assert_snapshot!(serde_json::to_string(&filter).unwrap(), @r###"{"conditions":{"approved":true,"file_type":"pdf","page":3}}"###);
    }
}
