//! Snapshot tests for terminal rendering

#[cfg(test)]
mod snapshot_tests {
    use crate::{
        GovernanceStats, format_answer, format_documents, format_governance_stats, format_health,
        format_languages, format_stats,
    };
    use insta::assert_snapshot;
    use nexus_core::{AnswerResult, Language, ServiceHealth, SourceRef};
    use nexus_rag::{AskResponse, HealthReport, IndexedDocument};
    use serde_json::json;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_answer_snapshot() {
        plain();
        let response = AskResponse {
            result: AnswerResult {
                answer: "Hall B is on the second floor.".to_string(),
                sources: vec![SourceRef {
                    filename: "exams.pdf".to_string(),
                    page: Some(2),
                    chunk_text: "Hall B,\nsecond floor....".to_string(),
                    relevance_score: 0.9,
                }],
                confidence_score: 0.8,
                language: Language::English,
            },
            processing_time_secs: 1.234,
        };

        assert_snapshot!(format_answer(&response), @r###"
        Hall B is on the second floor.

        Confidence: 80%  (1.23s, English)
        Sources:
          1. exams.pdf, page 2 (relevance 0.90)
             Hall B, second floor....
        "###);
    }

    #[test]
    fn test_health_snapshot() {
        plain();
        let report = HealthReport {
            llm: ServiceHealth::Ready,
            embedding: ServiceHealth::Unavailable("model all-minilm is not pulled".to_string()),
            index: ServiceHealth::Ready,
        };

        assert_snapshot!(format_health(&report), @r###"
        System: degraded
          LLM        connected
          Embedding  disconnected (model all-minilm is not pulled)
          Index      connected
        "###);
    }

    #[test]
    fn test_documents_snapshot() {
        plain();
        let documents = vec![
            IndexedDocument {
                document_id: "0b7c".to_string(),
                filename: "orientation.pptx".to_string(),
                file_type: "pptx".to_string(),
                total_pages: Some(12),
                chunks: 9,
            },
            IndexedDocument {
                document_id: "5f21".to_string(),
                filename: "rules.docx".to_string(),
                file_type: "docx".to_string(),
                total_pages: None,
                chunks: 3,
            },
        ];

        assert_snapshot!(format_documents(&documents), @r###"
        0b7c  orientation.pptx (pptx, 9 chunks, 12 pages)
        5f21  rules.docx (docx, 3 chunks)
        "###);
        assert_snapshot!(format_documents(&[]), @"No documents indexed yet.");
    }

    #[test]
    fn test_stats_snapshot() {
        plain();
        let stats = json!({
            "chunk_size": 1000,
            "chunk_overlap": 200,
            "embedding_model": "all-minilm",
        });

        assert_snapshot!(format_stats(&stats), @r###"
        chunk_overlap:     200
        chunk_size:        1000
        embedding_model:   all-minilm
        "###);
    }

    #[test]
    fn test_governance_stats_snapshot() {
        plain();
        let stats = GovernanceStats {
            total_documents: 4,
            pending_approval: 1,
            approved_documents: 2,
            rejected_documents: 1,
            total_queries: 37,
            active_users: 5,
            storage_used_mb: 2.5,
        };

        assert_snapshot!(format_governance_stats(&stats), @r###"
        Total documents:   4
        Pending approval:  1
        Approved:          2
        Rejected:          1
        Total queries:     37
        Active users:      5
        Storage used:      2.50 MB
        "###);
    }

    #[test]
    fn test_languages_snapshot() {
        plain();
        assert_snapshot!(format_languages(), @r###"
        en  English
        hi  Hindi
        es  Spanish
        fr  French
        de  German
        "###);
    }
}
