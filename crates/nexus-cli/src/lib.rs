//! Command-line layer for Campus Nexus
//!
//! Wires the gateways into a [`KnowledgeService`], keeps the document
//! governance ledger and renders results for the terminal.

mod governance;
mod service;
mod ui;

#[cfg(test)]
mod tests;

pub use governance::{
    ApprovalStatus, DocumentUpload, GovernanceLedger, GovernanceRecord, GovernanceStats,
    LedgerDocument, QueryLogEntry, checksum,
};
pub use service::KnowledgeService;
pub use ui::{
    display_banner, format_answer, format_documents, format_governance_stats, format_health,
    format_languages, format_pending, format_stats, handle_input_with_history, print_help,
};

// Re-export core types
pub use nexus_core::{Error, Language, MetadataFilter, Result};
pub use nexus_rag::AskRequest;
