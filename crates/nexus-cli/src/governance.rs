//! Document approval workflow and query log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use nexus_core::{Error, Result};

const MAX_LOGGED_QUERIES: usize = 1000;
const MAX_QUERY_CHARS: usize = 200;
const DEFAULT_REJECTION_REASON: &str = "Not suitable";

/// MD5 digest of an upload, used to spot duplicates
pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        };
        write!(f, "{}", label)
    }
}

/// What the ledger is told about a fresh upload
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub filename: String,
    pub file_type: String,
    pub uploader: String,
    pub checksum: String,
    pub size_bytes: u64,
    pub total_chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceRecord {
    pub filename: String,
    pub file_type: String,
    pub uploader: String,
    pub upload_date: DateTime<Utc>,
    pub status: ApprovalStatus,
    pub approval_date: Option<DateTime<Utc>>,
    pub approver: Option<String>,
    pub rejection_reason: Option<String>,
    pub checksum: String,
    pub size_bytes: u64,
    pub total_chunks: usize,
}

/// A record together with its document id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerDocument {
    pub document_id: String,
    #[serde(flatten)]
    pub record: GovernanceRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub query: String,
    pub user: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceStats {
    pub total_documents: usize,
    pub pending_approval: usize,
    pub approved_documents: usize,
    pub rejected_documents: usize,
    pub total_queries: u64,
    pub active_users: usize,
    pub storage_used_mb: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Counters {
    total_queries: u64,
    total_uploads: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerData {
    documents: BTreeMap<String, GovernanceRecord>,
    queries: Vec<QueryLogEntry>,
    stats: Counters,
    last_updated: DateTime<Utc>,
}

impl LedgerData {
    fn new() -> Self {
        Self {
            documents: BTreeMap::new(),
            queries: Vec::new(),
            stats: Counters::default(),
            last_updated: Utc::now(),
        }
    }
}

/// Governance ledger persisted as one JSON file
pub struct GovernanceLedger {
    data: LedgerData,
    path: Option<PathBuf>,
}

impl GovernanceLedger {
    /// Load the ledger at `path`, starting empty when the file is missing or unreadable
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = if tokio::fs::try_exists(path).await? {
            let content = tokio::fs::read_to_string(path).await?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "governance ledger unreadable, starting fresh");
                LedgerData::new()
            })
        } else {
            LedgerData::new()
        };

        Ok(Self {
            data,
            path: Some(path.to_path_buf()),
        })
    }

    /// A ledger that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            data: LedgerData::new(),
            path: None,
        }
    }

    pub async fn register(&mut self, document_id: &str, upload: DocumentUpload) -> Result<&GovernanceRecord> {
        let record = GovernanceRecord {
            filename: upload.filename,
            file_type: upload.file_type,
            uploader: upload.uploader,
            upload_date: Utc::now(),
            status: ApprovalStatus::Pending,
            approval_date: None,
            approver: None,
            rejection_reason: None,
            checksum: upload.checksum,
            size_bytes: upload.size_bytes,
            total_chunks: upload.total_chunks,
        };

        let previous = self.data.clone();
        self.data.documents.insert(document_id.to_string(), record);
        self.data.stats.total_uploads += 1;
        self.commit(previous).await?;
        info!(document_id, "registered document for approval");
        self.get(document_id)
    }

    pub async fn approve(&mut self, document_id: &str, approver: &str) -> Result<&GovernanceRecord> {
        let previous = self.data.clone();
        let record = self.record_mut(document_id)?;
        record.status = ApprovalStatus::Approved;
        record.approval_date = Some(Utc::now());
        record.approver = Some(approver.to_string());
        record.rejection_reason = None;
        self.commit(previous).await?;
        info!(document_id, approver, "approved document");
        self.get(document_id)
    }

    pub async fn reject(
        &mut self,
        document_id: &str,
        reason: Option<&str>,
        approver: &str,
    ) -> Result<&GovernanceRecord> {
        let previous = self.data.clone();
        let record = self.record_mut(document_id)?;
        record.status = ApprovalStatus::Rejected;
        record.approval_date = Some(Utc::now());
        record.approver = Some(approver.to_string());
        record.rejection_reason = Some(reason.unwrap_or(DEFAULT_REJECTION_REASON).to_string());
        self.commit(previous).await?;
        info!(document_id, approver, "rejected document");
        self.get(document_id)
    }

    /// Record a question; only the most recent entries are kept
    pub async fn log_query(&mut self, query: &str, user: &str) -> Result<()> {
        let previous = self.data.clone();
        self.data.queries.push(QueryLogEntry {
            query: query.chars().take(MAX_QUERY_CHARS).collect(),
            user: user.to_string(),
            timestamp: Utc::now(),
        });
        self.data.stats.total_queries += 1;

        let excess = self.data.queries.len().saturating_sub(MAX_LOGGED_QUERIES);
        if excess > 0 {
            self.data.queries.drain(..excess);
        }
        self.commit(previous).await
    }

    pub fn statistics(&self) -> GovernanceStats {
        let documents = &self.data.documents;
        let count = |status: ApprovalStatus| documents.values().filter(|d| d.status == status).count();
        let users: BTreeSet<&str> = self.data.queries.iter().map(|q| q.user.as_str()).collect();
        let bytes: u64 = documents.values().map(|d| d.size_bytes).sum();
        let megabytes = bytes as f64 / (1024.0 * 1024.0);

        GovernanceStats {
            total_documents: documents.len(),
            pending_approval: count(ApprovalStatus::Pending),
            approved_documents: count(ApprovalStatus::Approved),
            rejected_documents: count(ApprovalStatus::Rejected),
            total_queries: self.data.stats.total_queries,
            active_users: users.len(),
            storage_used_mb: (megabytes * 100.0).round() / 100.0,
        }
    }

    pub fn pending(&self) -> Vec<LedgerDocument> {
        self.collect(|record| record.status == ApprovalStatus::Pending)
    }

    pub fn documents(&self) -> Vec<LedgerDocument> {
        self.collect(|_| true)
    }

    /// Logged queries, oldest first
    pub fn queries(&self) -> &[QueryLogEntry] {
        &self.data.queries
    }

    pub fn get(&self, document_id: &str) -> Result<&GovernanceRecord> {
        self.data
            .documents
            .get(document_id)
            .ok_or_else(|| not_found(document_id))
    }

    pub async fn remove(&mut self, document_id: &str) -> Result<GovernanceRecord> {
        let previous = self.data.clone();
        let record = self
            .data
            .documents
            .remove(document_id)
            .ok_or_else(|| not_found(document_id))?;
        self.commit(previous).await?;
        Ok(record)
    }

    /// Id of an earlier upload with the same content
    pub fn find_by_checksum(&self, checksum: &str) -> Option<&str> {
        self.data
            .documents
            .iter()
            .find(|(_, record)| record.checksum == checksum)
            .map(|(id, _)| id.as_str())
    }

    fn collect(&self, keep: impl Fn(&GovernanceRecord) -> bool) -> Vec<LedgerDocument> {
        self.data
            .documents
            .iter()
            .filter(|(_, record)| keep(record))
            .map(|(id, record)| LedgerDocument {
                document_id: id.clone(),
                record: record.clone(),
            })
            .collect()
    }

    fn record_mut(&mut self, document_id: &str) -> Result<&mut GovernanceRecord> {
        self.data
            .documents
            .get_mut(document_id)
            .ok_or_else(|| not_found(document_id))
    }

    /// Persist the current state, or roll back to `previous` if the write fails
    async fn commit(&mut self, previous: LedgerData) -> Result<()> {
        self.data.last_updated = Utc::now();
        if let Err(e) = self.save().await {
            self.data = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Write to a sibling temp file, then rename over the ledger
    async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&self.data)?;
        let tmp = path.with_extension("json.tmp");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn not_found(document_id: &str) -> Error {
    Error::NotFound(format!("document {}", document_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(filename: &str, content: &[u8], uploader: &str) -> DocumentUpload {
        DocumentUpload {
            filename: filename.to_string(),
            file_type: "pdf".to_string(),
            uploader: uploader.to_string(),
            checksum: checksum(content),
            size_bytes: content.len() as u64,
            total_chunks: 3,
        }
    }

    #[test]
    fn test_checksum_is_md5_hex() {
        assert_eq!(checksum(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[tokio::test]
    async fn test_approval_workflow() {
        let mut ledger = GovernanceLedger::in_memory();
        let record = ledger.register("d1", upload("syllabus.pdf", b"abc", "prof")).await.unwrap();
        assert_eq!(record.status, ApprovalStatus::Pending);
        ledger.register("d2", upload("memo.pdf", b"xyz", "clerk")).await.unwrap();

        let approved = ledger.approve("d1", "dean").await.unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);
        assert_eq!(approved.approver.as_deref(), Some("dean"));
        assert!(approved.approval_date.is_some());

        let rejected = ledger.reject("d2", None, "dean").await.unwrap();
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Not suitable"));

        assert!(ledger.pending().is_empty());
        let stats = ledger.statistics();
        assert_eq!(stats.approved_documents, 1);
        assert_eq!(stats.rejected_documents, 1);
        assert_eq!(stats.pending_approval, 0);
    }

    #[tokio::test]
    async fn test_unknown_document_is_not_found() {
        let mut ledger = GovernanceLedger::in_memory();
        assert!(matches!(ledger.approve("ghost", "dean").await, Err(Error::NotFound(_))));
        assert!(matches!(ledger.reject("ghost", Some("spam"), "dean").await, Err(Error::NotFound(_))));
        assert!(matches!(ledger.remove("ghost").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_query_log_is_truncated_and_bounded() {
        let mut ledger = GovernanceLedger::in_memory();
        ledger.log_query(&"é".repeat(250), "alice").await.unwrap();
        assert_eq!(ledger.queries()[0].query.chars().count(), 200);

        for i in 0..1005 {
            ledger.log_query(&format!("question {}", i), if i % 2 == 0 { "bob" } else { "carol" }).await.unwrap();
        }
        assert_eq!(ledger.queries().len(), 1000);
        assert_eq!(ledger.queries()[999].query, "question 1004");

        let stats = ledger.statistics();
        assert_eq!(stats.total_queries, 1006);
        assert_eq!(stats.active_users, 2);
    }

    #[tokio::test]
    async fn test_find_by_checksum_and_remove() {
        let mut ledger = GovernanceLedger::in_memory();
        ledger.register("d1", upload("a.pdf", b"same bytes", "prof")).await.unwrap();

        assert_eq!(ledger.find_by_checksum(&checksum(b"same bytes")), Some("d1"));
        assert_eq!(ledger.find_by_checksum(&checksum(b"other")), None);

        let removed = ledger.remove("d1").await.unwrap();
        assert_eq!(removed.filename, "a.pdf");
        assert_eq!(ledger.find_by_checksum(&checksum(b"same bytes")), None);
    }

    #[tokio::test]
    async fn test_storage_is_reported_in_megabytes() {
        let mut ledger = GovernanceLedger::in_memory();
        let mut big = upload("scan.pdf", b"", "prof");
        big.size_bytes = 3 * 1024 * 1024 / 2;
        ledger.register("d1", big).await.unwrap();
        assert_eq!(ledger.statistics().storage_used_mb, 1.5);
    }

    #[tokio::test]
    async fn test_ledger_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("governance.json");

        {
            let mut ledger = GovernanceLedger::open(&path).await.unwrap();
            ledger.register("d1", upload("a.pdf", b"abc", "prof")).await.unwrap();
            ledger.log_query("where is the library", "alice").await.unwrap();
        }

        let ledger = GovernanceLedger::open(&path).await.unwrap();
        assert_eq!(ledger.documents().len(), 1);
        assert_eq!(ledger.documents()[0].document_id, "d1");
        assert_eq!(ledger.statistics().total_queries, 1);
    }

    #[tokio::test]
    async fn test_corrupt_ledger_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("governance.json");
        std::fs::write(&path, "{not json").unwrap();

        let ledger = GovernanceLedger::open(&path).await.unwrap();
        assert!(ledger.documents().is_empty());
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("governance.json");

        let mut ledger = GovernanceLedger::open(&path).await.unwrap();
        ledger.register("d1", upload("a.pdf", b"abc", "prof")).await.unwrap();
        ledger.approve("d1", "dean").await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["documents"]["d1"]["status"], "approved");
    }

    #[tokio::test]
    async fn test_failed_write_restores_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("ledger");
        let mut ledger = GovernanceLedger::open(blocked.join("governance.json")).await.unwrap();

        // a plain file where the ledger directory should be
        std::fs::write(&blocked, "").unwrap();

        assert!(ledger.register("d1", upload("a.pdf", b"abc", "prof")).await.is_err());
        assert!(ledger.documents().is_empty());
        assert_eq!(ledger.find_by_checksum(&checksum(b"abc")), None);

        assert!(ledger.log_query("library hours", "alice").await.is_err());
        assert_eq!(ledger.statistics().total_queries, 0);
        assert!(ledger.queries().is_empty());

        std::fs::remove_file(&blocked).unwrap();
        ledger.register("d1", upload("a.pdf", b"abc", "prof")).await.unwrap();
        std::fs::remove_dir_all(&blocked).unwrap();
        std::fs::write(&blocked, "").unwrap();

        assert!(ledger.approve("d1", "dean").await.is_err());
        assert_eq!(ledger.get("d1").unwrap().status, ApprovalStatus::Pending);
        assert!(ledger.reject("d1", None, "dean").await.is_err());
        assert_eq!(ledger.get("d1").unwrap().rejection_reason, None);
        assert!(ledger.remove("d1").await.is_err());
        assert!(ledger.get("d1").is_ok());
    }
}
