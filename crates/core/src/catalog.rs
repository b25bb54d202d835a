use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::entry::{EntryReceipt, LedgerError, ValidatedEntry};
use crate::subject::{Subject, SubjectKey};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to persist synonyms: {0}")]
    PersistFailure(String),
    #[error("Subject not found: {0}")]
    SubjectNotFound(SubjectKey),
}

impl CatalogError {
    /// Whether the caller may retry the same operation later.
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Unavailable(_) | CatalogError::PersistFailure(_))
    }
}

/// Per-ledger subject catalog.
///
/// Synonym writes are compare-and-set on [`Subject::version`]: implementations
/// must apply the write only when the stored version still equals
/// `expected_version`, bump the version, and return `Ok(false)` otherwise.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn load_subjects(&self, ledger_id: &str) -> Result<Vec<Subject>, CatalogError>;

    async fn update_synonyms(
        &self,
        ledger_id: &str,
        key: &SubjectKey,
        synonyms: &BTreeSet<String>,
        expected_version: i64,
    ) -> Result<bool, CatalogError>;

    /// Terms previously confirmed for entries filed under `key`.
    async fn history_terms(&self, ledger_id: &str, key: &SubjectKey)
        -> Result<Vec<String>, CatalogError>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BookkeepingError {
    #[error(transparent)]
    Rejected(#[from] LedgerError),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Stores accepted entries and reports back what was written.
#[async_trait]
pub trait Bookkeeper: Send + Sync {
    async fn record_entry(&self, entry: ValidatedEntry) -> Result<EntryReceipt, BookkeepingError>;
}
