use std::collections::BTreeSet;

use jizhang_core::{normalize_term, CatalogError, CatalogStore, SubjectKey, LIST_SEPARATORS};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnAction {
    Updated,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyTerm,
    /// The term reads as a list (`咖啡、蛋糕`), not a single alias.
    ListTerm,
    SameAsSubject,
    AlreadySynonym,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnOutcome {
    pub success: bool,
    pub action: LearnAction,
    pub reason: Option<SkipReason>,
    /// The stored synonym set after this call.
    pub synonyms: BTreeSet<String>,
}

impl LearnOutcome {
    fn skipped(reason: SkipReason, synonyms: BTreeSet<String>) -> Self {
        LearnOutcome { success: true, action: LearnAction::Skipped, reason: Some(reason), synonyms }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LearnError {
    #[error("Invalid subject code: {0}")]
    InvalidCode(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Synonyms for {key} changed concurrently {attempts} times; giving up")]
    Contended { key: SubjectKey, attempts: u32 },
}

impl LearnError {
    /// Whether retrying the same learn later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LearnError::InvalidCode(_) => false,
            LearnError::Catalog(e) => e.is_transient(),
            LearnError::Contended { .. } => true,
        }
    }
}

/// Folds a confirmed term into its subject's synonym set.
///
/// The write is a compare-and-set on the subject version: on conflict the
/// subject is re-read and the union recomputed, up to `max_attempts` times.
/// The stored set is replaced as a whole, never patched.
pub struct SynonymLearner<'a, S: ?Sized> {
    store: &'a S,
    max_attempts: u32,
}

impl<'a, S: CatalogStore + ?Sized> SynonymLearner<'a, S> {
    pub fn new(store: &'a S, max_attempts: u32) -> Self {
        Self { store, max_attempts: max_attempts.max(1) }
    }

    pub async fn learn(
        &self,
        ledger_id: &str,
        term: &str,
        matched_subject_name: &str,
        subject_code: &str,
    ) -> Result<LearnOutcome, LearnError> {
        let term = normalize_term(term);
        if term.is_empty() {
            return Ok(LearnOutcome::skipped(SkipReason::EmptyTerm, BTreeSet::new()));
        }
        if term.contains(LIST_SEPARATORS) {
            debug!(term = %term, "term is a list, nothing to learn");
            return Ok(LearnOutcome::skipped(SkipReason::ListTerm, BTreeSet::new()));
        }
        let subject_name = normalize_term(matched_subject_name);
        if term == subject_name {
            debug!(term = %term, "term equals subject name, nothing to learn");
            return Ok(LearnOutcome::skipped(SkipReason::SameAsSubject, BTreeSet::new()));
        }

        let key: SubjectKey = subject_code.parse().map_err(LearnError::InvalidCode)?;

        for attempt in 1..=self.max_attempts {
            let subjects = self.store.load_subjects(ledger_id).await?;
            let subject = subjects
                .into_iter()
                .find(|s| s.key() == key)
                .ok_or_else(|| CatalogError::SubjectNotFound(key.clone()))?;

            if subject.has_synonym(&term) {
                return Ok(LearnOutcome::skipped(SkipReason::AlreadySynonym, subject.synonyms));
            }

            let history = self.store.history_terms(ledger_id, &key).await?;
            let mut merged = subject.synonyms.clone();
            merged.extend(
                history
                    .iter()
                    .map(|t| normalize_term(t))
                    .filter(|t| {
                        !t.is_empty() && !t.contains(LIST_SEPARATORS) && *t != subject.normalized_name()
                    }),
            );
            merged.insert(term.clone());

            if self
                .store
                .update_synonyms(ledger_id, &key, &merged, subject.version)
                .await?
            {
                info!(ledger_id, subject = %key, term = %term, count = merged.len(), "learned synonym");
                return Ok(LearnOutcome {
                    success: true,
                    action: LearnAction::Updated,
                    reason: None,
                    synonyms: merged,
                });
            }
            debug!(ledger_id, subject = %key, attempt, "synonym write lost a race, retrying");
        }

        warn!(ledger_id, subject = %key, "synonym write abandoned after repeated conflicts");
        Err(LearnError::Contended { key, attempts: self.max_attempts })
    }
}
