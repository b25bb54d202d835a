use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use jizhang_core::{CatalogError, CatalogStore, Subject, SubjectKey};
use tracing::debug;

// ── In-memory store ───────────────────────────────────────────────────────────

/// Process-local catalog. Useful for tests and for running without a database.
#[derive(Default)]
pub struct MemoryCatalog {
    ledgers: Mutex<HashMap<String, Vec<Subject>>>,
    history: Mutex<HashMap<(String, SubjectKey), Vec<String>>>,
    unavailable: AtomicBool,
}

fn poisoned() -> CatalogError {
    CatalogError::Unavailable("catalog lock poisoned".to_string())
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subjects(ledger_id: &str, subjects: Vec<Subject>) -> Self {
        let catalog = Self::new();
        if let Ok(mut ledgers) = catalog.ledgers.lock() {
            ledgers.insert(ledger_id.to_string(), subjects);
        }
        catalog
    }

    pub fn insert_subjects(&self, ledger_id: &str, subjects: Vec<Subject>) -> Result<(), CatalogError> {
        self.ledgers
            .lock()
            .map_err(|_| poisoned())?
            .insert(ledger_id.to_string(), subjects);
        Ok(())
    }

    /// Record a term confirmed for an entry filed under `key`.
    pub fn record_history(&self, ledger_id: &str, key: &SubjectKey, term: &str) -> Result<(), CatalogError> {
        self.history
            .lock()
            .map_err(|_| poisoned())?
            .entry((ledger_id.to_string(), key.clone()))
            .or_default()
            .push(term.to_string());
        Ok(())
    }

    /// Simulate an outage: every call fails with [`CatalogError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), CatalogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CatalogError::Unavailable("memory catalog offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn load_subjects(&self, ledger_id: &str) -> Result<Vec<Subject>, CatalogError> {
        self.check_available()?;
        let ledgers = self.ledgers.lock().map_err(|_| poisoned())?;
        Ok(ledgers.get(ledger_id).cloned().unwrap_or_default())
    }

    async fn update_synonyms(
        &self,
        ledger_id: &str,
        key: &SubjectKey,
        synonyms: &BTreeSet<String>,
        expected_version: i64,
    ) -> Result<bool, CatalogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CatalogError::PersistFailure("memory catalog offline".to_string()));
        }
        let mut ledgers = self.ledgers.lock().map_err(|_| poisoned())?;
        let subject = ledgers
            .get_mut(ledger_id)
            .and_then(|subjects| subjects.iter_mut().find(|s| s.key() == *key))
            .ok_or_else(|| CatalogError::SubjectNotFound(key.clone()))?;

        if subject.version != expected_version {
            return Ok(false);
        }
        subject.synonyms = synonyms.clone();
        subject.version += 1;
        Ok(true)
    }

    async fn history_terms(&self, ledger_id: &str, key: &SubjectKey) -> Result<Vec<String>, CatalogError> {
        self.check_available()?;
        let history = self.history.lock().map_err(|_| poisoned())?;
        Ok(history
            .get(&(ledger_id.to_string(), key.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

// ── Read-through cache ────────────────────────────────────────────────────────

/// Caches `load_subjects` per ledger in front of another store.
///
/// Any synonym write through this wrapper drops the cached ledger, whether or
/// not the write won its compare-and-set. Changes made behind the wrapper's
/// back must be followed by [`CachedCatalog::invalidate`].
///
/// A read that overlapped an invalidation is returned to its caller but not
/// cached: every invalidation bumps `generation` under the write lock, and a
/// fetched list is only stored if the generation it started from still holds.
pub struct CachedCatalog<S> {
    inner: S,
    cache: RwLock<HashMap<String, Vec<Subject>>>,
    generation: AtomicU64,
}

impl<S: CatalogStore> CachedCatalog<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, cache: RwLock::new(HashMap::new()), generation: AtomicU64::new(0) }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn invalidate(&self, ledger_id: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(ledger_id);
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn cached(&self, ledger_id: &str) -> Option<Vec<Subject>> {
        self.cache.read().ok()?.get(ledger_id).cloned()
    }
}

#[async_trait]
impl<S: CatalogStore> CatalogStore for CachedCatalog<S> {
    async fn load_subjects(&self, ledger_id: &str) -> Result<Vec<Subject>, CatalogError> {
        if let Some(subjects) = self.cached(ledger_id) {
            debug!(ledger_id, "catalog cache hit");
            return Ok(subjects);
        }
        let started = self.generation.load(Ordering::SeqCst);
        let subjects = self.inner.load_subjects(ledger_id).await?;
        if let Ok(mut cache) = self.cache.write() {
            if self.generation.load(Ordering::SeqCst) == started {
                cache.insert(ledger_id.to_string(), subjects.clone());
            } else {
                debug!(ledger_id, "catalog changed during read, not caching");
            }
        }
        Ok(subjects)
    }

    async fn update_synonyms(
        &self,
        ledger_id: &str,
        key: &SubjectKey,
        synonyms: &BTreeSet<String>,
        expected_version: i64,
    ) -> Result<bool, CatalogError> {
        let result = self
            .inner
            .update_synonyms(ledger_id, key, synonyms, expected_version)
            .await;
        self.invalidate(ledger_id);
        result
    }

    async fn history_terms(&self, ledger_id: &str, key: &SubjectKey) -> Result<Vec<String>, CatalogError> {
        self.inner.history_terms(ledger_id, key).await
    }
}
