use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use jizhang_core::{
    BookkeepingError, Bookkeeper, CatalogError, CatalogStore, EntryReceipt, Subject, SubjectKey,
    ValidatedEntry,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{self, DbPool, EntryRecord};

/// SQLite-backed catalog and ledger. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn load_subjects(&self, ledger_id: &str) -> Result<Vec<Subject>, CatalogError> {
        db::get_subjects(&self.pool, ledger_id)
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))
    }

    async fn update_synonyms(
        &self,
        ledger_id: &str,
        key: &SubjectKey,
        synonyms: &BTreeSet<String>,
        expected_version: i64,
    ) -> Result<bool, CatalogError> {
        match db::update_subject_synonyms(&self.pool, ledger_id, key, synonyms, expected_version).await {
            Ok(Some(applied)) => {
                if !applied {
                    debug!(ledger_id, subject = %key, expected_version, "stale synonym write");
                }
                Ok(applied)
            }
            Ok(None) => Err(CatalogError::SubjectNotFound(key.clone())),
            Err(e) => {
                warn!(ledger_id, subject = %key, error = %e, "synonym write failed");
                Err(CatalogError::PersistFailure(e.to_string()))
            }
        }
    }

    async fn history_terms(&self, ledger_id: &str, key: &SubjectKey) -> Result<Vec<String>, CatalogError> {
        db::get_history_terms(&self.pool, ledger_id, key)
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl Bookkeeper for SqliteStore {
    async fn record_entry(&self, entry: ValidatedEntry) -> Result<EntryReceipt, BookkeepingError> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        let record = EntryRecord {
            id: &id,
            ledger_id: &entry.ledger_id,
            subject: &entry.subject,
            subject_name: &entry.subject_name,
            matched_term: entry.matched_term.as_deref(),
            amount: entry.amount,
            raw_amount: &entry.raw_amount,
            payment_method: &entry.payment_method,
            remark: &entry.remark,
            user_type: &entry.user_type,
            created_at,
        };
        db::insert_entry(&self.pool, &record)
            .await
            .map_err(|e| BookkeepingError::Storage(e.to_string()))?;

        Ok(EntryReceipt {
            id,
            ledger_id: entry.ledger_id,
            subject: entry.subject,
            subject_name: entry.subject_name,
            amount: entry.amount,
            raw_amount: entry.raw_amount,
            payment_method: entry.payment_method,
            remark: entry.remark,
            user_type: entry.user_type,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_db, get_entries, seed_default_subjects};
    use jizhang_core::{Amount, PaymentMethod};
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("ledger.db")).await.unwrap();
        seed_default_subjects(&pool, "u1").await.unwrap();
        (dir, SqliteStore::new(pool))
    }

    fn coffee() -> SubjectKey {
        SubjectKey::new("100", "106")
    }

    fn entry(term: Option<&str>) -> ValidatedEntry {
        ValidatedEntry {
            ledger_id: "u1".to_string(),
            subject: coffee(),
            subject_name: "咖啡".to_string(),
            matched_term: term.map(str::to_string),
            amount: Amount::from_i64(65),
            raw_amount: "65".to_string(),
            payment_method: PaymentMethod::Cash,
            remark: "拿鐵".to_string(),
            user_type: "J".to_string(),
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let (_dir, store) = store().await;
        seed_default_subjects(store.pool(), "u1").await.unwrap();
        let subjects = store.load_subjects("u1").await.unwrap();
        assert_eq!(subjects.len(), jizhang_core::DEFAULT_SUBJECTS.len());
        assert!(store.load_subjects("someone-else").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn synonyms_round_trip_as_a_set() {
        let (_dir, store) = store().await;
        let subject = store
            .load_subjects("u1")
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.key() == coffee())
            .unwrap();
        assert!(subject.has_synonym("coffee"));
        assert_eq!(subject.version, 0);
    }

    #[tokio::test]
    async fn update_is_compare_and_set() {
        let (_dir, store) = store().await;
        let set: BTreeSet<String> = ["coffee", "星巴克"].iter().map(|s| s.to_string()).collect();

        assert!(store.update_synonyms("u1", &coffee(), &set, 0).await.unwrap());
        // same expected version again: someone already moved it to 1
        assert!(!store.update_synonyms("u1", &coffee(), &set, 0).await.unwrap());

        let subject = store
            .load_subjects("u1")
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.key() == coffee())
            .unwrap();
        assert_eq!(subject.version, 1);
        assert_eq!(subject.synonyms, set);
    }

    #[tokio::test]
    async fn synonyms_with_list_separators_survive_reload() {
        let (_dir, store) = store().await;
        let set: BTreeSet<String> =
            ["coffee", "咖啡、蛋糕", "a,b", "拿鐵"].iter().map(|s| s.to_string()).collect();
        assert!(store.update_synonyms("u1", &coffee(), &set, 0).await.unwrap());

        let subject = store
            .load_subjects("u1")
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.key() == coffee())
            .unwrap();
        assert_eq!(subject.synonyms, set);
        assert!(!subject.has_synonym("蛋糕"));
    }

    #[tokio::test]
    async fn legacy_comma_list_rows_are_still_read() {
        let (_dir, store) = store().await;
        sqlx::query("UPDATE subjects SET synonyms = 'Coffee,星巴克' WHERE ledger_id = 'u1' AND sub_code = '106'")
            .execute(store.pool())
            .await
            .unwrap();
        let subject = store
            .load_subjects("u1")
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.key() == coffee())
            .unwrap();
        assert!(subject.has_synonym("coffee"));
        assert!(subject.has_synonym("星巴克"));
    }

    #[tokio::test]
    async fn update_unknown_subject_is_not_found() {
        let (_dir, store) = store().await;
        let err = store
            .update_synonyms("u1", &SubjectKey::new("999", "999"), &BTreeSet::new(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::SubjectNotFound(_)));
    }

    #[tokio::test]
    async fn recorded_entries_feed_history_terms() {
        let (_dir, store) = store().await;
        let receipt = store.record_entry(entry(Some("路易莎"))).await.unwrap();
        store.record_entry(entry(Some("路易莎"))).await.unwrap();
        store.record_entry(entry(None)).await.unwrap();

        assert_eq!(receipt.amount, Amount::from_i64(65));
        assert_eq!(
            store.history_terms("u1", &coffee()).await.unwrap(),
            vec!["路易莎".to_string()]
        );

        let stored = get_entries(store.pool(), "u1", 10).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().any(|e| e.id == receipt.id));
        assert_eq!(stored[0].payment_method, PaymentMethod::Cash);
    }
}
