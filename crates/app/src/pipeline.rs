use std::time::Duration;

use chrono::{DateTime, Utc};
use jizhang_classify::{
    format_remark, Failure, InputParser, LearnAction, MessageData, Outcome, RemarkFormatter,
    RenderOptions, RenderedMessage, SynonymLearner,
};
use jizhang_core::{
    normalize_term, Bookkeeper, CatalogStore, ParseResult, UnvalidatedEntry, ValidatedEntry,
};
use tracing::{debug, info, warn};

use crate::context::AppContext;

pub const CATALOG_UNAVAILABLE: &str = "catalog_unavailable";
pub const NO_MATCH: &str = "no_match";
pub const ENTRY_REJECTED: &str = "entry_rejected";
pub const BOOKKEEPING_FAILED: &str = "bookkeeping_failed";

impl<S: CatalogStore + Bookkeeper> AppContext<S> {
    /// Run one chat message through parse, classify, record and learn, and
    /// render the reply. Never fails: every error ends in a failure message.
    pub async fn handle_message(&self, ledger_id: &str, text: &str, now: DateTime<Utc>) -> RenderedMessage {
        let outcome = self.process(ledger_id, text, now).await;
        let options = RenderOptions { now, user_type: self.config.user_type.clone() };
        self.formatter.render(&outcome, &self.config.module_code, &options)
    }

    async fn process(&self, ledger_id: &str, text: &str, now: DateTime<Utc>) -> Outcome {
        let parsed = match InputParser::parse(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(ledger_id, kind = e.kind().code(), "parse failed");
                let remark = format_remark(&e.partial().subject, text);
                return Outcome::Failed(Failure::from_parse_error(&e, &remark));
            }
        };
        let remark = RemarkFormatter::format(&parsed, text);

        let timeout = Duration::from_millis(self.config.catalog_timeout_ms);
        let subjects = match tokio::time::timeout(timeout, self.catalog.load_subjects(ledger_id)).await {
            Ok(Ok(subjects)) => subjects,
            Ok(Err(e)) => {
                warn!(ledger_id, error = %e, "catalog read failed");
                return failed(&parsed, &remark, "科目資料暫時無法讀取，請稍後再試", CATALOG_UNAVAILABLE);
            }
            Err(_) => {
                warn!(ledger_id, timeout_ms = self.config.catalog_timeout_ms, "catalog read timed out");
                return failed(&parsed, &remark, "科目資料暫時無法讀取，請稍後再試", CATALOG_UNAVAILABLE);
            }
        };

        let Some(classification) = self.classifier.classify(&parsed.subject, &subjects, now.timestamp_millis())
        else {
            info!(ledger_id, term = %parsed.subject, "no subject matched");
            let reason = format!("找不到符合的科目：{}", parsed.subject);
            return failed(&parsed, &remark, &reason, NO_MATCH);
        };
        let matched = &classification.result;
        info!(
            ledger_id,
            term = %parsed.subject,
            subject = %matched.sub_name,
            match_type = %matched.match_type,
            confidence = classification.confidence,
            "classified"
        );

        let term = normalize_term(&parsed.subject);
        let learnable = term != normalize_term(&matched.sub_name);
        let entry = UnvalidatedEntry {
            ledger_id: ledger_id.to_string(),
            subject: matched.key(),
            subject_name: matched.sub_name.clone(),
            matched_term: learnable.then(|| term.clone()),
            amount: parsed.amount,
            raw_amount: parsed.raw_amount.clone(),
            payment_method: parsed.payment_method.clone(),
            remark: remark.clone(),
            user_type: self.config.user_type.clone().unwrap_or_default(),
        };
        let validated = match ValidatedEntry::validate(entry) {
            Ok(v) => v,
            Err(e) => return failed(&parsed, &remark, &e.to_string(), ENTRY_REJECTED),
        };
        let receipt = match self.bookkeeper().record_entry(validated).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(ledger_id, error = %e, "recording entry failed");
                return failed(&parsed, &remark, &e.to_string(), BOOKKEEPING_FAILED);
            }
        };

        if learnable {
            // The entry is already recorded; learning may only degrade, never block the reply.
            let learner = SynonymLearner::new(&self.catalog, self.config.policy.learn_max_attempts);
            let matched_key = matched.key().to_string();
            let learning = learner.learn(ledger_id, &term, &matched.sub_name, &matched_key);
            match tokio::time::timeout(timeout, learning).await {
                Ok(Ok(outcome)) if outcome.action == LearnAction::Updated => {
                    debug!(ledger_id, term = %term, "synonym learned")
                }
                Ok(Ok(outcome)) => debug!(ledger_id, term = %term, reason = ?outcome.reason, "learning skipped"),
                Ok(Err(e)) => {
                    warn!(ledger_id, term = %term, error = %e, transient = e.is_transient(), "learning skipped")
                }
                Err(_) => warn!(
                    ledger_id,
                    term = %term,
                    timeout_ms = self.config.catalog_timeout_ms,
                    "learning skipped, catalog timed out"
                ),
            }
        }

        Outcome::Recorded(receipt)
    }
}

fn failed(parsed: &ParseResult, remark: &str, error: &str, error_type: &str) -> Outcome {
    Outcome::Failed(Failure {
        data: MessageData::from_parsed(parsed, remark),
        error: error.to_string(),
        error_type: error_type.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use jizhang_core::{
        BookkeepingError, CatalogError, EntryReceipt, Subject, SubjectKey,
    };
    use jizhang_storage::{create_db, get_entries, seed_default_subjects, SqliteStore};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    const LEDGER: &str = "u1";

    /// SQLite store that can be made slow or unable to write synonyms.
    #[derive(Default)]
    struct Faults {
        read_delay: Option<Duration>,
        history_delay: Option<Duration>,
        fail_synonym_writes: bool,
    }

    struct TestStore {
        inner: SqliteStore,
        faults: Faults,
    }

    #[async_trait]
    impl CatalogStore for TestStore {
        async fn load_subjects(&self, ledger_id: &str) -> Result<Vec<Subject>, CatalogError> {
            if let Some(delay) = self.faults.read_delay {
                tokio::time::sleep(delay).await;
            }
            self.inner.load_subjects(ledger_id).await
        }

        async fn update_synonyms(
            &self,
            ledger_id: &str,
            key: &SubjectKey,
            synonyms: &BTreeSet<String>,
            expected_version: i64,
        ) -> Result<bool, CatalogError> {
            if self.faults.fail_synonym_writes {
                return Err(CatalogError::PersistFailure("disk full".to_string()));
            }
            self.inner.update_synonyms(ledger_id, key, synonyms, expected_version).await
        }

        async fn history_terms(&self, ledger_id: &str, key: &SubjectKey) -> Result<Vec<String>, CatalogError> {
            if let Some(delay) = self.faults.history_delay {
                tokio::time::sleep(delay).await;
            }
            self.inner.history_terms(ledger_id, key).await
        }
    }

    #[async_trait]
    impl Bookkeeper for TestStore {
        async fn record_entry(&self, entry: ValidatedEntry) -> Result<EntryReceipt, BookkeepingError> {
            self.inner.record_entry(entry).await
        }
    }

    async fn context(faults: Faults) -> (TempDir, AppContext<TestStore>) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("ledger.db")).await.unwrap();
        seed_default_subjects(&pool, LEDGER).await.unwrap();
        let store = TestStore { inner: SqliteStore::new(pool), faults };
        let config = Config { user_type: Some("J".to_string()), catalog_timeout_ms: 50, ..Config::default() };
        (dir, AppContext::new(store, config))
    }

    fn noon() -> DateTime<Utc> {
        // 12:30 in UTC+8
        Utc.with_ymd_and_hms(2026, 10, 19, 4, 30, 0).unwrap()
    }

    async fn subject(ctx: &AppContext<TestStore>, code: &str) -> Subject {
        let key: SubjectKey = code.parse().unwrap();
        ctx.catalog
            .load_subjects(LEDGER)
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.key() == key)
            .unwrap()
    }

    #[tokio::test]
    async fn compound_term_is_recorded_and_learned() {
        let (_dir, ctx) = context(Faults::default()).await;
        let reply = ctx.handle_message(LEDGER, "家鄉便當 85 現金", noon()).await;

        assert!(reply.success, "{}", reply.message);
        assert_eq!(reply.partial_data.subject, "便當");
        assert_eq!(reply.partial_data.amount, "85");
        assert_eq!(reply.partial_data.payment_method, "現金");
        assert_eq!(reply.partial_data.remark, "家鄉便當");
        assert_eq!(reply.partial_data.user_type, "J");
        assert!(reply.message.starts_with("記帳成功！"));
        assert!(reply.message.contains("備註：家鄉便當"));

        let stored = get_entries(ctx.bookkeeper().inner.pool(), LEDGER, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].subject, SubjectKey::new("100", "107"));

        assert!(subject(&ctx, "100-107").await.has_synonym("家鄉便當"));
    }

    #[tokio::test]
    async fn learned_synonym_is_used_next_time() {
        let (_dir, ctx) = context(Faults::default()).await;
        ctx.handle_message(LEDGER, "家鄉便當 85", noon()).await;
        let before = subject(&ctx, "100-107").await.version;

        let reply = ctx.handle_message(LEDGER, "家鄉便當 90", noon()).await;
        assert!(reply.success);
        assert_eq!(reply.partial_data.subject, "便當");
        assert_eq!(reply.partial_data.payment_method, "預設");
        // already a synonym, nothing written
        assert_eq!(subject(&ctx, "100-107").await.version, before);
    }

    #[tokio::test]
    async fn exact_subject_name_is_not_learned() {
        let (_dir, ctx) = context(Faults::default()).await;
        let reply = ctx.handle_message(LEDGER, "午餐 120 刷卡", noon()).await;
        assert!(reply.success);
        assert_eq!(reply.partial_data.remark, "午餐");
        assert_eq!(subject(&ctx, "100-102").await.version, 0);
    }

    #[tokio::test]
    async fn negative_amount_echoes_partial_data() {
        let (_dir, ctx) = context(Faults::default()).await;
        let reply = ctx.handle_message(LEDGER, "午餐-50", noon()).await;
        assert!(!reply.success);
        assert_eq!(reply.error_type.as_deref(), Some("negative_amount"));
        assert_eq!(reply.partial_data.subject, "午餐");
        assert_eq!(reply.partial_data.amount, "-50");
        assert!(reply.message.starts_with("記帳失敗！"));
        assert!(reply.message.contains("錯誤原因："));
    }

    #[tokio::test]
    async fn unmatched_term_is_a_failure_message() {
        let (_dir, ctx) = context(Faults::default()).await;
        let reply = ctx.handle_message(LEDGER, "qwxz 30", noon()).await;
        assert!(!reply.success);
        assert_eq!(reply.error_type.as_deref(), Some(NO_MATCH));
        assert_eq!(reply.partial_data.subject, "qwxz");
        assert_eq!(reply.partial_data.amount, "30");
    }

    #[tokio::test]
    async fn slow_catalog_times_out_without_recording() {
        let (_dir, ctx) = context(Faults { read_delay: Some(Duration::from_millis(500)), ..Faults::default() }).await;
        let reply = ctx.handle_message(LEDGER, "咖啡 65", noon()).await;
        assert!(!reply.success);
        assert_eq!(reply.error_type.as_deref(), Some(CATALOG_UNAVAILABLE));
        assert_eq!(reply.partial_data.subject, "咖啡");

        let stored = get_entries(ctx.bookkeeper().inner.pool(), LEDGER, 10).await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn failed_learning_still_records_entry() {
        let (_dir, ctx) = context(Faults { fail_synonym_writes: true, ..Faults::default() }).await;
        let reply = ctx.handle_message(LEDGER, "星巴克咖啡 150 信用卡", noon()).await;
        assert!(reply.success, "{}", reply.message);
        assert_eq!(reply.partial_data.subject, "咖啡");
        assert_eq!(reply.partial_data.payment_method, "信用卡");
        assert!(!subject(&ctx, "100-106").await.has_synonym("星巴克咖啡"));
    }

    #[tokio::test]
    async fn stalled_learning_still_replies() {
        let (_dir, ctx) = context(Faults { history_delay: Some(Duration::from_secs(3600)), ..Faults::default() }).await;
        let reply = tokio::time::timeout(
            Duration::from_secs(5),
            ctx.handle_message(LEDGER, "家鄉便當 85 現金", noon()),
        )
        .await
        .expect("reply must not wait on learning");
        assert!(reply.success, "{}", reply.message);
        assert_eq!(reply.partial_data.subject, "便當");

        let stored = get_entries(ctx.bookkeeper().inner.pool(), LEDGER, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!subject(&ctx, "100-107").await.has_synonym("家鄉便當"));
    }

    #[tokio::test]
    async fn listed_items_do_not_pollute_catalog() {
        let (_dir, ctx) = context(Faults::default()).await;
        let before = subject(&ctx, "100-106").await;

        for _ in 0..2 {
            let reply = ctx.handle_message(LEDGER, "咖啡、蛋糕 200", noon()).await;
            assert!(reply.success, "{}", reply.message);
            assert_eq!(reply.partial_data.subject, "咖啡");
        }

        let after = subject(&ctx, "100-106").await;
        assert_eq!(after.synonyms, before.synonyms);
        assert_eq!(after.version, before.version);

        let reply = ctx.handle_message(LEDGER, "蛋糕 80", noon()).await;
        assert_ne!(reply.partial_data.subject, "咖啡");
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let (_dir, ctx) = context(Faults::default()).await;
        let reply = ctx.handle_message(LEDGER, "   ", noon()).await;
        assert!(!reply.success);
        assert_eq!(reply.error_type.as_deref(), Some("empty_text"));
        assert_eq!(reply.partial_data.amount, "0");
    }
}
