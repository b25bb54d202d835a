use chrono::{DateTime, Utc};
use jizhang_core::{
    default_subjects, normalize_term, parse_synonym_list, Amount, EntryReceipt, PaymentMethod, Subject, SubjectKey,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::BTreeSet;
use std::path::Path;

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ledger_id TEXT NOT NULL,
            major_code TEXT NOT NULL,
            major_name TEXT NOT NULL,
            sub_code TEXT NOT NULL,
            sub_name TEXT NOT NULL,
            synonyms TEXT NOT NULL DEFAULT '[]',
            version INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (ledger_id, major_code, sub_code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ledger_entries (
            id TEXT PRIMARY KEY,
            ledger_id TEXT NOT NULL,
            major_code TEXT NOT NULL,
            sub_code TEXT NOT NULL,
            subject_name TEXT NOT NULL,
            matched_term TEXT,
            amount TEXT NOT NULL,
            raw_amount TEXT NOT NULL,
            payment_method TEXT NOT NULL,
            remark TEXT NOT NULL DEFAULT '',
            user_type TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_entries_subject ON ledger_entries (ledger_id, major_code, sub_code)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert the default catalog for `ledger_id`. Existing subjects are left alone.
pub async fn seed_default_subjects(pool: &DbPool, ledger_id: &str) -> Result<(), sqlx::Error> {
    for subject in default_subjects() {
        insert_subject(pool, ledger_id, &subject).await?;
    }
    Ok(())
}

/// Synonyms are stored as a JSON array so that terms containing list
/// separators survive a round trip.
fn encode_synonyms(synonyms: &BTreeSet<String>) -> Result<String, sqlx::Error> {
    serde_json::to_string(synonyms).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// Rows not holding a JSON array are read as a hand-written comma list.
fn decode_synonyms(raw: &str) -> BTreeSet<String> {
    match serde_json::from_str::<BTreeSet<String>>(raw) {
        Ok(set) => set.iter().map(|s| normalize_term(s)).filter(|s| !s.is_empty()).collect(),
        Err(_) => parse_synonym_list(raw),
    }
}

pub async fn insert_subject(pool: &DbPool, ledger_id: &str, subject: &Subject) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO subjects (ledger_id, major_code, major_name, sub_code, sub_name, synonyms) VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(ledger_id)
    .bind(&subject.major_code)
    .bind(&subject.major_name)
    .bind(&subject.sub_code)
    .bind(&subject.sub_name)
    .bind(encode_synonyms(&subject.synonyms)?)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_subjects(pool: &DbPool, ledger_id: &str) -> Result<Vec<Subject>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String, String, String, String, i64)>(
        "SELECT major_code, major_name, sub_code, sub_name, synonyms, version FROM subjects WHERE ledger_id = ? ORDER BY major_code, sub_code"
    )
    .bind(ledger_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Subject {
            major_code: r.0,
            major_name: r.1,
            sub_code: r.2,
            sub_name: r.3,
            synonyms: decode_synonyms(&r.4),
            version: r.5,
        })
        .collect())
}

/// Compare-and-set on `version`. `Ok(None)` when the subject does not exist,
/// `Ok(Some(false))` when another writer got there first.
pub async fn update_subject_synonyms(
    pool: &DbPool,
    ledger_id: &str,
    key: &SubjectKey,
    synonyms: &BTreeSet<String>,
    expected_version: i64,
) -> Result<Option<bool>, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE subjects SET synonyms = ?, version = version + 1 WHERE ledger_id = ? AND major_code = ? AND sub_code = ? AND version = ?"
    )
    .bind(encode_synonyms(synonyms)?)
    .bind(ledger_id)
    .bind(&key.major_code)
    .bind(&key.sub_code)
    .bind(expected_version)
    .execute(pool)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(Some(true));
    }

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM subjects WHERE ledger_id = ? AND major_code = ? AND sub_code = ?",
    )
    .bind(ledger_id)
    .bind(&key.major_code)
    .bind(&key.sub_code)
    .fetch_one(pool)
    .await?;

    Ok(if exists > 0 { Some(false) } else { None })
}

pub async fn get_history_terms(
    pool: &DbPool,
    ledger_id: &str,
    key: &SubjectKey,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT matched_term FROM ledger_entries WHERE ledger_id = ? AND major_code = ? AND sub_code = ? AND matched_term IS NOT NULL AND matched_term != '' ORDER BY matched_term"
    )
    .bind(ledger_id)
    .bind(&key.major_code)
    .bind(&key.sub_code)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone)]
pub struct EntryRecord<'a> {
    pub id: &'a str,
    pub ledger_id: &'a str,
    pub subject: &'a SubjectKey,
    pub subject_name: &'a str,
    pub matched_term: Option<&'a str>,
    pub amount: Amount,
    pub raw_amount: &'a str,
    pub payment_method: &'a PaymentMethod,
    pub remark: &'a str,
    pub user_type: &'a str,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_entry(pool: &DbPool, entry: &EntryRecord<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ledger_entries (id, ledger_id, major_code, sub_code, subject_name, matched_term, amount, raw_amount, payment_method, remark, user_type, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(entry.id)
    .bind(entry.ledger_id)
    .bind(&entry.subject.major_code)
    .bind(&entry.subject.sub_code)
    .bind(entry.subject_name)
    .bind(entry.matched_term)
    .bind(entry.amount.to_string())
    .bind(entry.raw_amount)
    .bind(entry.payment_method.to_string())
    .bind(entry.remark)
    .bind(entry.user_type)
    .bind(entry.created_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

type EntryRow = (String, String, String, String, String, String, String, String, String, String, String);

pub async fn get_entries(pool: &DbPool, ledger_id: &str, limit: i64) -> Result<Vec<EntryReceipt>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EntryRow>(
        "SELECT id, ledger_id, major_code, sub_code, subject_name, amount, raw_amount, payment_method, remark, user_type, created_at FROM ledger_entries WHERE ledger_id = ? ORDER BY created_at DESC LIMIT ?"
    )
    .bind(ledger_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| EntryReceipt {
            id: r.0,
            ledger_id: r.1,
            subject: SubjectKey::new(&r.2, &r.3),
            subject_name: r.4,
            amount: Amount::parse(&r.5).unwrap_or_default(),
            raw_amount: r.6,
            payment_method: PaymentMethod::from_label(&r.7),
            remark: r.8,
            user_type: r.9,
            created_at: DateTime::parse_from_rfc3339(&r.10)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_default(),
        })
        .collect())
}
