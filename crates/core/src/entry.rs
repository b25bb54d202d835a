use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::amount::Amount;
use super::payment::PaymentMethod;
use super::subject::SubjectKey;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("金額必須大於零: {0}")]
    NonPositiveAmount(Amount),
    #[error("科目不可為空")]
    EmptySubject,
    #[error("帳本代號不可為空")]
    EmptyLedger,
}

/// An entry as assembled by the pipeline, before the bookkeeper accepts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnvalidatedEntry {
    pub ledger_id: String,
    pub subject: SubjectKey,
    pub subject_name: String,
    /// The user's own term, when it differs from the subject name.
    pub matched_term: Option<String>,
    pub amount: Amount,
    pub raw_amount: String,
    pub payment_method: PaymentMethod,
    pub remark: String,
    pub user_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedEntry {
    pub ledger_id: String,
    pub subject: SubjectKey,
    pub subject_name: String,
    pub matched_term: Option<String>,
    pub amount: Amount,
    pub raw_amount: String,
    pub payment_method: PaymentMethod,
    pub remark: String,
    pub user_type: String,
}

impl ValidatedEntry {
    pub fn validate(entry: UnvalidatedEntry) -> Result<ValidatedEntry, LedgerError> {
        if entry.ledger_id.trim().is_empty() {
            return Err(LedgerError::EmptyLedger);
        }
        if entry.subject_name.trim().is_empty() {
            return Err(LedgerError::EmptySubject);
        }
        if entry.amount.is_negative() || entry.amount.is_zero() {
            return Err(LedgerError::NonPositiveAmount(entry.amount));
        }

        Ok(ValidatedEntry {
            ledger_id: entry.ledger_id,
            subject: entry.subject,
            subject_name: entry.subject_name,
            matched_term: entry.matched_term,
            amount: entry.amount,
            raw_amount: entry.raw_amount,
            payment_method: entry.payment_method,
            remark: entry.remark,
            user_type: entry.user_type,
        })
    }
}

/// What the bookkeeper returns once an entry is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryReceipt {
    pub id: String,
    pub ledger_id: String,
    pub subject: SubjectKey,
    pub subject_name: String,
    pub amount: Amount,
    pub raw_amount: String,
    pub payment_method: PaymentMethod,
    pub remark: String,
    pub user_type: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(amount: &str) -> UnvalidatedEntry {
        UnvalidatedEntry {
            ledger_id: "user-1".to_string(),
            subject: SubjectKey::new("100", "102"),
            subject_name: "午餐".to_string(),
            matched_term: None,
            amount: Amount::parse(amount).unwrap(),
            raw_amount: amount.to_string(),
            payment_method: PaymentMethod::Card,
            remark: "午餐".to_string(),
            user_type: "J".to_string(),
        }
    }

    #[test]
    fn validate_accepts_positive_amount() {
        let v = ValidatedEntry::validate(entry("120")).unwrap();
        assert_eq!(v.amount, Amount::from_i64(120));
        assert_eq!(v.raw_amount, "120");
    }

    #[test]
    fn validate_rejects_negative_and_zero() {
        assert!(matches!(
            ValidatedEntry::validate(entry("-5")),
            Err(LedgerError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            ValidatedEntry::validate(entry("0")),
            Err(LedgerError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn validate_rejects_blank_subject_and_ledger() {
        let mut e = entry("10");
        e.subject_name = "  ".to_string();
        assert!(matches!(ValidatedEntry::validate(e), Err(LedgerError::EmptySubject)));

        let mut e = entry("10");
        e.ledger_id = String::new();
        assert!(matches!(ValidatedEntry::validate(e), Err(LedgerError::EmptyLedger)));
    }
}
