use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::Amount;
use crate::payment::PaymentMethod;

/// Placeholder subject echoed back when the user typed only an amount.
pub const UNKNOWN_SUBJECT: &str = "未知科目";

/// A successfully split utterance: `{subject} {amount} {payment method}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub subject: String,
    pub amount: Amount,
    /// Amount exactly as typed (keeps grouping, sign and leading zeros).
    pub raw_amount: String,
    pub payment_method: PaymentMethod,
}

/// Best-effort fields recovered from input that failed to parse, kept so the
/// failure message can still echo what the user typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialData {
    pub subject: String,
    pub amount: Amount,
    pub raw_amount: String,
    pub payment_method: PaymentMethod,
}

impl From<ParseResult> for PartialData {
    fn from(p: ParseResult) -> Self {
        PartialData {
            subject: p.subject,
            amount: p.amount,
            raw_amount: p.raw_amount,
            payment_method: p.payment_method,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    EmptyText,
    NegativeAmount,
    MissingSubject,
    UnrecognizedFormat,
}

impl ParseErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ParseErrorKind::EmptyText => "empty_text",
            ParseErrorKind::NegativeAmount => "negative_amount",
            ParseErrorKind::MissingSubject => "missing_subject",
            ParseErrorKind::UnrecognizedFormat => "unrecognized_format",
        }
    }
}

/// Terminal parse failure. Every variant carries whatever could be recovered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("訊息內容為空")]
    EmptyText { partial: PartialData },
    #[error("金額不可為負數")]
    NegativeAmount { partial: PartialData },
    #[error("缺少科目名稱")]
    MissingSubject { partial: PartialData },
    #[error("無法辨識的格式，請輸入「科目 金額 付款方式」")]
    UnrecognizedFormat { partial: PartialData },
}

impl ParseError {
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            ParseError::EmptyText { .. } => ParseErrorKind::EmptyText,
            ParseError::NegativeAmount { .. } => ParseErrorKind::NegativeAmount,
            ParseError::MissingSubject { .. } => ParseErrorKind::MissingSubject,
            ParseError::UnrecognizedFormat { .. } => ParseErrorKind::UnrecognizedFormat,
        }
    }

    pub fn partial(&self) -> &PartialData {
        match self {
            ParseError::EmptyText { partial }
            | ParseError::NegativeAmount { partial }
            | ParseError::MissingSubject { partial }
            | ParseError::UnrecognizedFormat { partial } => partial,
        }
    }
}
