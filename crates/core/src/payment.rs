use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    CreditCard,
    Transfer,
    MobilePay,
    /// Trailing text that is not in the known vocabulary, kept verbatim.
    Other(String),
    /// Nothing followed the amount.
    Unspecified,
}

/// Recognized spellings, longest first within each method so that
/// `"信用卡"` is tried before shorter tokens.
pub const PAYMENT_ALIASES: &[(&str, PaymentKind)] = &[
    ("現金", PaymentKind::Cash),
    ("现金", PaymentKind::Cash),
    ("cash", PaymentKind::Cash),
    ("信用卡", PaymentKind::CreditCard),
    ("credit card", PaymentKind::CreditCard),
    ("creditcard", PaymentKind::CreditCard),
    ("刷卡", PaymentKind::Card),
    ("card", PaymentKind::Card),
    ("轉帳", PaymentKind::Transfer),
    ("轉賬", PaymentKind::Transfer),
    ("转账", PaymentKind::Transfer),
    ("transfer", PaymentKind::Transfer),
    ("行動支付", PaymentKind::MobilePay),
    ("line pay", PaymentKind::MobilePay),
    ("linepay", PaymentKind::MobilePay),
    ("apple pay", PaymentKind::MobilePay),
    ("街口", PaymentKind::MobilePay),
];

/// Fieldless mirror of the known [`PaymentMethod`] variants, usable in consts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentKind {
    Cash,
    Card,
    CreditCard,
    Transfer,
    MobilePay,
}

impl From<PaymentKind> for PaymentMethod {
    fn from(kind: PaymentKind) -> Self {
        match kind {
            PaymentKind::Cash => PaymentMethod::Cash,
            PaymentKind::Card => PaymentMethod::Card,
            PaymentKind::CreditCard => PaymentMethod::CreditCard,
            PaymentKind::Transfer => PaymentMethod::Transfer,
            PaymentKind::MobilePay => PaymentMethod::MobilePay,
        }
    }
}

impl PaymentMethod {
    /// Resolve the text trailing an amount. Known tokens win; any other
    /// non-empty text is kept as-is; empty text yields [`PaymentMethod::Unspecified`].
    pub fn from_remainder(remainder: &str) -> Self {
        let trimmed = remainder.trim();
        if trimmed.is_empty() {
            return PaymentMethod::Unspecified;
        }
        Self::find_known(trimmed).unwrap_or_else(|| PaymentMethod::Other(trimmed.to_string()))
    }

    /// First known payment token contained in `text`, if any.
    pub fn find_known(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        PAYMENT_ALIASES
            .iter()
            .find(|(alias, _)| lower.contains(alias))
            .map(|(_, kind)| PaymentMethod::from(*kind))
    }

    /// Map a display label (as rendered in a message) back to a method.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed == UNSPECIFIED_LABEL {
            return PaymentMethod::Unspecified;
        }
        PAYMENT_ALIASES
            .iter()
            .find(|(alias, _)| trimmed.eq_ignore_ascii_case(alias))
            .map(|(_, kind)| PaymentMethod::from(*kind))
            .unwrap_or_else(|| PaymentMethod::Other(trimmed.to_string()))
    }
}

pub const UNSPECIFIED_LABEL: &str = "預設";

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Unspecified
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "現金"),
            PaymentMethod::Card => write!(f, "刷卡"),
            PaymentMethod::CreditCard => write!(f, "信用卡"),
            PaymentMethod::Transfer => write!(f, "轉帳"),
            PaymentMethod::MobilePay => write!(f, "行動支付"),
            PaymentMethod::Other(s) => write!(f, "{s}"),
            PaymentMethod::Unspecified => write!(f, "{UNSPECIFIED_LABEL}"),
        }
    }
}
