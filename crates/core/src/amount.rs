use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A signed transaction amount as typed by the user.
///
/// Digit grouping is dropped on parse; keep the raw text alongside when the
/// original format matters for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    /// Parse `"1,200"`, `"-50"`, `"85.5"` and similar. Thousands separators
    /// (ASCII or full-width commas) are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let clean: String = raw
            .trim()
            .chars()
            .filter(|c| *c != ',' && *c != '，')
            .collect();
        if clean.is_empty() {
            return None;
        }
        Decimal::from_str(&clean).ok().map(Amount)
    }

    pub fn from_i64(value: i64) -> Self {
        Amount(Decimal::from(value))
    }

    pub fn zero() -> Self {
        Amount(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
