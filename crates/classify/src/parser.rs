use jizhang_core::{Amount, ParseError, ParseResult, PartialData, PaymentMethod, UNKNOWN_SUBJECT};

use crate::util::re;

re!(re_number,
    r"(?:[0-9]{1,3}(?:[,，][0-9]{3})+|[0-9]+)(?:\.[0-9]+)?");
re!(re_negative_number,
    r"-(?:[0-9]{1,3}(?:[,，][0-9]{3})+|[0-9]+)(?:\.[0-9]+)?");
re!(re_leading_unit,
    r"^(?i)\s*(?:塊錢|元整|元|塊|块|圓|dollars?)");
re!(re_trailing_currency,
    r"(?i)(?:nt\$|ntd|＄|\$)\s*$");

/// Characters stripped from the edges of a subject or remark.
pub(crate) fn is_separator(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            ',' | '，' | '、' | '。' | '.' | ';' | '；' | ':' | '：' | '-' | '—' | '_' | '~'
                | '/' | '|' | '!' | '！' | '?' | '？' | '(' | ')' | '（' | '）' | '['
                | ']' | '【' | '】' | '+' | '*' | '#' | '@'
        )
}

/// Splits `"{subject} {amount} {payment method}"` style chat input.
pub struct InputParser;

impl InputParser {
    pub fn parse(text: &str) -> Result<ParseResult, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseError::EmptyText { partial: PartialData::default() });
        }

        // Negative amounts are checked before anything else so that the
        // surrounding text survives into the error for the reply message.
        if let Some(err) = Self::detect_negative(text) {
            return Err(err);
        }

        let Some(m) = re_number().find_iter(text).last() else {
            return Err(ParseError::UnrecognizedFormat {
                partial: PartialData {
                    subject: text.to_string(),
                    ..PartialData::default()
                },
            });
        };

        let raw_amount = m.as_str().to_string();
        let Some(amount) = Amount::parse(&raw_amount) else {
            return Err(ParseError::UnrecognizedFormat {
                partial: PartialData {
                    subject: clean_subject(&text[..m.start()]),
                    raw_amount,
                    ..PartialData::default()
                },
            });
        };

        let subject = clean_subject(&text[..m.start()]);
        let payment_method = PaymentMethod::from_remainder(&strip_leading_unit(&text[m.end()..]));

        if subject.is_empty() {
            return Err(ParseError::MissingSubject {
                partial: PartialData {
                    subject: UNKNOWN_SUBJECT.to_string(),
                    amount,
                    raw_amount,
                    payment_method,
                },
            });
        }

        Ok(ParseResult { subject, amount, raw_amount, payment_method })
    }

    /// First `-digits` run not glued to a preceding digit (so `7-11` is left alone).
    /// Everything before the sign becomes the subject.
    fn detect_negative(text: &str) -> Option<ParseError> {
        let m = re_negative_number().find_iter(text).find(|m| {
            !text[..m.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_digit())
        })?;

        // Decided by the sign alone; "-0" is not negative. Digits too long
        // for a Decimal still count, with a zero amount in the partial data.
        if !m.as_str().chars().any(|c| matches!(c, '1'..='9')) {
            return None;
        }
        let amount = Amount::parse(m.as_str()).unwrap_or_default();

        Some(ParseError::NegativeAmount {
            partial: PartialData {
                subject: clean_subject(&text[..m.start()]),
                amount,
                raw_amount: m.as_str().to_string(),
                payment_method: PaymentMethod::from_remainder(&strip_leading_unit(
                    &text[m.end()..],
                )),
            },
        })
    }
}

fn clean_subject(prefix: &str) -> String {
    let without_currency = re_trailing_currency().replace(prefix, "");
    without_currency.trim_matches(is_separator).to_string()
}

fn strip_leading_unit(rest: &str) -> String {
    re_leading_unit().replace(rest, "").trim().to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
