use jizhang_core::payment::PAYMENT_ALIASES;
use jizhang_core::ParseResult;

use crate::parser::is_separator;
use crate::util::re;

re!(re_amount_with_unit,
    r"(?i)(?:nt\$|ntd|＄|\$)?\s*-?[0-9][0-9,，]*(?:\.[0-9]+)?\s*(?:塊錢|元整|元|塊|块|圓|dollars?)?");
re!(re_payment_token, {
    let alternation = PAYMENT_ALIASES
        .iter()
        .map(|(alias, _)| regex::escape(alias))
        .collect::<Vec<_>>()
        .join("|");
    format!("(?i)(?:{alternation})")
});
re!(re_currency_glyph, r"(?i)nt\$|ntd|＄|\$");
re!(re_whitespace, r"\s+");

/// Build the remark stored with an entry from the user's raw message.
///
/// Amounts, payment tokens and currency glyphs are removed. A residue that is
/// empty, a single character, or just the subject again degenerates to the
/// subject.
pub fn format_remark(subject: &str, original_text: &str) -> String {
    let text = re_amount_with_unit().replace_all(original_text, " ");
    let text = re_payment_token().replace_all(&text, " ");
    let text = re_currency_glyph().replace_all(&text, " ");
    let text = re_whitespace().replace_all(&text, " ");
    let residue = text.trim_matches(is_separator);

    let subject = subject.trim();
    let uninformative = residue.is_empty()
        || residue.chars().count() == 1
        || residue.to_lowercase() == subject.to_lowercase();

    if uninformative && !subject.is_empty() {
        subject.to_string()
    } else {
        residue.to_string()
    }
}

pub struct RemarkFormatter;

impl RemarkFormatter {
    pub fn format(parsed: &ParseResult, original_text: &str) -> String {
        format_remark(&parsed.subject, original_text)
    }
}
