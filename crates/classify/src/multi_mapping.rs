use jizhang_core::{normalize_term, MatchResult, MatchType, Subject};

/// Every subject whose name or synonym is exactly `term` (after normalizing).
///
/// More than one entry means the term is genuinely ambiguous in this catalog.
/// Catalog order is preserved and each subject appears at most once.
pub fn find_ambiguous(term: &str, catalog: &[Subject]) -> Vec<MatchResult> {
    let term = normalize_term(term);
    if term.is_empty() {
        return Vec::new();
    }

    catalog
        .iter()
        .filter_map(|subject| {
            if subject.normalized_name() == term {
                Some(MatchResult::from_subject(
                    subject,
                    1.0,
                    MatchType::InputContainsSubjectName,
                    &subject.sub_name,
                ))
            } else if subject.synonyms.contains(&term) {
                Some(MatchResult::from_subject(subject, 1.0, MatchType::InputContainsSynonym, &term))
            } else {
                None
            }
        })
        .collect()
}
