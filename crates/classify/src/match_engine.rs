use jizhang_core::{normalize_term, MatchPolicy, MatchResult, MatchType, Subject};
use tracing::debug;

use crate::util::{char_len, similarity};

/// Resolves a free-text term to one catalog subject.
///
/// Tiers are tried in order and the first tier with any candidate wins:
/// compound containment (term embeds a catalog string), direct containment
/// (a catalog string embeds the term), then Levenshtein similarity.
pub struct MatchEngine {
    policy: MatchPolicy,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(MatchPolicy::default())
    }
}

impl MatchEngine {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Best match using the policy's Levenshtein threshold.
    pub fn find_best_match(&self, term: &str, catalog: &[Subject]) -> Option<MatchResult> {
        self.find_best_match_with_threshold(term, catalog, self.policy.levenshtein_threshold)
    }

    pub fn find_best_match_with_threshold(
        &self,
        term: &str,
        catalog: &[Subject],
        threshold: f64,
    ) -> Option<MatchResult> {
        let term = normalize_term(term);
        if term.is_empty() {
            return None;
        }

        let result = self
            .compound_tier(&term, catalog)
            .or_else(|| self.direct_tier(&term, catalog))
            .or_else(|| self.levenshtein_tier(&term, catalog, threshold));

        match &result {
            Some(m) => debug!(
                term = %term,
                subject = %m.sub_name,
                match_type = %m.match_type,
                score = m.score,
                "matched subject"
            ),
            None => debug!(term = %term, "no subject matched"),
        }
        result
    }

    fn compound_tier(&self, term: &str, catalog: &[Subject]) -> Option<MatchResult> {
        let term_len = char_len(term) as f64;
        let min_len = self.policy.min_contained_len;
        let mut best = None;

        for subject in catalog {
            let name = subject.normalized_name();
            let name_len = char_len(&name);
            if name_len >= min_len && term.contains(name.as_str()) {
                let score = self.policy.compound_name_cap.min(name_len as f64 / term_len);
                keep_higher(
                    &mut best,
                    MatchResult::from_subject(
                        subject,
                        score,
                        MatchType::InputContainsSubjectName,
                        &subject.sub_name,
                    ),
                );
            }

            for synonym in &subject.synonyms {
                let syn_len = char_len(synonym);
                if syn_len >= min_len && term.contains(synonym.as_str()) {
                    let score = self.policy.compound_synonym_cap.min(syn_len as f64 / term_len);
                    keep_higher(
                        &mut best,
                        MatchResult::from_subject(
                            subject,
                            score,
                            MatchType::InputContainsSynonym,
                            synonym,
                        ),
                    );
                }
            }
        }

        best
    }

    /// The term itself is the matched token, so every hit scores its cap.
    /// Ties go to the tightest container, then to catalog order.
    fn direct_tier(&self, term: &str, catalog: &[Subject]) -> Option<MatchResult> {
        let mut best: Option<(MatchResult, usize)> = None;

        let mut consider = |candidate: MatchResult, container_len: usize| {
            let better = match &best {
                None => true,
                Some((current, current_len)) => {
                    candidate.score > current.score
                        || (candidate.score == current.score && container_len < *current_len)
                }
            };
            if better {
                best = Some((candidate, container_len));
            }
        };

        for subject in catalog {
            let name = subject.normalized_name();
            if name.contains(term) {
                consider(
                    MatchResult::from_subject(
                        subject,
                        self.policy.direct_name_cap,
                        MatchType::ContainsMatch,
                        &subject.sub_name,
                    ),
                    char_len(&name),
                );
            }

            for synonym in &subject.synonyms {
                if synonym.contains(term) {
                    let cap = if synonym.as_str() == term {
                        self.policy.direct_synonym_cap
                    } else {
                        self.policy.direct_synonym_container_cap
                    };
                    consider(
                        MatchResult::from_subject(subject, cap, MatchType::SynonymContains, synonym),
                        char_len(synonym),
                    );
                }
            }
        }

        best.map(|(m, _)| m)
    }

    fn levenshtein_tier(&self, term: &str, catalog: &[Subject], threshold: f64) -> Option<MatchResult> {
        let mut best = None;

        for subject in catalog {
            let sim = similarity(term, &subject.normalized_name());
            if sim >= threshold {
                keep_higher(
                    &mut best,
                    MatchResult::from_subject(
                        subject,
                        sim * self.policy.levenshtein_name_weight,
                        MatchType::LevenshteinName,
                        &subject.sub_name,
                    ),
                );
            }

            for synonym in &subject.synonyms {
                let sim = similarity(term, synonym);
                if sim >= threshold {
                    keep_higher(
                        &mut best,
                        MatchResult::from_subject(
                            subject,
                            sim * self.policy.levenshtein_synonym_weight,
                            MatchType::LevenshteinSynonym,
                            synonym,
                        ),
                    );
                }
            }
        }

        best
    }
}

/// Replace `best` only on a strictly higher score, so earlier catalog
/// entries win ties.
fn keep_higher(best: &mut Option<MatchResult>, candidate: MatchResult) {
    if best.as_ref().map_or(true, |b| candidate.score > b.score) {
        *best = Some(candidate);
    }
}
