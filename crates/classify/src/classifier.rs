use jizhang_core::{MatchPolicy, MatchResult, MatchType, Subject};
use serde::Serialize;
use tracing::info;

use crate::disambiguate::TimeDisambiguator;
use crate::match_engine::MatchEngine;
use crate::multi_mapping::find_ambiguous;

/// The single answer for one term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub result: MatchResult,
    pub confidence: f64,
    pub time_matched: bool,
    /// Every exact mapping, when there was more than one.
    pub ambiguous: Vec<MatchResult>,
}

impl Classification {
    pub fn is_ambiguous(&self) -> bool {
        !self.ambiguous.is_empty()
    }
}

/// Exact multi-mapping check first, time of day to settle real ambiguity,
/// and the tiered match engine for everything else.
pub struct Classifier {
    engine: MatchEngine,
    disambiguator: TimeDisambiguator,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(MatchPolicy::default())
    }
}

impl Classifier {
    pub fn new(policy: MatchPolicy) -> Self {
        let disambiguator = TimeDisambiguator::from_policy(&policy);
        Self { engine: MatchEngine::new(policy), disambiguator }
    }

    pub fn classify(&self, term: &str, catalog: &[Subject], timestamp_millis: i64) -> Option<Classification> {
        let exact = self.rescored(find_ambiguous(term, catalog));
        if exact.len() > 1 {
            let resolution = self.disambiguator.resolve(&exact, timestamp_millis)?;
            info!(
                term,
                candidates = exact.len(),
                picked = %resolution.result.sub_name,
                time_matched = resolution.time_matched,
                "ambiguous term"
            );
            return Some(Classification {
                result: resolution.result,
                confidence: resolution.confidence,
                time_matched: resolution.time_matched,
                ambiguous: exact,
            });
        }

        let result = self.engine.find_best_match(term, catalog)?;
        Some(Classification {
            confidence: result.score,
            result,
            time_matched: false,
            ambiguous: Vec::new(),
        })
    }

    /// All exact mappings for `term`, for diagnostics and confirmation prompts.
    pub fn diagnose(&self, term: &str, catalog: &[Subject]) -> Vec<MatchResult> {
        self.rescored(find_ambiguous(term, catalog))
    }

    /// Exact hits are scored like a full-length compound hit so they compare
    /// with engine results on the same scale.
    fn rescored(&self, hits: Vec<MatchResult>) -> Vec<MatchResult> {
        let policy = self.engine.policy();
        hits.into_iter()
            .map(|mut m| {
                m.score = match m.match_type {
                    MatchType::InputContainsSynonym => policy.compound_synonym_cap,
                    _ => policy.compound_name_cap,
                };
                m
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Subject> {
        vec![
            Subject::new("100", "食物飲料", "101", "早餐").with_synonyms("吃飯"),
            Subject::new("100", "食物飲料", "102", "午餐").with_synonyms("吃飯"),
            Subject::new("100", "食物飲料", "107", "便當").with_synonyms("lunch box"),
        ]
    }

    // 2026-10-19 04:00 UTC == 12:00 in UTC+8
    const NOON_TAIPEI: i64 = 1_792_382_400_000;

    #[test]
    fn ambiguous_term_resolved_by_time() {
        let c = Classifier::default().classify("吃飯", &catalog(), NOON_TAIPEI).unwrap();
        assert_eq!(c.result.sub_name, "午餐");
        assert!(c.time_matched);
        assert_eq!(c.confidence, 0.9);
        assert_eq!(c.ambiguous.len(), 2);
    }

    #[test]
    fn unambiguous_term_uses_engine() {
        let c = Classifier::default().classify("家鄉便當", &catalog(), NOON_TAIPEI).unwrap();
        assert_eq!(c.result.sub_name, "便當");
        assert!(!c.is_ambiguous());
        assert_eq!(c.confidence, c.result.score);
    }

    #[test]
    fn diagnose_lists_every_exact_mapping() {
        let hits = Classifier::default().diagnose("吃飯", &catalog());
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|m| m.score == 0.95));
    }

    #[test]
    fn nothing_matches() {
        assert!(Classifier::default().classify("zzzz", &catalog(), NOON_TAIPEI).is_none());
    }
}
