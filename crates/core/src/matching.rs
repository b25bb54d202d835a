use serde::{Deserialize, Serialize};
use std::fmt;

use crate::subject::{Subject, SubjectKey};

/// How a term was tied to a subject. Variants are listed in tier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// The term embeds one of the subject's synonyms.
    InputContainsSynonym,
    /// The term embeds the subject's name.
    InputContainsSubjectName,
    /// A synonym embeds the term.
    SynonymContains,
    /// The subject's name embeds the term.
    ContainsMatch,
    LevenshteinName,
    LevenshteinSynonym,
}

impl MatchType {
    pub fn is_fuzzy(self) -> bool {
        matches!(self, MatchType::LevenshteinName | MatchType::LevenshteinSynonym)
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchType::InputContainsSynonym => "input_contains_synonym",
            MatchType::InputContainsSubjectName => "input_contains_subject_name",
            MatchType::SynonymContains => "synonym_contains",
            MatchType::ContainsMatch => "contains_match",
            MatchType::LevenshteinName => "levenshtein_name",
            MatchType::LevenshteinSynonym => "levenshtein_synonym",
        };
        write!(f, "{s}")
    }
}

/// The subject chosen for a term, with the score that won it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub major_code: String,
    pub major_name: String,
    pub sub_code: String,
    pub sub_name: String,
    /// Always within `[0, 1]`.
    pub score: f64,
    pub match_type: MatchType,
    /// The catalog string (name or synonym) that produced the match.
    pub matched_token: String,
}

impl MatchResult {
    pub fn from_subject(
        subject: &Subject,
        score: f64,
        match_type: MatchType,
        matched_token: &str,
    ) -> Self {
        MatchResult {
            major_code: subject.major_code.clone(),
            major_name: subject.major_name.clone(),
            sub_code: subject.sub_code.clone(),
            sub_name: subject.sub_name.clone(),
            score: score.clamp(0.0, 1.0),
            match_type,
            matched_token: matched_token.to_string(),
        }
    }

    pub fn key(&self) -> SubjectKey {
        SubjectKey::new(&self.major_code, &self.sub_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_clamped() {
        let s = Subject::new("100", "食物飲料", "102", "午餐");
        let m = MatchResult::from_subject(&s, 1.4, MatchType::ContainsMatch, "午餐");
        assert_eq!(m.score, 1.0);
        let m = MatchResult::from_subject(&s, -0.2, MatchType::ContainsMatch, "午餐");
        assert_eq!(m.score, 0.0);
    }

    #[test]
    fn match_type_serializes_snake_case() {
        let json = serde_json::to_string(&MatchType::InputContainsSubjectName).unwrap();
        assert_eq!(json, "\"input_contains_subject_name\"");
        assert_eq!(MatchType::LevenshteinSynonym.to_string(), "levenshtein_synonym");
    }
}
