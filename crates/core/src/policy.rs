use serde::{Deserialize, Serialize};

use crate::time_slot::{default_time_slots, TimeSlot};

/// Every scoring and tie-break constant used by classification, in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Minimum normalized edit similarity accepted by the Levenshtein tier.
    pub levenshtein_threshold: f64,
    /// Shortest catalog string the compound-containment tier will look for.
    pub min_contained_len: usize,

    /// Score cap when the term embeds a synonym.
    pub compound_synonym_cap: f64,
    /// Score cap when the term embeds a subject name.
    pub compound_name_cap: f64,

    /// Score cap when a subject name embeds the term.
    pub direct_name_cap: f64,
    /// Score cap when a synonym equals the term.
    pub direct_synonym_cap: f64,
    /// Score cap when a synonym strictly contains the term.
    pub direct_synonym_container_cap: f64,

    pub levenshtein_name_weight: f64,
    pub levenshtein_synonym_weight: f64,

    /// Confidence reported when time of day could not pick a candidate.
    pub unresolved_confidence: f64,
    /// Offset from UTC, in hours, used to read the hour of day from a timestamp.
    pub utc_offset_hours: i32,
    pub time_slots: Vec<TimeSlot>,

    /// Compare-and-set attempts before a synonym write is abandoned.
    pub learn_max_attempts: u32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy {
            levenshtein_threshold: 0.6,
            min_contained_len: 2,
            compound_synonym_cap: 0.95,
            compound_name_cap: 0.90,
            direct_name_cap: 0.90,
            direct_synonym_cap: 0.95,
            direct_synonym_container_cap: 0.98,
            levenshtein_name_weight: 0.90,
            levenshtein_synonym_weight: 0.95,
            unresolved_confidence: 0.7,
            utc_offset_hours: 8,
            time_slots: default_time_slots(),
            learn_max_attempts: 3,
        }
    }
}

impl MatchPolicy {
    pub fn from_toml(toml_content: &str) -> Result<Self, String> {
        toml::from_str(toml_content).map_err(|e| format!("Failed to parse TOML: {e}"))
    }
}
