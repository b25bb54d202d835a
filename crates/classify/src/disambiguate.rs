use chrono::{DateTime, FixedOffset, Timelike};
use jizhang_core::{slot_for_hour, MatchPolicy, MatchResult, TimeSlot};
use serde::Serialize;
use tracing::debug;

/// A single pick out of several candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub result: MatchResult,
    pub confidence: f64,
    /// True when the time of day decided the pick.
    pub time_matched: bool,
    pub slot: Option<String>,
}

impl Resolution {
    fn unchanged(result: MatchResult) -> Self {
        let confidence = result.score;
        Resolution { result, confidence, time_matched: false, slot: None }
    }
}

/// Breaks ties between candidates using meal-time keywords.
pub struct TimeDisambiguator {
    slots: Vec<TimeSlot>,
    offset: Option<FixedOffset>,
    unresolved_confidence: f64,
}

impl Default for TimeDisambiguator {
    fn default() -> Self {
        Self::from_policy(&MatchPolicy::default())
    }
}

impl TimeDisambiguator {
    pub fn from_policy(policy: &MatchPolicy) -> Self {
        Self {
            slots: policy.time_slots.clone(),
            offset: policy.utc_offset_hours.checked_mul(3600).and_then(FixedOffset::east_opt),
            unresolved_confidence: policy.unresolved_confidence,
        }
    }

    /// Local hour of day for a Unix timestamp in milliseconds.
    pub fn hour_of(&self, timestamp_millis: i64) -> Option<u32> {
        let offset = self.offset?;
        let utc = DateTime::from_timestamp_millis(timestamp_millis)?;
        Some(utc.with_timezone(&offset).hour())
    }

    /// `None` only when `candidates` is empty.
    pub fn resolve(&self, candidates: &[MatchResult], timestamp_millis: i64) -> Option<Resolution> {
        if candidates.len() == 1 {
            return Some(Resolution::unchanged(candidates[0].clone()));
        }
        self.resolve_at_hour(candidates, self.hour_of(timestamp_millis))
    }

    pub fn resolve_at_hour(&self, candidates: &[MatchResult], hour: Option<u32>) -> Option<Resolution> {
        let first = candidates.first()?;
        if candidates.len() == 1 {
            return Some(Resolution::unchanged(first.clone()));
        }

        let Some(hour) = hour else {
            debug!("hour of day not derivable, keeping first candidate");
            return Some(Resolution::unchanged(first.clone()));
        };

        if let Some(slot) = slot_for_hour(&self.slots, hour) {
            if let Some(hit) = candidates.iter().find(|c| slot.mentions(&c.sub_name)) {
                debug!(hour, slot = %slot.name, subject = %hit.sub_name, "resolved by time of day");
                return Some(Resolution {
                    result: hit.clone(),
                    confidence: slot.priority,
                    time_matched: true,
                    slot: Some(slot.name.clone()),
                });
            }
        }

        Some(Resolution {
            result: first.clone(),
            confidence: self.unresolved_confidence,
            time_matched: false,
            slot: None,
        })
    }
}
