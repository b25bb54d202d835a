use serde::{Deserialize, Serialize};

/// A meal period, used to break ties between equally good subjects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub name: String,
    /// First hour inside the slot (0-23).
    pub start_hour: u32,
    /// Last hour inside the slot, inclusive. Smaller than `start_hour` when
    /// the slot wraps past midnight.
    pub end_hour: u32,
    pub keywords: Vec<String>,
    /// Confidence given to a candidate picked by this slot.
    pub priority: f64,
}

impl TimeSlot {
    pub fn new(name: &str, start_hour: u32, end_hour: u32, keywords: &[&str], priority: f64) -> Self {
        TimeSlot {
            name: name.to_string(),
            start_hour,
            end_hour,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            priority,
        }
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            (self.start_hour..=self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour <= self.end_hour
        }
    }

    /// Whether `name` mentions any of the slot keywords, ignoring case.
    pub fn mentions(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
    }
}

pub fn default_time_slots() -> Vec<TimeSlot> {
    vec![
        TimeSlot::new("breakfast", 5, 10, &["早餐", "早點", "早午餐", "breakfast"], 0.9),
        TimeSlot::new("lunch", 11, 14, &["午餐", "中餐", "午飯", "便當", "lunch"], 0.9),
        TimeSlot::new("dinner", 17, 21, &["晚餐", "晚飯", "dinner"], 0.9),
        TimeSlot::new("midnight", 22, 4, &["宵夜", "消夜", "夜宵"], 0.85),
    ]
}

/// The slot covering `hour`, if any.
pub fn slot_for_hour(slots: &[TimeSlot], hour: u32) -> Option<&TimeSlot> {
    slots.iter().find(|s| s.contains_hour(hour))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_range() {
        let slots = default_time_slots();
        assert_eq!(slot_for_hour(&slots, 8).unwrap().name, "breakfast");
        assert_eq!(slot_for_hour(&slots, 12).unwrap().name, "lunch");
        assert_eq!(slot_for_hour(&slots, 19).unwrap().name, "dinner");
    }

    #[test]
    fn midnight_wraps() {
        let slots = default_time_slots();
        assert_eq!(slot_for_hour(&slots, 23).unwrap().name, "midnight");
        assert_eq!(slot_for_hour(&slots, 0).unwrap().name, "midnight");
        assert_eq!(slot_for_hour(&slots, 4).unwrap().name, "midnight");
    }

    #[test]
    fn gaps_have_no_slot() {
        let slots = default_time_slots();
        assert!(slot_for_hour(&slots, 15).is_none());
        assert!(slot_for_hour(&slots, 16).is_none());
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let slot = TimeSlot::new("lunch", 11, 14, &["Lunch"], 0.9);
        assert!(slot.mentions("LUNCH set"));
        assert!(!slot.mentions("dinner"));
    }
}
