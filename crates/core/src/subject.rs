use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Trim and lower-case a term so that catalog lookups are case-insensitive.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// ASCII commas, full-width commas and ideographic enumeration commas.
pub const LIST_SEPARATORS: [char; 3] = [',', '，', '、'];

/// Split a written synonym list (`"coffee,手搖飲"`) into normalized entries.
pub fn parse_synonym_list(list: &str) -> BTreeSet<String> {
    list.split(LIST_SEPARATORS)
        .map(normalize_term)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Identifies a subject inside one ledger: `"{major}-{sub}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectKey {
    pub major_code: String,
    pub sub_code: String,
}

impl SubjectKey {
    pub fn new(major_code: &str, sub_code: &str) -> Self {
        SubjectKey {
            major_code: major_code.to_string(),
            sub_code: sub_code.to_string(),
        }
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.major_code, self.sub_code)
    }
}

impl FromStr for SubjectKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('-') {
            Some((major, sub)) if !major.is_empty() && !sub.is_empty() => {
                Ok(SubjectKey::new(major.trim(), sub.trim()))
            }
            _ => Err(format!("Invalid subject code: '{s}'")),
        }
    }
}

/// A ledger category with its curated and learned synonyms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub major_code: String,
    pub major_name: String,
    pub sub_code: String,
    pub sub_name: String,
    /// Normalized alternate terms. Only the synonym learner mutates this.
    #[serde(default)]
    pub synonyms: BTreeSet<String>,
    /// Optimistic concurrency token, bumped by the store on every synonym write.
    #[serde(default)]
    pub version: i64,
}

impl Subject {
    pub fn new(major_code: &str, major_name: &str, sub_code: &str, sub_name: &str) -> Self {
        Subject {
            major_code: major_code.to_string(),
            major_name: major_name.to_string(),
            sub_code: sub_code.to_string(),
            sub_name: sub_name.to_string(),
            synonyms: BTreeSet::new(),
            version: 0,
        }
    }

    pub fn with_synonyms(mut self, list: &str) -> Self {
        self.synonyms = parse_synonym_list(list);
        self
    }

    pub fn key(&self) -> SubjectKey {
        SubjectKey::new(&self.major_code, &self.sub_code)
    }

    pub fn normalized_name(&self) -> String {
        normalize_term(&self.sub_name)
    }

    pub fn has_synonym(&self, term: &str) -> bool {
        self.synonyms.contains(&normalize_term(term))
    }
}

/// (major code, major name, sub code, sub name, synonyms)
pub const DEFAULT_SUBJECTS: &[(&str, &str, &str, &str, &str)] = &[
    ("100", "食物飲料", "101", "早餐", "breakfast,早點"),
    ("100", "食物飲料", "102", "午餐", "lunch,中餐"),
    ("100", "食物飲料", "103", "晚餐", "dinner,晚飯"),
    ("100", "食物飲料", "104", "宵夜", "消夜,夜宵"),
    ("100", "食物飲料", "105", "飲料", "drink,手搖飲"),
    ("100", "食物飲料", "106", "咖啡", "coffee,拿鐵"),
    ("100", "食物飲料", "107", "便當", "lunch box"),
    ("100", "食物飲料", "108", "零食", "snack,點心"),
    ("200", "交通", "201", "公車", "bus"),
    ("200", "交通", "202", "捷運", "mrt,metro"),
    ("200", "交通", "203", "計程車", "taxi,uber,小黃"),
    ("200", "交通", "204", "加油", "油錢,gas"),
    ("300", "居家", "301", "房租", "rent,租金"),
    ("300", "居家", "302", "水電", "電費,水費"),
    ("300", "居家", "303", "網路", "internet,wifi"),
    ("300", "居家", "304", "日用品", "衛生紙,洗髮精"),
    ("400", "娛樂", "401", "電影", "movie"),
    ("400", "娛樂", "402", "遊戲", "game,steam"),
    ("500", "醫療", "501", "看診", "掛號,診所"),
    ("500", "醫療", "502", "藥品", "藥局,藥"),
];

/// Build the default catalog for a freshly created ledger.
pub fn default_subjects() -> Vec<Subject> {
    DEFAULT_SUBJECTS
        .iter()
        .map(|(major, major_name, sub, sub_name, synonyms)| {
            Subject::new(major, major_name, sub, sub_name).with_synonyms(synonyms)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonym_list_is_normalized_and_deduplicated() {
        let set = parse_synonym_list(" Coffee ,手搖飲，coffee、, ");
        assert_eq!(set.len(), 2);
        assert!(set.contains("coffee"));
        assert!(set.contains("手搖飲"));
    }

    #[test]
    fn subject_key_roundtrip() {
        let key: SubjectKey = "100-101".parse().unwrap();
        assert_eq!(key, SubjectKey::new("100", "101"));
        assert_eq!(key.to_string(), "100-101");
        assert!("100".parse::<SubjectKey>().is_err());
        assert!("-101".parse::<SubjectKey>().is_err());
    }

    #[test]
    fn has_synonym_ignores_case_and_padding() {
        let s = Subject::new("100", "食物飲料", "106", "咖啡").with_synonyms("Coffee");
        assert!(s.has_synonym("  COFFEE "));
        assert!(!s.has_synonym("tea"));
    }

    #[test]
    fn default_catalog_has_unique_keys() {
        let subjects = default_subjects();
        let keys: BTreeSet<_> = subjects.iter().map(Subject::key).collect();
        assert_eq!(keys.len(), subjects.len());
    }
}
