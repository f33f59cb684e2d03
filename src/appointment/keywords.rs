use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{EMERGENCY_MEDICINE, PRIMARY_CARE};

/// One row of the keyword → specialist table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub keyword: String,
    pub specialists: Vec<String>,
    /// Specialists of a matching emergency entry are hoisted to the front.
    #[serde(default)]
    pub emergency: bool,
}

/// A pair of table keys where one occurs inside the other, so any text
/// matching the longer key also matches the shorter one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordOverlap {
    pub outer: String,
    pub inner: String,
}

/// Maps free text to an ordered, duplicate-free list of specialist types.
///
/// Keys are whole-phrase, case-insensitive matches scanned in table order.
/// A key must start on a word boundary and may end in a plural or verb
/// suffix (`-s`, `-es`, `-ed`, `-ing`), so "skin" does not fire on
/// "asking" and "heart" does not fire on "heartburn". A key written with a
/// trailing `*` is a stem and matches any word it begins ("allerg*").
/// Pure function of (text, table).
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    entries: Vec<KeywordEntry>,
    patterns: Vec<Regex>,
}

impl KeywordMatcher {
    /// Build from table rows. Keys are lowercased; blank keys are dropped.
    pub fn new(entries: Vec<KeywordEntry>) -> Self {
        let mut kept = Vec::new();
        let mut patterns = Vec::new();
        for mut entry in entries {
            let key = entry.keyword.trim().to_lowercase();
            let (key, stem) = match key.strip_suffix('*') {
                Some(stem) => (stem.trim_end().to_string(), true),
                None => (key, false),
            };
            if key.is_empty() {
                continue;
            }
            match key_pattern(&key, stem) {
                Ok(pattern) => {
                    entry.keyword = key;
                    kept.push(entry);
                    patterns.push(pattern);
                }
                Err(e) => {
                    tracing::warn!(keyword = %key, error = %e, "Skipping unusable keyword");
                }
            }
        }
        Self {
            entries: kept,
            patterns,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TABLE.clone())
    }

    pub fn entries(&self) -> &[KeywordEntry] {
        &self.entries
    }

    /// Specialist types for `text`, first-seen order, emergency types first.
    /// Never empty: unmatched text yields `["Primary Care Physician"]`.
    pub fn match_text(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut accumulated: Vec<&str> = Vec::new();
        let mut emergency: HashSet<&str> = HashSet::new();

        for entry in self.matching(&lowered) {
            for specialist in &entry.specialists {
                accumulated.push(specialist);
                if entry.emergency {
                    emergency.insert(specialist);
                }
            }
        }

        let mut seen = HashSet::new();
        let deduped: Vec<&str> = accumulated
            .into_iter()
            .filter(|s| seen.insert(*s))
            .collect();

        let (mut ordered, rest): (Vec<&str>, Vec<&str>) = deduped
            .into_iter()
            .partition(|s| emergency.contains(s) || *s == EMERGENCY_MEDICINE);
        ordered.extend(rest);

        if ordered.is_empty() {
            return vec![PRIMARY_CARE.to_string()];
        }
        ordered.into_iter().map(str::to_string).collect()
    }

    /// First table key found in `text`, if any.
    pub fn first_keyword(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        let first = self.matching(&lowered).next().map(|e| e.keyword.as_str());
        first
    }

    fn matching<'a, 'b>(&'a self, lowered: &'b str) -> impl Iterator<Item = &'a KeywordEntry> + 'b
    where
        'a: 'b,
    {
        self.entries
            .iter()
            .zip(&self.patterns)
            .filter(move |(_, pattern)| pattern.is_match(lowered))
            .map(|(entry, _)| entry)
    }

    /// Every pair of keys where one contains the other.
    pub fn overlaps(&self) -> Vec<KeywordOverlap> {
        let mut found = Vec::new();
        for outer in &self.entries {
            for inner in &self.entries {
                if outer.keyword != inner.keyword && outer.keyword.contains(&inner.keyword) {
                    found.push(KeywordOverlap {
                        outer: outer.keyword.clone(),
                        inner: inner.keyword.clone(),
                    });
                }
            }
        }
        found
    }
}

fn key_pattern(key: &str, stem: bool) -> Result<Regex, regex::Error> {
    let tail = if stem { r"\w*" } else { r"(?:s|es|ed|ing)?\b" };
    Regex::new(&format!(r"\b{}{tail}", regex::escape(key)))
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ═══════════════════════════════════════════════════════════
// Bundled table (order matters: first match sets priority)
// ═══════════════════════════════════════════════════════════

static DEFAULT_TABLE: LazyLock<Vec<KeywordEntry>> = LazyLock::new(|| {
    vec![
        emergency("chest pain", &["Cardiologist", EMERGENCY_MEDICINE]),
        emergency("shortness of breath", &["Pulmonologist", EMERGENCY_MEDICINE]),
        emergency("stroke", &["Neurologist", EMERGENCY_MEDICINE]),
        emergency("severe bleeding", &[EMERGENCY_MEDICINE]),
        emergency("unconscious", &[EMERGENCY_MEDICINE]),
        entry("headache", &["Neurologist", PRIMARY_CARE]),
        entry("migraine", &["Neurologist"]),
        entry("heart", &["Cardiologist"]),
        entry("blood pressure", &["Cardiologist", PRIMARY_CARE]),
        entry("stomach", &["Gastroenterologist", PRIMARY_CARE]),
        entry("abdominal", &["Gastroenterologist"]),
        entry("nausea", &["Gastroenterologist", PRIMARY_CARE]),
        entry("skin", &["Dermatologist"]),
        entry("rash", &["Dermatologist", "Allergist"]),
        entry("pregnan*", &["Obstetrician-Gynecologist"]),
        entry("joint pain", &["Rheumatologist", "Orthopedist"]),
        entry("arthritis", &["Rheumatologist"]),
        entry("bone", &["Orthopedist"]),
        entry("back pain", &["Orthopedist", PRIMARY_CARE]),
        entry("cough", &["Pulmonologist", PRIMARY_CARE]),
        entry("asthma", &["Pulmonologist", "Allergist"]),
        entry("allerg*", &["Allergist"]),
        entry("vision", &["Ophthalmologist"]),
        entry("eye", &["Ophthalmologist"]),
        entry("anxiety", &["Psychiatrist"]),
        entry("depression", &["Psychiatrist"]),
        entry("dizz*", &["Neurologist", "ENT Specialist"]),
        entry("ear pain", &["ENT Specialist"]),
        entry("fever", &[PRIMARY_CARE]),
        entry("infection", &["Infectious Disease Specialist", PRIMARY_CARE]),
        entry("diabetes", &["Endocrinologist"]),
        entry("thyroid", &["Endocrinologist"]),
        entry("weight", &["Nutritionist", "Endocrinologist"]),
        entry("diet", &["Nutritionist"]),
        entry("nutrition", &["Nutritionist"]),
        entry("sleep", &["Sleep Specialist"]),
        entry("medication", &["Clinical Pharmacist", PRIMARY_CARE]),
    ]
});

fn entry(keyword: &str, specialists: &[&str]) -> KeywordEntry {
    KeywordEntry {
        keyword: keyword.to_string(),
        specialists: specialists.iter().map(|s| s.to_string()).collect(),
        emergency: false,
    }
}

fn emergency(keyword: &str, specialists: &[&str]) -> KeywordEntry {
    KeywordEntry {
        emergency: true,
        ..entry(keyword, specialists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> KeywordMatcher {
        KeywordMatcher::with_defaults()
    }

    // =================================================================
    // ORDERING
    // =================================================================

    #[test]
    fn headaches_and_joint_pain_in_first_seen_order() {
        let result = matcher().match_text("I have persistent headaches and joint pain");
        assert_eq!(
            result,
            vec!["Neurologist", "Primary Care Physician", "Rheumatologist", "Orthopedist"]
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            matcher().match_text("SEVERE HEADACHE"),
            vec!["Neurologist", "Primary Care Physician"]
        );
    }

    #[test]
    fn chest_pain_puts_emergency_types_first() {
        let result = matcher().match_text("sharp chest pain");
        assert_eq!(result[0], "Cardiologist");
        assert_eq!(result[1], "Emergency Medicine");
    }

    #[test]
    fn emergency_types_hoisted_over_earlier_matches() {
        let table = KeywordMatcher::new(vec![
            entry("cough", &["Pulmonologist", PRIMARY_CARE]),
            emergency("chest pain", &["Cardiologist", EMERGENCY_MEDICINE]),
        ]);
        let result = table.match_text("cough and chest pain");
        assert_eq!(
            result,
            vec!["Cardiologist", "Emergency Medicine", "Pulmonologist", "Primary Care Physician"]
        );
    }

    #[test]
    fn emergency_medicine_hoisted_even_from_plain_entry() {
        let table = KeywordMatcher::new(vec![
            entry("fever", &[PRIMARY_CARE]),
            entry("bleeding", &[EMERGENCY_MEDICINE]),
        ]);
        assert_eq!(
            table.match_text("fever and bleeding"),
            vec!["Emergency Medicine", "Primary Care Physician"]
        );
    }

    // =================================================================
    // DEDUPLICATION AND FALLBACK
    // =================================================================

    #[test]
    fn duplicates_removed_keeping_first_occurrence() {
        let result = matcher().match_text("headache, stomach ache and fever");
        let unique: HashSet<&String> = result.iter().collect();
        assert_eq!(unique.len(), result.len());
        assert_eq!(result[0], "Neurologist");
        assert_eq!(result[1], "Primary Care Physician");
        assert_eq!(result[2], "Gastroenterologist");
    }

    #[test]
    fn unmatched_text_returns_primary_care_only() {
        assert_eq!(matcher().match_text("hello there"), vec![PRIMARY_CARE]);
    }

    #[test]
    fn empty_text_returns_primary_care_only() {
        assert_eq!(matcher().match_text(""), vec![PRIMARY_CARE]);
        assert_eq!(matcher().match_text("   "), vec![PRIMARY_CARE]);
    }

    #[test]
    fn results_never_empty_or_duplicated() {
        let inputs = [
            "",
            "chest pain chest pain chest pain",
            "rash on skin after new medication",
            "I feel dizzy and have ear pain and a fever",
            "ünïcödé text with no keywords",
            "back pain, joint pain, bone pain, arthritis",
        ];
        for input in inputs {
            let result = matcher().match_text(input);
            assert!(!result.is_empty(), "empty result for {input:?}");
            let unique: HashSet<&String> = result.iter().collect();
            assert_eq!(unique.len(), result.len(), "duplicates for {input:?}");
        }
    }

    // =================================================================
    // TABLE QUALITY
    // =================================================================

    #[test]
    fn bundled_table_has_no_overlapping_keys() {
        assert!(matcher().overlaps().is_empty(), "{:?}", matcher().overlaps());
    }

    #[test]
    fn overlap_lint_flags_nested_keys() {
        let table = KeywordMatcher::new(vec![
            entry("pain", &[PRIMARY_CARE]),
            entry("chest pain", &["Cardiologist"]),
        ]);
        assert_eq!(
            table.overlaps(),
            vec![KeywordOverlap {
                outer: "chest pain".into(),
                inner: "pain".into()
            }]
        );
    }

    #[test]
    fn keys_are_normalized_and_blank_keys_dropped() {
        let table = KeywordMatcher::new(vec![
            entry("  Headache ", &["Neurologist"]),
            entry("   ", &["Nobody"]),
            entry(" * ", &["Nobody"]),
        ]);
        assert_eq!(table.entries().len(), 1);
        assert_eq!(table.entries()[0].keyword, "headache");
    }

    // =================================================================
    // WORD BOUNDARIES
    // =================================================================

    #[test]
    fn keys_do_not_fire_inside_other_words() {
        assert_eq!(matcher().match_text("I was asking about parking"), vec![PRIMARY_CARE]);
        assert_eq!(matcher().match_text("bad heartburn after dinner"), vec![PRIMARY_CARE]);
        assert_eq!(matcher().match_text("my heart races"), vec!["Cardiologist"]);
    }

    #[test]
    fn inflected_forms_still_match() {
        assert_eq!(matcher().first_keyword("constant coughing"), Some("cough"));
        assert_eq!(matcher().first_keyword("itchy eyes"), Some("eye"));
        assert_eq!(matcher().first_keyword("I can't stop sleeping"), Some("sleep"));
    }

    #[test]
    fn stem_keys_match_any_continuation() {
        assert_eq!(matcher().match_text("seasonal allergies"), vec!["Allergist"]);
        assert_eq!(matcher().match_text("Am I pregnant?"), vec!["Obstetrician-Gynecologist"]);
        assert_eq!(matcher().first_keyword("feeling dizzy"), Some("dizz"));
        assert_eq!(matcher().first_keyword("reallergic"), None);
    }

    #[test]
    fn first_keyword_follows_table_order() {
        assert_eq!(
            matcher().first_keyword("joint pain and a headache"),
            Some("headache")
        );
        assert_eq!(matcher().first_keyword("nothing relevant"), None);
    }
}
