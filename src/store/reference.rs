//! Read-only reference data: the specialist directory and the keyword →
//! specialist table. Loaded once at startup from the data directory when
//! `specialists.json` / `specialist_mapping.json` exist, otherwise the
//! bundled defaults are used.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

use super::atomic::read_json;
use super::StoreError;
use crate::appointment::{KeywordEntry, KeywordMatcher};
use crate::models::{weekdays, Specialist, EMERGENCY_MEDICINE, PRIMARY_CARE};

const SPECIALISTS_FILE: &str = "specialists.json";
const MAPPING_FILE: &str = "specialist_mapping.json";

/// Specialist directory, keyed by specialist type.
#[derive(Debug, Clone)]
pub struct SpecialistDirectory {
    specialists: Vec<Specialist>,
}

impl SpecialistDirectory {
    pub fn new(specialists: Vec<Specialist>) -> Self {
        Self { specialists }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_specialists())
    }

    pub fn get(&self, specialist_type: &str) -> Option<&Specialist> {
        self.specialists
            .iter()
            .find(|s| s.specialist_type == specialist_type)
    }

    pub fn all(&self) -> &[Specialist] {
        &self.specialists
    }

    /// Directory entries for `types`, in order, skipping unknown types.
    /// Falls back to the primary care entry when nothing resolves.
    pub fn resolve(&self, types: &[String]) -> Vec<Specialist> {
        let found: Vec<Specialist> = types.iter().filter_map(|t| self.get(t)).cloned().collect();
        if found.is_empty() {
            return self.get(PRIMARY_CARE).cloned().into_iter().collect();
        }
        found
    }

    /// Entries offered for manual selection: everything except emergency
    /// medicine, sorted by specialty.
    pub fn manual_selection(&self) -> Vec<Specialist> {
        let mut list: Vec<Specialist> = self
            .specialists
            .iter()
            .filter(|s| s.specialist_type != EMERGENCY_MEDICINE)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.specialty.cmp(&b.specialty));
        list
    }
}

impl Default for SpecialistDirectory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Directory plus keyword table, immutable for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub directory: SpecialistDirectory,
    pub matcher: KeywordMatcher,
}

#[derive(Deserialize)]
struct SpecialistsFile {
    specialists: BTreeMap<String, SpecialistRecord>,
}

#[derive(Deserialize)]
struct SpecialistRecord {
    name: String,
    specialty: String,
    #[serde(default)]
    hospital: Option<String>,
    #[serde(default = "weekdays")]
    available_days: Vec<String>,
}

#[derive(Deserialize)]
struct MappingFile {
    specialist_mapping: KeywordTable,
}

/// Keyword rows in file order. Accepts a list of `{keyword, specialists,
/// emergency}` rows, or the plain object form `{"headache": ["Neurologist"]}`
/// where a value may also be a single specialist type.
struct KeywordTable(Vec<KeywordEntry>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for KeywordTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = KeywordTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a list of keyword rows or an object of keyword to specialist types")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<KeywordTable, A::Error> {
                let mut rows = Vec::new();
                while let Some(row) = seq.next_element::<KeywordEntry>()? {
                    rows.push(row);
                }
                Ok(KeywordTable(rows))
            }

            // Entries are visited in document order, which is table priority.
            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<KeywordTable, A::Error> {
                let mut rows = Vec::new();
                while let Some((keyword, specialists)) = map.next_entry::<String, OneOrMany>()? {
                    let specialists = match specialists {
                        OneOrMany::One(s) => vec![s],
                        OneOrMany::Many(list) => list,
                    };
                    if specialists.is_empty() {
                        return Err(de::Error::custom(format!(
                            "keyword '{keyword}' lists no specialist types"
                        )));
                    }
                    rows.push(KeywordEntry {
                        keyword,
                        specialists,
                        emergency: false,
                    });
                }
                Ok(KeywordTable(rows))
            }
        }

        deserializer.deserialize_any(TableVisitor)
    }
}

impl ReferenceData {
    /// Load overrides from `data_dir`, falling back to bundled defaults for
    /// each missing file. A present but malformed file is an error.
    pub fn load(data_dir: &Path) -> Result<Self, StoreError> {
        let directory = match read_json::<SpecialistsFile>(&data_dir.join(SPECIALISTS_FILE))? {
            Some(file) => {
                tracing::info!(count = file.specialists.len(), "Loaded specialist directory");
                SpecialistDirectory::new(
                    file.specialists
                        .into_iter()
                        .map(|(specialist_type, r)| Specialist {
                            specialist_type,
                            name: r.name,
                            specialty: r.specialty,
                            hospital: r.hospital,
                            available_days: r.available_days,
                        })
                        .collect(),
                )
            }
            None => SpecialistDirectory::with_defaults(),
        };

        let matcher = match read_json::<MappingFile>(&data_dir.join(MAPPING_FILE))? {
            Some(file) => {
                let rows = file.specialist_mapping.0;
                tracing::info!(count = rows.len(), "Loaded keyword table");
                KeywordMatcher::new(rows)
            }
            None => KeywordMatcher::with_defaults(),
        };

        if directory.get(PRIMARY_CARE).is_none() {
            return Err(StoreError::InvalidReference(format!(
                "specialist directory has no '{PRIMARY_CARE}' entry"
            )));
        }

        let data = Self { directory, matcher };
        data.lint();
        Ok(data)
    }

    /// Warn about keyword keys nested inside other keys and about table
    /// rows that name specialists missing from the directory.
    pub fn lint(&self) -> usize {
        let mut warnings = 0;
        for overlap in self.matcher.overlaps() {
            tracing::warn!(
                outer = %overlap.outer,
                inner = %overlap.inner,
                "Overlapping keyword keys: text matching the outer key also matches the inner key"
            );
            warnings += 1;
        }
        for entry in self.matcher.entries() {
            for specialist in &entry.specialists {
                if self.directory.get(specialist).is_none() {
                    tracing::warn!(
                        keyword = %entry.keyword,
                        specialist = %specialist,
                        "Keyword table names a specialist missing from the directory"
                    );
                    warnings += 1;
                }
            }
        }
        warnings
    }
}

// ═══════════════════════════════════════════════════════════
// Bundled directory
// ═══════════════════════════════════════════════════════════

fn default_specialists() -> Vec<Specialist> {
    let all_week: Vec<String> = [
        "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
    ]
    .iter()
    .map(|d| d.to_string())
    .collect();

    let weekday = |specialist_type: &str, name: &str, specialty: &str| Specialist {
        specialist_type: specialist_type.to_string(),
        name: name.to_string(),
        specialty: specialty.to_string(),
        hospital: Some("CareRoute General Hospital".to_string()),
        available_days: weekdays(),
    };

    vec![
        weekday(PRIMARY_CARE, "Dr. Emily Carter", "Family Medicine"),
        weekday("Cardiologist", "Dr. Sarah Johnson", "Cardiology"),
        Specialist {
            available_days: all_week,
            ..weekday(EMERGENCY_MEDICINE, "Dr. Marcus Reed", "Emergency Medicine")
        },
        weekday("Neurologist", "Dr. Michael Chen", "Neurology"),
        weekday("Pulmonologist", "Dr. Aisha Rahman", "Pulmonology"),
        weekday("Gastroenterologist", "Dr. Robert Alvarez", "Gastroenterology"),
        weekday("Dermatologist", "Dr. Laura Bennett", "Dermatology"),
        weekday("Allergist", "Dr. Kevin Osei", "Allergy and Immunology"),
        weekday("Obstetrician-Gynecologist", "Dr. Priya Nair", "Obstetrics and Gynecology"),
        weekday("Rheumatologist", "Dr. Hannah Weiss", "Rheumatology"),
        weekday("Orthopedist", "Dr. James Okafor", "Orthopedics"),
        weekday("Ophthalmologist", "Dr. Sofia Marino", "Ophthalmology"),
        weekday("Psychiatrist", "Dr. Daniel Brooks", "Psychiatry"),
        weekday("ENT Specialist", "Dr. Olivia Grant", "Otolaryngology"),
        weekday("Infectious Disease Specialist", "Dr. Samuel Ito", "Infectious Disease"),
        weekday("Endocrinologist", "Dr. Rachel Kim", "Endocrinology"),
        weekday("Nutritionist", "Dr. Grace Liu", "Nutrition and Dietetics"),
        weekday("Sleep Specialist", "Dr. Thomas Byrne", "Sleep Medicine"),
        weekday("Clinical Pharmacist", "Dr. Nadia Haddad", "Clinical Pharmacy"),
    ]
}
