//! Program records and the per-item extraction map
//!
//! A listing item is first captured as an [`ExtractionResult`] keyed by [`Field`]. Once the
//! detail page has been visited the tuition fee is merged in and the result becomes an
//! immutable [`ProgramRecord`] ready for the store.

use std::collections::BTreeMap;
use std::fmt;

/// Placeholder stored when a best-effort field cannot be resolved
pub const NOT_AVAILABLE: &str = "Not Available";

/// The fixed set of record attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Degree,
    University,
    Location,
    Pace,
    StudyFormat,
    Duration,
    Languages,
    TuitionFee,
    SourceUrl,
}

impl Field {
    /// Maps an info entry's `aria-label` classifier to the field it fills
    ///
    /// Unknown classifiers return `None` and are ignored by the extractor.
    pub fn from_classifier(label: &str) -> Option<Self> {
        match label.trim() {
            "Degree type" => Some(Self::Degree),
            "Study pace" => Some(Self::Pace),
            "Duration" => Some(Self::Duration),
            "Study format" => Some(Self::StudyFormat),
            "Language" => Some(Self::Languages),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Degree => "degree",
            Self::University => "university",
            Self::Location => "location",
            Self::Pace => "pace",
            Self::StudyFormat => "study_format",
            Self::Duration => "duration",
            Self::Languages => "languages",
            Self::TuitionFee => "tuition_fee",
            Self::SourceUrl => "source_url",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field values captured for one listing item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    values: BTreeMap<Field, String>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// The program page this item links to
    pub fn source_url(&self) -> Option<&str> {
        self.get(Field::SourceUrl)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merges the detail-page tuition fee and freezes the result into a record
    ///
    /// Optional listing fields that were never seen become empty strings.
    pub fn into_record(mut self, category: &str, tuition_fee: String) -> ProgramRecord {
        self.set(Field::TuitionFee, tuition_fee);
        let mut take = |field: Field| self.values.remove(&field).unwrap_or_default();

        ProgramRecord {
            id: None,
            category: category.to_string(),
            title: take(Field::Title),
            degree: take(Field::Degree),
            university: take(Field::University),
            location: take(Field::Location),
            pace: take(Field::Pace),
            study_format: take(Field::StudyFormat),
            duration: take(Field::Duration),
            languages: take(Field::Languages),
            tuition_fee: take(Field::TuitionFee),
            source_url: take(Field::SourceUrl),
        }
    }
}

/// A fully resolved program, the unit persisted by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRecord {
    /// Row id, assigned by the store
    pub id: Option<i64>,
    pub category: String,
    pub title: String,
    pub degree: String,
    pub university: String,
    pub location: String,
    pub pace: String,
    pub study_format: String,
    pub duration: String,
    pub languages: String,
    pub tuition_fee: String,
    pub source_url: String,
}
