//! Core domain types for training program structures.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise references supplied by the exercise library
//! - Planned exercise entries and their rep prescriptions
//! - Days, cycles and the program structure that nests them

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Exercise Library Types
// ============================================================================

/// Display text that is either a plain string or a per-locale map
///
/// The localized form always carries a `default` entry, which is what the
/// engine denormalizes into programs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized {
        default: String,
        #[serde(flatten)]
        translations: BTreeMap<String, String>,
    },
}

impl LocalizedText {
    /// Wrap a single string as `{ "default": text }`
    pub fn localized(text: impl Into<String>) -> Self {
        LocalizedText::Localized {
            default: text.into(),
            translations: BTreeMap::new(),
        }
    }

    /// The text shown when no locale is chosen
    pub fn display(&self) -> &str {
        match self {
            LocalizedText::Plain(text) => text,
            LocalizedText::Localized { default, .. } => default,
        }
    }
}

impl From<&str> for LocalizedText {
    fn from(text: &str) -> Self {
        LocalizedText::Plain(text.to_string())
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.display())
    }
}

/// A selectable movement from the coach's exercise library (read-only)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseReference {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: LocalizedText,
    pub category: String,
}

// ============================================================================
// Prescription Types
// ============================================================================

/// Repetition prescription for an exercise entry
///
/// `Raw` only exists while editing; normalization turns it into `Fixed`
/// or `Scheme` before anything is persisted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Reps {
    Fixed(i32),
    Scheme(Vec<i32>),
    Raw(String),
}

impl Default for Reps {
    fn default() -> Self {
        Reps::Fixed(0)
    }
}

impl fmt::Display for Reps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reps::Fixed(n) => write!(f, "{}", n),
            Reps::Scheme(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                f.write_str(&parts.join(","))
            }
            Reps::Raw(raw) => f.write_str(raw),
        }
    }
}

/// A single planned exercise inside a day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseEntry {
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub exercise_id: String,
    /// Name copied from the library when the entry was created
    pub exercise_name: String,
    pub sets: u32,
    pub reps: Reps,
    /// Rest between sets, in seconds
    pub rest: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) has_variable_reps: Option<bool>,
}

impl ExerciseEntry {
    /// Whether the reps, once normalized, form a multi-value scheme
    pub fn has_variable_reps(&self) -> bool {
        self.has_variable_reps.unwrap_or(false)
    }
}

/// Partial update for an exercise entry
///
/// The library identity (`exercise_id`, `exercise_name`) and the derived
/// variable-reps flag are deliberately absent: they cannot be patched.
#[derive(Clone, Debug, Default)]
pub struct ExercisePatch {
    pub sets: Option<u32>,
    pub reps: Option<Reps>,
    pub rest: Option<u32>,
    /// `Some(None)` removes the entry from its superset
    pub superset_id: Option<Option<String>>,
    pub category_filter: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl ExercisePatch {
    pub fn is_empty(&self) -> bool {
        self.sets.is_none()
            && self.reps.is_none()
            && self.rest.is_none()
            && self.superset_id.is_none()
            && self.category_filter.is_none()
            && self.notes.is_none()
    }

    pub(crate) fn apply(self, entry: &mut ExerciseEntry) {
        if let Some(sets) = self.sets {
            entry.sets = sets;
        }
        if let Some(reps) = self.reps {
            let normalized = crate::serializer::parse_reps(&reps);
            entry.has_variable_reps = Some(crate::serializer::has_variable_reps(&normalized));
            entry.reps = reps;
        }
        if let Some(rest) = self.rest {
            entry.rest = rest;
        }
        if let Some(superset_id) = self.superset_id {
            entry.superset_id = superset_id;
        }
        if let Some(category_filter) = self.category_filter {
            entry.category_filter = category_filter;
        }
        if let Some(notes) = self.notes {
            entry.notes = notes;
        }
    }
}

// ============================================================================
// Structure Types
// ============================================================================

/// One training session: exercises in execution order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
}

impl Day {
    pub fn entry(&self, entry_id: &str) -> Option<&ExerciseEntry> {
        self.exercises.iter().find(|e| e.id == entry_id)
    }
}

/// An ordered block of days that repeats `repeat_count` times
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub id: String,
    pub name: String,
    pub repeat_count: u32,
    pub days: Vec<Day>,
}

impl Cycle {
    pub fn day(&self, day_id: &str) -> Option<&Day> {
        self.days.iter().find(|d| d.id == day_id)
    }
}

/// A multi-week training program
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgramStructure {
    pub name: String,
    /// Training days per week; also the per-cycle day cap
    pub frequency: u32,
    pub cycles: Vec<Cycle>,
}

impl ProgramStructure {
    pub fn cycle(&self, cycle_id: &str) -> Option<&Cycle> {
        self.cycles.iter().find(|c| c.id == cycle_id)
    }

    /// Total length in weeks, rounded up
    pub fn duration_weeks(&self) -> u32 {
        crate::serializer::compute_duration(self)
    }

    /// Iterate every entry in program order
    pub fn entries(&self) -> impl Iterator<Item = &ExerciseEntry> {
        self.cycles
            .iter()
            .flat_map(|c| c.days.iter())
            .flat_map(|d| d.exercises.iter())
    }
}

// ============================================================================
// Serde helpers
// ============================================================================

/// Accept ids persisted either as strings or as bare numbers
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}
