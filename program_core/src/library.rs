//! Exercise library: the movements a coach can add to programs.
//!
//! The engine only reads from the library. A built-in set of common
//! movements is always available; coaches can point the config at a CSV
//! file (`id,name,category`) to use their own.

use crate::types::{ExerciseReference, LocalizedText};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Cached built-in library - built once and reused across all operations
static DEFAULT_LIBRARY: Lazy<ExerciseLibrary> = Lazy::new(build_default_library);

/// Get a reference to the cached built-in library
pub fn get_default_library() -> &'static ExerciseLibrary {
    &DEFAULT_LIBRARY
}

/// An ordered set of exercise references
#[derive(Clone, Debug, Default)]
pub struct ExerciseLibrary {
    exercises: Vec<ExerciseReference>,
}

/// One row of a library CSV
#[derive(Debug, Deserialize)]
struct CsvRow {
    id: String,
    name: String,
    category: String,
}

impl ExerciseLibrary {
    pub fn new(exercises: Vec<ExerciseReference>) -> Self {
        Self { exercises }
    }

    /// Load a library from a CSV file with `id,name,category` headers
    pub fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;

        let mut exercises = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row?;
            exercises.push(ExerciseReference {
                id: row.id,
                name: LocalizedText::Plain(row.name),
                category: row.category,
            });
        }

        let library = Self { exercises };
        let errors = library.validate();
        if !errors.is_empty() {
            return Err(Error::LibraryValidation(errors.join("; ")));
        }

        tracing::info!("Loaded {} exercises from {:?}", library.len(), path);
        Ok(library)
    }

    pub fn exercises(&self) -> &[ExerciseReference] {
        &self.exercises
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&ExerciseReference> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Like [`find`](Self::find) but reports a missing id as an error
    pub fn get(&self, id: &str) -> Result<&ExerciseReference> {
        self.find(id).ok_or_else(|| Error::not_found("exercise reference", id))
    }

    pub fn by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a ExerciseReference> {
        self.exercises
            .iter()
            .filter(move |e| e.category.eq_ignore_ascii_case(category))
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.exercises
            .iter()
            .map(|e| e.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Validate library integrity
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut ids = HashSet::new();

        for exercise in &self.exercises {
            if exercise.id.trim().is_empty() {
                errors.push(format!(
                    "Exercise '{}' has an empty id",
                    exercise.name.display()
                ));
            } else if !ids.insert(exercise.id.as_str()) {
                errors.push(format!("Duplicate exercise id '{}'", exercise.id));
            }
            if exercise.name.display().trim().is_empty() {
                errors.push(format!("Exercise '{}' has an empty name", exercise.id));
            }
        }

        errors
    }
}

/// Builds the built-in library
///
/// **Note**: For production use, prefer `get_default_library()` which
/// returns a cached reference.
pub fn build_default_library() -> ExerciseLibrary {
    const BUILT_IN: &[(&str, &str, &str)] = &[
        ("back_squat", "Back Squat", "legs"),
        ("front_squat", "Front Squat", "legs"),
        ("walking_lunge", "Walking Lunge", "legs"),
        ("romanian_deadlift", "Romanian Deadlift", "hinge"),
        ("deadlift", "Deadlift", "hinge"),
        ("kb_swing", "Kettlebell Swing", "hinge"),
        ("bench_press", "Bench Press", "push"),
        ("overhead_press", "Overhead Press", "push"),
        ("push_up", "Push-up", "push"),
        ("pull_up", "Pull-up", "pull"),
        ("barbell_row", "Barbell Row", "pull"),
        ("face_pull", "Face Pull", "pull"),
        ("plank", "Plank", "core"),
        ("hanging_leg_raise", "Hanging Leg Raise", "core"),
        ("burpee", "Burpee", "conditioning"),
    ];

    ExerciseLibrary::new(
        BUILT_IN
            .iter()
            .map(|&(id, name, category)| ExerciseReference {
                id: id.into(),
                name: LocalizedText::localized(name),
                category: category.into(),
            })
            .collect(),
    )
}
