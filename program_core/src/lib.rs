#![forbid(unsafe_code)]

//! Core domain model and business logic for coach-built training programs.
//!
//! This crate provides:
//! - Domain types (cycles, days, exercise entries, rep prescriptions)
//! - The structure engine that edits programs under a per-cycle day cap
//! - Superset grouping
//! - Serialization: rep normalization, duration, legacy migration
//! - Editing sessions and program persistence
//! - The exercise library

pub mod types;
pub mod error;
pub mod ids;
pub mod config;
pub mod logging;
pub mod library;
pub mod serializer;
pub mod superset;
pub mod editor;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use library::{build_default_library, get_default_library, ExerciseLibrary};
pub use serializer::{
    build_payload, compute_duration, hydrate, parse_reps, ProgramPayload, StoredProgram,
};
pub use superset::{superset_groups, SupersetMode, SupersetSlot};
pub use editor::{DayKey, EditorSettings, ProgramEditor, Selection};
pub use session::{EditSession, SessionState};
pub use store::{JsonFileStore, ProgramStore};
