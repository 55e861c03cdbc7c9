//! Error types for the program_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for program_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Exercise library validation error
    #[error("Exercise library validation error: {0}")]
    LibraryValidation(String),

    /// A day add/copy would push a cycle past the weekly frequency
    #[error("Day limit reached: this program allows at most {frequency} days per cycle")]
    CapacityExceeded { frequency: u32 },

    /// Referenced cycle, day or exercise entry does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Reorder index outside the day's exercise list
    #[error("Index {index} out of range for {len} exercises")]
    IndexOutOfRange { index: usize, len: usize },

    /// Malformed `cycleId:dayId` reorder scope
    #[error("Invalid day key: {0}")]
    InvalidDayKey(String),

    /// Program rejected before it reached the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Program store rejected the save
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// The frequency limit carried by a capacity error, if this is one
    pub fn capacity_limit(&self) -> Option<u32> {
        match self {
            Error::CapacityExceeded { frequency } => Some(*frequency),
            _ => None,
        }
    }
}
