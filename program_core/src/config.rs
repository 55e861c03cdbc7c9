//! Configuration file support for coachprog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/coachprog/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub program: ProgramConfig,

    #[serde(default)]
    pub prescription: PrescriptionConfig,

    #[serde(default)]
    pub library: LibraryConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Program defaults and the labels used for generated names
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgramConfig {
    #[serde(default = "default_frequency")]
    pub default_frequency: u32,

    #[serde(default = "default_cycle_label")]
    pub cycle_label: String,

    #[serde(default = "default_session_label")]
    pub session_label: String,

    #[serde(default = "default_copy_suffix")]
    pub copy_suffix: String,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            default_frequency: default_frequency(),
            cycle_label: default_cycle_label(),
            session_label: default_session_label(),
            copy_suffix: default_copy_suffix(),
        }
    }
}

/// Prescription stamped on newly added exercises
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrescriptionConfig {
    #[serde(default = "default_sets")]
    pub sets: u32,

    #[serde(default = "default_reps")]
    pub reps: i32,

    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,
}

impl Default for PrescriptionConfig {
    fn default() -> Self {
        Self {
            sets: default_sets(),
            reps: default_reps(),
            rest_seconds: default_rest_seconds(),
        }
    }
}

/// Exercise library source
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct LibraryConfig {
    /// CSV file with `id,name,category` columns; built-in library when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("coachprog")
}

fn default_frequency() -> u32 {
    4
}

fn default_cycle_label() -> String {
    "Cycle".into()
}

fn default_session_label() -> String {
    "Day".into()
}

fn default_copy_suffix() -> String {
    "(Copy)".into()
}

fn default_sets() -> u32 {
    3
}

fn default_reps() -> i32 {
    12
}

fn default_rest_seconds() -> u32 {
    60
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.program.default_frequency == 0 {
            return Err(Error::Config(
                "program.default_frequency must be at least 1".into(),
            ));
        }
        if self.program.session_label.trim().is_empty() {
            return Err(Error::Config("program.session_label must not be empty".into()));
        }
        if self.program.cycle_label.trim().is_empty() {
            return Err(Error::Config("program.cycle_label must not be empty".into()));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("coachprog").join("config.toml")
    }

    /// Directory holding one JSON file per saved program
    pub fn programs_dir(&self) -> PathBuf {
        self.data.data_dir.join("programs")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.program.default_frequency, 4);
        assert_eq!(config.program.session_label, "Day");
        assert_eq!(config.prescription.sets, 3);
        assert_eq!(config.prescription.reps, 12);
        assert_eq!(config.prescription.rest_seconds, 60);
        assert!(config.library.path.is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.program.copy_suffix = "(copie)".into();
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.program.copy_suffix, "(copie)");
        assert_eq!(parsed.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[program]
session_label = "Session"

[prescription]
rest_seconds = 90
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.program.session_label, "Session");
        assert_eq!(config.program.default_frequency, 4); // default
        assert_eq!(config.prescription.rest_seconds, 90);
        assert_eq!(config.prescription.sets, 3); // default
    }

    #[test]
    fn test_zero_frequency_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[program]\ndefault_frequency = 0\n").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
