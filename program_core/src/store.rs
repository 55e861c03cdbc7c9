//! Program persistence with file locking.
//!
//! Programs are stored one JSON document per program. Writes go through a
//! locked temp file that is fsynced and renamed over the original, so a
//! reader never sees a half-written program.

use crate::serializer::{ProgramPayload, StoredProgram};
use crate::{Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Persistence upsert for program payloads
pub trait ProgramStore {
    /// Create (`payload.id == None`) or update a program; returns its id
    fn upsert(&mut self, payload: &ProgramPayload) -> Result<String>;

    /// Read a program back, `None` if the id is unknown
    fn load(&self, id: &str) -> Result<Option<StoredProgram>>;
}

/// Directory-backed store: `{dir}/{id}.json`
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::Persistence(format!("invalid program id '{}'", id)));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    /// Ids of every stored program, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Read the raw JSON document for a program under a shared lock
    pub fn read_raw(&self, id: &str) -> Result<Option<String>> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        Ok(Some(contents))
    }
}

impl ProgramStore for JsonFileStore {
    fn upsert(&mut self, payload: &ProgramPayload) -> Result<String> {
        let id = payload
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let path = self.path_for(&id)?;

        std::fs::create_dir_all(&self.dir)?;

        let mut stored = payload.clone();
        stored.id = Some(id.clone());

        // Temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(&stored)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::info!(
            "{} program {} at {:?}",
            if payload.id.is_some() { "Updated" } else { "Created" },
            id,
            path
        );
        Ok(id)
    }

    fn load(&self, id: &str) -> Result<Option<StoredProgram>> {
        let Some(contents) = self.read_raw(id)? else {
            tracing::debug!("No stored program {}", id);
            return Ok(None);
        };

        match StoredProgram::from_json(&contents) {
            Ok(program) => Ok(Some(program)),
            Err(e) => {
                tracing::warn!("Failed to parse stored program {}: {}", id, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorSettings;
    use crate::ids::SequentialIds;
    use crate::serializer::{build_payload, hydrate};

    fn payload(name: &str) -> ProgramPayload {
        let mut ids = SequentialIds::new("s");
        let mut structure = hydrate(None, &mut ids, &EditorSettings::default()).structure;
        structure.name = name.into();
        build_payload(None, &structure).unwrap()
    }

    #[test]
    fn test_create_assigns_id_and_loads_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(temp_dir.path().join("programs"));

        let id = store.upsert(&payload("Strength Base")).unwrap();
        assert!(!id.is_empty());

        let loaded = store.load(&id).unwrap().unwrap();
        assert_eq!(loaded.id.as_deref(), Some(id.as_str()));
        assert_eq!(loaded.name.unwrap().display(), "Strength Base");
        assert_eq!(store.list().unwrap(), vec![id]);
    }

    #[test]
    fn test_update_in_place() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(temp_dir.path());

        let id = store.upsert(&payload("v1")).unwrap();
        let mut second = payload("v2");
        second.id = Some(id.clone());
        assert_eq!(store.upsert(&second).unwrap(), id);

        assert_eq!(store.list().unwrap().len(), 1);
        let loaded = store.load(&id).unwrap().unwrap();
        assert_eq!(loaded.name.unwrap().display(), "v2");
    }

    #[test]
    fn test_load_unknown_returns_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        assert!(store.load("missing").unwrap().is_none());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        assert!(matches!(store.load("../etc"), Err(Error::Persistence(_))));
    }

    #[test]
    fn test_corrupted_program_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("broken.json"), "{ invalid json }").unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        assert!(matches!(store.load("broken"), Err(Error::Json(_))));
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(temp_dir.path());
        let id = store.upsert(&payload("Atomic")).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != format!("{}.json", id).as_str())
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only the program file, found extras: {:?}",
            extras
        );
    }
}
