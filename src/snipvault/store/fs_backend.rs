use super::backend::StateStore;
use crate::error::Result;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File-backed state store: one JSON object file mapping keys to values,
/// mirroring the flat key-value layout of an editor's global state.
///
/// Every write rewrites the whole file atomically (write to tmp then
/// rename), so a crash mid-write never leaves a truncated store behind.
/// Cloning yields a second handle onto the same file.
#[derive(Clone)]
pub struct FsState {
    state_file: PathBuf,
}

impl FsState {
    pub fn new<P: AsRef<Path>>(state_file: P) -> Self {
        Self {
            state_file: state_file.as_ref().to_path_buf(),
        }
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    fn load(&self) -> Result<Map<String, Value>> {
        if !self.state_file.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.state_file)?;
        let entries: Map<String, Value> = serde_json::from_str(&content)?;
        Ok(entries)
    }

    fn persist(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(dir) = self.state_file.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let content = serde_json::to_string_pretty(entries)?;

        // Atomic write
        let tmp_file = self
            .state_file
            .with_file_name(format!(".state-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, content)?;
        fs::rename(&tmp_file, &self.state_file)?;

        Ok(())
    }
}

impl StateStore for FsState {
    fn read(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &Value) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.clone());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}
