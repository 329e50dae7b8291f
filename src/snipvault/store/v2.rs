use super::backend::{read_records, write_records, StateStore};
use super::{SnippetStore, KEY_DIRECTORIES_V2, KEY_SNIPPETS_V2};
use crate::codec;
use crate::error::{Result, VaultError};
use crate::model::{
    normalize_dir_path, Directory, PathDirectory, PathSnippet, SchemaVersion, Snippet,
};
use std::cell::RefCell;

/// Path-indexed (V2) store: a record's `fullPath` is its identity.
///
/// Deletion accepts three identifier shapes, tried in order: the derived
/// handle of a path, the raw path itself, and the legacy `id` member some
/// older arrays still carry. First match wins.
pub struct PathStore<B: StateStore> {
    backend: B,
    snippets: RefCell<Option<Vec<PathSnippet>>>,
    directories: RefCell<Option<Vec<PathDirectory>>>,
}

impl<B: StateStore> PathStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            snippets: RefCell::new(None),
            directories: RefCell::new(None),
        }
    }

    /// Whether any path-schema data is persisted. Consulted by the factory:
    /// presence of V2 data is a sticky signal that outranks configuration.
    pub fn has_data(backend: &B) -> Result<bool> {
        let snippets: Vec<PathSnippet> = read_records(backend, KEY_SNIPPETS_V2)?;
        if !snippets.is_empty() {
            return Ok(true);
        }
        let directories: Vec<PathDirectory> = read_records(backend, KEY_DIRECTORIES_V2)?;
        Ok(!directories.is_empty())
    }

    pub(crate) fn path_snippets(&self) -> Result<Vec<PathSnippet>> {
        if let Some(cached) = self.snippets.borrow().as_ref() {
            return Ok(cached.clone());
        }

        let records: Vec<PathSnippet> = read_records(&self.backend, KEY_SNIPPETS_V2)?;
        *self.snippets.borrow_mut() = Some(records.clone());
        Ok(records)
    }

    pub(crate) fn path_directories(&self) -> Result<Vec<PathDirectory>> {
        if let Some(cached) = self.directories.borrow().as_ref() {
            return Ok(cached.clone());
        }

        let records: Vec<PathDirectory> = read_records(&self.backend, KEY_DIRECTORIES_V2)?;
        *self.directories.borrow_mut() = Some(records.clone());
        Ok(records)
    }

    pub(crate) fn store_snippets(&self, records: Vec<PathSnippet>) -> Result<()> {
        write_records(&self.backend, KEY_SNIPPETS_V2, &records)?;
        *self.snippets.borrow_mut() = Some(records);
        Ok(())
    }

    pub(crate) fn store_directories(&self, records: Vec<PathDirectory>) -> Result<()> {
        write_records(&self.backend, KEY_DIRECTORIES_V2, &records)?;
        *self.directories.borrow_mut() = Some(records);
        Ok(())
    }

    /// Resolves a delete identifier against a snippet record.
    fn snippet_matches(record: &PathSnippet, handle: &str) -> bool {
        codec::matches(handle, &record.full_path)
            || record.full_path == handle
            || record.id.as_deref() == Some(handle)
    }

    /// Resolves a delete identifier to a directory path.
    fn resolve_directory_path(directories: &[PathDirectory], handle: &str) -> Option<String> {
        directories
            .iter()
            .find(|d| codec::matches(handle, &d.full_path) || d.full_path == handle)
            .map(|d| d.full_path.clone())
            .or_else(|| {
                // A raw path may arrive without normalization.
                let normalized = normalize_dir_path(handle);
                directories
                    .iter()
                    .find(|d| d.full_path == normalized)
                    .map(|d| d.full_path.clone())
            })
    }
}

impl<B: StateStore> SnippetStore for PathStore<B> {
    fn snippets(&self) -> Result<Vec<Snippet>> {
        Ok(self
            .path_snippets()?
            .into_iter()
            .map(Snippet::Path)
            .collect())
    }

    fn directories(&self) -> Result<Vec<Directory>> {
        Ok(self
            .path_directories()?
            .into_iter()
            .map(Directory::Path)
            .collect())
    }

    fn save_snippet(&mut self, snippet: Snippet) -> Result<()> {
        let record = match snippet {
            Snippet::Path(s) => s,
            Snippet::Id(_) => return Err(VaultError::SchemaMismatch("v2")),
        };

        let mut snippets = self.path_snippets()?;
        snippets.push(record);
        self.store_snippets(snippets)
    }

    fn update_snippet(&mut self, snippet: Snippet) -> Result<()> {
        let record = match snippet {
            Snippet::Path(s) => s,
            Snippet::Id(_) => return Err(VaultError::SchemaMismatch("v2")),
        };

        let mut snippets = self.path_snippets()?;
        match snippets.iter_mut().find(|s| s.full_path == record.full_path) {
            Some(existing) => *existing = record,
            None => return Err(VaultError::UnknownIdentity(record.full_path)),
        }
        self.store_snippets(snippets)
    }

    fn delete_snippet(&mut self, handle: &str) -> Result<()> {
        let mut snippets = self.path_snippets()?;
        match snippets.iter().position(|s| Self::snippet_matches(s, handle)) {
            Some(idx) => {
                snippets.remove(idx);
                self.store_snippets(snippets)
            }
            None => {
                tracing::warn!(handle, "delete_snippet: no v2 record matched, nothing removed");
                Ok(())
            }
        }
    }

    fn create_directory(&mut self, directory: Directory) -> Result<()> {
        let mut record = match directory {
            Directory::Path(d) => d,
            Directory::Id(_) => return Err(VaultError::SchemaMismatch("v2")),
        };
        record.full_path = normalize_dir_path(&record.full_path);

        let mut directories = self.path_directories()?;
        if directories.iter().any(|d| d.full_path == record.full_path) {
            return Err(VaultError::DuplicateIdentity(record.full_path));
        }

        directories.push(record);
        self.store_directories(directories)
    }

    fn update_directory(&mut self, directory: Directory) -> Result<()> {
        let record = match directory {
            Directory::Path(d) => d,
            Directory::Id(_) => return Err(VaultError::SchemaMismatch("v2")),
        };

        let mut directories = self.path_directories()?;
        match directories
            .iter_mut()
            .find(|d| d.full_path == record.full_path)
        {
            Some(existing) => *existing = record,
            None => return Err(VaultError::UnknownIdentity(record.full_path)),
        }
        self.store_directories(directories)
    }

    fn delete_directory(&mut self, handle: &str) -> Result<()> {
        let directories = self.path_directories()?;
        let Some(prefix) = Self::resolve_directory_path(&directories, handle) else {
            tracing::warn!(handle, "delete_directory: no v2 record matched, nothing removed");
            return Ok(());
        };

        // The trailing slash on directory paths makes prefix matching exact:
        // deleting /a/ can never catch /ab/.
        let remaining_dirs: Vec<PathDirectory> = directories
            .into_iter()
            .filter(|d| !d.full_path.starts_with(&prefix))
            .collect();
        let remaining_snippets: Vec<PathSnippet> = self
            .path_snippets()?
            .into_iter()
            .filter(|s| !s.full_path.starts_with(&prefix))
            .collect();

        self.store_directories(remaining_dirs)?;
        self.store_snippets(remaining_snippets)
    }

    fn clear_cache(&mut self) {
        *self.snippets.borrow_mut() = None;
        *self.directories.borrow_mut() = None;
    }

    fn version(&self) -> SchemaVersion {
        SchemaVersion::V2
    }

    fn wipe(&mut self) -> Result<()> {
        self.backend.remove(KEY_SNIPPETS_V2)?;
        self.backend.remove(KEY_DIRECTORIES_V2)?;
        self.clear_cache();
        Ok(())
    }
}
