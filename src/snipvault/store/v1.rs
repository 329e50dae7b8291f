use super::backend::{read_records, write_records, StateStore};
use super::{
    SnippetStore, KEY_DIRECTORIES_LEGACY, KEY_DIRECTORIES_V1, KEY_SNIPPETS_LEGACY, KEY_SNIPPETS_V1,
};
use crate::error::{Result, VaultError};
use crate::model::{Directory, IdDirectory, IdSnippet, SchemaVersion, Snippet};
use std::cell::RefCell;
use std::collections::HashSet;

/// ID-indexed (V1) store: records carry an opaque `id` and reference their
/// containing directory through `parentId`.
///
/// Reads fall back to the legacy pre-versioning arrays (`snippets` /
/// `directories`) when the versioned keys hold no data; writes always go to
/// the versioned keys.
pub struct IdStore<B: StateStore> {
    backend: B,
    snippets: RefCell<Option<Vec<IdSnippet>>>,
    directories: RefCell<Option<Vec<IdDirectory>>>,
}

impl<B: StateStore> IdStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            snippets: RefCell::new(None),
            directories: RefCell::new(None),
        }
    }

    pub(crate) fn id_snippets(&self) -> Result<Vec<IdSnippet>> {
        if let Some(cached) = self.snippets.borrow().as_ref() {
            return Ok(cached.clone());
        }

        let mut records: Vec<IdSnippet> = read_records(&self.backend, KEY_SNIPPETS_V1)?;
        if records.is_empty() {
            records = read_records(&self.backend, KEY_SNIPPETS_LEGACY)?;
        }
        *self.snippets.borrow_mut() = Some(records.clone());
        Ok(records)
    }

    pub(crate) fn id_directories(&self) -> Result<Vec<IdDirectory>> {
        if let Some(cached) = self.directories.borrow().as_ref() {
            return Ok(cached.clone());
        }

        let mut records: Vec<IdDirectory> = read_records(&self.backend, KEY_DIRECTORIES_V1)?;
        if records.is_empty() {
            records = read_records(&self.backend, KEY_DIRECTORIES_LEGACY)?;
        }
        *self.directories.borrow_mut() = Some(records.clone());
        Ok(records)
    }

    pub(crate) fn store_snippets(&self, records: Vec<IdSnippet>) -> Result<()> {
        write_records(&self.backend, KEY_SNIPPETS_V1, &records)?;
        *self.snippets.borrow_mut() = Some(records);
        Ok(())
    }

    pub(crate) fn store_directories(&self, records: Vec<IdDirectory>) -> Result<()> {
        write_records(&self.backend, KEY_DIRECTORIES_V1, &records)?;
        *self.directories.borrow_mut() = Some(records);
        Ok(())
    }

    /// Ids of `root` and every directory reachable from it through
    /// `parentId` chains.
    fn descendant_dir_ids(directories: &[IdDirectory], root: &str) -> HashSet<String> {
        let mut ids: HashSet<String> = HashSet::new();
        ids.insert(root.to_string());

        loop {
            let before = ids.len();
            for dir in directories {
                if let Some(parent) = &dir.parent_id {
                    if ids.contains(parent) {
                        ids.insert(dir.id.clone());
                    }
                }
            }
            if ids.len() == before {
                break;
            }
        }

        ids
    }
}

impl<B: StateStore> SnippetStore for IdStore<B> {
    fn snippets(&self) -> Result<Vec<Snippet>> {
        Ok(self.id_snippets()?.into_iter().map(Snippet::Id).collect())
    }

    fn directories(&self) -> Result<Vec<Directory>> {
        Ok(self
            .id_directories()?
            .into_iter()
            .map(Directory::Id)
            .collect())
    }

    fn save_snippet(&mut self, snippet: Snippet) -> Result<()> {
        let record = match snippet {
            Snippet::Id(s) => s,
            Snippet::Path(_) => return Err(VaultError::SchemaMismatch("v1")),
        };

        let mut snippets = self.id_snippets()?;
        snippets.push(record);
        self.store_snippets(snippets)
    }

    fn update_snippet(&mut self, snippet: Snippet) -> Result<()> {
        let record = match snippet {
            Snippet::Id(s) => s,
            Snippet::Path(_) => return Err(VaultError::SchemaMismatch("v1")),
        };

        let mut snippets = self.id_snippets()?;
        match snippets.iter_mut().find(|s| s.id == record.id) {
            Some(existing) => *existing = record,
            None => return Err(VaultError::UnknownIdentity(record.id)),
        }
        self.store_snippets(snippets)
    }

    fn delete_snippet(&mut self, handle: &str) -> Result<()> {
        let mut snippets = self.id_snippets()?;
        let before = snippets.len();
        snippets.retain(|s| s.id != handle);

        if snippets.len() == before {
            tracing::warn!(handle, "delete_snippet: no v1 record matched, nothing removed");
            return Ok(());
        }
        self.store_snippets(snippets)
    }

    fn create_directory(&mut self, directory: Directory) -> Result<()> {
        let record = match directory {
            Directory::Id(d) => d,
            Directory::Path(_) => return Err(VaultError::SchemaMismatch("v1")),
        };

        let mut directories = self.id_directories()?;
        if directories.iter().any(|d| d.id == record.id) {
            return Err(VaultError::DuplicateIdentity(record.id));
        }
        if directories
            .iter()
            .any(|d| d.parent_id == record.parent_id && d.name == record.name)
        {
            return Err(VaultError::DuplicateIdentity(record.name));
        }

        directories.push(record);
        self.store_directories(directories)
    }

    fn update_directory(&mut self, directory: Directory) -> Result<()> {
        let record = match directory {
            Directory::Id(d) => d,
            Directory::Path(_) => return Err(VaultError::SchemaMismatch("v1")),
        };

        let mut directories = self.id_directories()?;
        match directories.iter_mut().find(|d| d.id == record.id) {
            Some(existing) => *existing = record,
            None => return Err(VaultError::UnknownIdentity(record.id)),
        }
        self.store_directories(directories)
    }

    fn delete_directory(&mut self, handle: &str) -> Result<()> {
        let directories = self.id_directories()?;
        if !directories.iter().any(|d| d.id == handle) {
            tracing::warn!(handle, "delete_directory: no v1 record matched, nothing removed");
            return Ok(());
        }

        let doomed = Self::descendant_dir_ids(&directories, handle);

        let remaining_dirs: Vec<IdDirectory> = directories
            .into_iter()
            .filter(|d| !doomed.contains(&d.id))
            .collect();
        let remaining_snippets: Vec<IdSnippet> = self
            .id_snippets()?
            .into_iter()
            .filter(|s| {
                s.parent_id
                    .as_ref()
                    .map(|p| !doomed.contains(p))
                    .unwrap_or(true)
            })
            .collect();

        self.store_directories(remaining_dirs)?;
        self.store_snippets(remaining_snippets)
    }

    fn clear_cache(&mut self) {
        *self.snippets.borrow_mut() = None;
        *self.directories.borrow_mut() = None;
    }

    fn version(&self) -> SchemaVersion {
        SchemaVersion::V1
    }

    fn wipe(&mut self) -> Result<()> {
        self.backend.remove(KEY_SNIPPETS_V1)?;
        self.backend.remove(KEY_DIRECTORIES_V1)?;
        self.backend.remove(KEY_SNIPPETS_LEGACY)?;
        self.backend.remove(KEY_DIRECTORIES_LEGACY)?;
        self.clear_cache();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::write_records;
    use crate::store::mem_backend::MemState;

    fn make_store() -> IdStore<MemState> {
        IdStore::new(MemState::new())
    }

    fn snippet(id: &str, name: &str, parent: Option<&str>) -> IdSnippet {
        let mut s = IdSnippet::new(name.into(), "code".into(), "rust".into(), None);
        s.id = id.to_string();
        s.parent_id = parent.map(String::from);
        s
    }

    fn directory(id: &str, name: &str, parent: Option<&str>) -> IdDirectory {
        let mut d = IdDirectory::new(name.into(), parent.map(String::from));
        d.id = id.to_string();
        d
    }

    #[test]
    fn test_save_and_list() {
        let mut store = make_store();
        store.save_snippet(Snippet::Id(snippet("s1", "a", None))).unwrap();
        store.save_snippet(Snippet::Id(snippet("s2", "b", None))).unwrap();

        let all = store.snippets().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name(), "a");
    }

    #[test]
    fn test_legacy_fallback_read() {
        let backend = MemState::new();
        write_records(&backend, KEY_SNIPPETS_LEGACY, &[snippet("s1", "old", None)]).unwrap();
        write_records(&backend, KEY_DIRECTORIES_LEGACY, &[directory("d1", "dir", None)])
            .unwrap();

        let store = IdStore::new(backend);
        assert_eq!(store.snippets().unwrap().len(), 1);
        assert_eq!(store.directories().unwrap().len(), 1);
    }

    #[test]
    fn test_versioned_keys_shadow_legacy() {
        let backend = MemState::new();
        write_records(&backend, KEY_SNIPPETS_LEGACY, &[snippet("s1", "old", None)]).unwrap();
        write_records(&backend, KEY_SNIPPETS_V1, &[snippet("s2", "new", None)]).unwrap();

        let store = IdStore::new(backend);
        let all = store.snippets().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name(), "new");
    }

    #[test]
    fn test_update_snippet() {
        let mut store = make_store();
        store.save_snippet(Snippet::Id(snippet("s1", "a", None))).unwrap();

        let mut changed = snippet("s1", "a", None);
        changed.code = "updated".into();
        store.update_snippet(Snippet::Id(changed)).unwrap();

        assert_eq!(store.snippets().unwrap()[0].code(), "updated");
    }

    #[test]
    fn test_update_missing_snippet_fails() {
        let mut store = make_store();
        let result = store.update_snippet(Snippet::Id(snippet("ghost", "a", None)));
        assert!(matches!(result, Err(VaultError::UnknownIdentity(_))));
    }

    #[test]
    fn test_delete_missing_snippet_is_noop() {
        let mut store = make_store();
        store.save_snippet(Snippet::Id(snippet("s1", "a", None))).unwrap();

        store.delete_snippet("nope").unwrap();
        assert_eq!(store.snippets().unwrap().len(), 1);
    }

    #[test]
    fn test_create_duplicate_directory_fails() {
        let mut store = make_store();
        store
            .create_directory(Directory::Id(directory("d1", "lims", None)))
            .unwrap();

        let result = store.create_directory(Directory::Id(directory("d1", "other", None)));
        assert!(matches!(result, Err(VaultError::DuplicateIdentity(_))));

        // Same name under the same parent is also a conflict.
        let result = store.create_directory(Directory::Id(directory("d2", "lims", None)));
        assert!(matches!(result, Err(VaultError::DuplicateIdentity(_))));
    }

    #[test]
    fn test_delete_directory_cascades() {
        let mut store = make_store();
        store.create_directory(Directory::Id(directory("d1", "a", None))).unwrap();
        store
            .create_directory(Directory::Id(directory("d2", "sub", Some("d1"))))
            .unwrap();
        store.create_directory(Directory::Id(directory("d3", "b", None))).unwrap();
        store.save_snippet(Snippet::Id(snippet("s1", "in-a", Some("d1")))).unwrap();
        store.save_snippet(Snippet::Id(snippet("s2", "in-sub", Some("d2")))).unwrap();
        store.save_snippet(Snippet::Id(snippet("s3", "in-b", Some("d3")))).unwrap();

        store.delete_directory("d1").unwrap();

        let dirs = store.directories().unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].name(), "b");

        let snippets = store.snippets().unwrap();
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].name(), "in-b");
    }

    #[test]
    fn test_rejects_path_records() {
        let mut store = make_store();
        let foreign = Snippet::Path(crate::model::PathSnippet::new(
            "/a/x".into(),
            "x".into(),
            "c".into(),
            "rust".into(),
        ));
        assert!(matches!(
            store.save_snippet(foreign),
            Err(VaultError::SchemaMismatch("v1"))
        ));
    }

    #[test]
    fn test_wipe_clears_all_v1_keys() {
        let backend = MemState::new();
        write_records(&backend, KEY_SNIPPETS_LEGACY, &[snippet("s1", "old", None)]).unwrap();

        let mut store = IdStore::new(backend.clone());
        store.save_snippet(Snippet::Id(snippet("s2", "new", None))).unwrap();
        store.wipe().unwrap();

        assert!(backend.keys().is_empty());
        assert!(store.snippets().unwrap().is_empty());
    }

    #[test]
    fn test_mutation_updates_cache_in_lockstep() {
        let mut store = make_store();
        // Warm the cache.
        assert!(store.snippets().unwrap().is_empty());
        store.save_snippet(Snippet::Id(snippet("s1", "a", None))).unwrap();
        assert_eq!(store.snippets().unwrap().len(), 1);
    }
}
