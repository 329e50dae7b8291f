//! # API Facade
//!
//! [`VaultApi`] is the single entry point for every snipvault operation,
//! regardless of the client driving it. It is a thin layer:
//!
//! - **Dispatches** to the storage context and returns structured types.
//! - **Normalizes inputs** — container arguments may arrive as raw ids,
//!   raw paths, or derived handles, and are resolved against the active
//!   schema before any store call.
//! - **Guards the sibling-uniqueness invariant** on creation, so the
//!   append-only store surface below never sees a colliding identity.
//!
//! No I/O assumptions live here: no stdout, no terminal, no process exit.
//! The CLI is just one client of this facade.

use crate::codec;
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::listing::{self, ListedDirectory, ListedSnippet};
use crate::model::{
    child_dir_path, normalize_dir_path, snippet_path, Directory, IdDirectory, IdSnippet,
    PathDirectory, PathSnippet, SchemaVersion, Snippet,
};
use crate::store::backend::StateStore;
use crate::store::context::{ConvertOptions, MigrationReport, StoreContext};
use crate::store::SnippetStore;

/// The main facade for vault operations, generic over the state store to
/// allow test doubles.
pub struct VaultApi<B: StateStore + Clone> {
    backend: B,
    context: StoreContext<B>,
}

impl<B: StateStore + Clone> VaultApi<B> {
    /// Opens the vault: loads the persisted configuration and lets the
    /// factory pick the schema store.
    pub fn open(backend: B) -> Result<Self> {
        let config = VaultConfig::load(&backend)?;
        let context = StoreContext::new(backend.clone(), config.schema_version)?;
        Ok(Self { backend, context })
    }

    pub fn version(&self) -> SchemaVersion {
        self.context.version()
    }

    pub fn migration_completed(&self) -> Result<bool> {
        self.context.migration_completed()
    }

    pub fn snippets(&self) -> Result<Vec<ListedSnippet>> {
        Ok(listing::list_snippets(self.context.snippets()?))
    }

    pub fn directories(&self) -> Result<Vec<ListedDirectory>> {
        Ok(listing::list_directories(self.context.directories()?))
    }

    /// Creates a snippet inside `container` (root when `None`). The
    /// container may be a directory id (V1), a path, or a derived handle
    /// (V2).
    pub fn create_snippet(
        &mut self,
        name: &str,
        code: &str,
        language: &str,
        container: Option<&str>,
    ) -> Result<ListedSnippet> {
        let snippet = match self.context.version() {
            SchemaVersion::V1 => {
                let parent_id = container
                    .map(|c| self.resolve_container_v1(c))
                    .transpose()?;
                if self.context.snippets()?.iter().any(|s| {
                    matches!(s, Snippet::Id(existing)
                        if existing.parent_id == parent_id && existing.name == name)
                }) {
                    return Err(VaultError::DuplicateIdentity(name.to_string()));
                }
                Snippet::Id(IdSnippet::new(
                    name.to_string(),
                    code.to_string(),
                    language.to_string(),
                    parent_id,
                ))
            }
            SchemaVersion::V2 => {
                let parent_path = match container {
                    Some(c) => self.resolve_container_v2(c)?,
                    None => "/".to_string(),
                };
                let full_path = snippet_path(&parent_path, name);
                if self.context.snippets()?.iter().any(
                    |s| matches!(s, Snippet::Path(existing) if existing.full_path == full_path),
                ) {
                    return Err(VaultError::DuplicateIdentity(full_path));
                }
                Snippet::Path(PathSnippet::new(
                    full_path,
                    name.to_string(),
                    code.to_string(),
                    language.to_string(),
                ))
            }
        };

        let handle = listing::snippet_handle(&snippet);
        let location = match &snippet {
            Snippet::Id(s) => s.name.clone(),
            Snippet::Path(s) => s.full_path.clone(),
        };
        self.context.save_snippet(snippet.clone())?;
        Ok(ListedSnippet {
            handle,
            location,
            snippet,
        })
    }

    pub fn update_snippet(&mut self, snippet: Snippet) -> Result<()> {
        self.context.update_snippet(snippet)
    }

    pub fn delete_snippet(&mut self, handle: &str) -> Result<()> {
        self.context.delete_snippet(handle)
    }

    /// Creates a directory under `parent` (root when `None`).
    pub fn create_directory(
        &mut self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<ListedDirectory> {
        let directory = match self.context.version() {
            SchemaVersion::V1 => {
                let parent_id = parent.map(|p| self.resolve_container_v1(p)).transpose()?;
                Directory::Id(IdDirectory::new(name.to_string(), parent_id))
            }
            SchemaVersion::V2 => {
                let parent_path = match parent {
                    Some(p) => self.resolve_container_v2(p)?,
                    None => "/".to_string(),
                };
                Directory::Path(PathDirectory::new(
                    &child_dir_path(&parent_path, name),
                    name.to_string(),
                ))
            }
        };

        let handle = listing::directory_handle(&directory);
        let location = match &directory {
            Directory::Id(d) => d.name.clone(),
            Directory::Path(d) => d.full_path.clone(),
        };
        self.context.create_directory(directory.clone())?;
        Ok(ListedDirectory {
            handle,
            location,
            directory,
        })
    }

    pub fn delete_directory(&mut self, handle: &str) -> Result<()> {
        self.context.delete_directory(handle)
    }

    pub fn rename_directory(&mut self, handle: &str, new_name: &str) -> Result<()> {
        self.context.rename_directory(handle, new_name)
    }

    /// The migrate-to-path-schema command: convert, persist the preference,
    /// drop caches so the next view re-reads.
    pub fn migrate_to_path_schema(&mut self, options: ConvertOptions) -> Result<MigrationReport> {
        let report = self.context.convert_to_v2(options)?;
        let config = VaultConfig {
            schema_version: SchemaVersion::V2,
        };
        config.save(&self.backend)?;
        self.context.clear_cache();
        Ok(report)
    }

    /// The migrate-to-id-schema command (legacy fallback path).
    pub fn migrate_to_id_schema(&mut self, force: bool) -> Result<MigrationReport> {
        let report = self.context.convert_to_v1(force)?;
        let config = VaultConfig {
            schema_version: SchemaVersion::V1,
        };
        config.save(&self.backend)?;
        self.context.clear_cache();
        Ok(report)
    }

    /// The clear-legacy-data command.
    pub fn clear_legacy_data(&mut self) -> Result<()> {
        self.context.clear_legacy_data()
    }

    /// The force-refresh-view command: drop caches so the next read hits
    /// the state store.
    pub fn refresh(&mut self) {
        self.context.clear_cache();
    }

    pub fn preferred_schema(&self) -> Result<SchemaVersion> {
        Ok(VaultConfig::load(&self.backend)?.schema_version)
    }

    pub fn set_preferred_schema(&mut self, version: SchemaVersion) -> Result<()> {
        VaultConfig {
            schema_version: version,
        }
        .save(&self.backend)
    }

    fn resolve_container_v1(&self, container: &str) -> Result<String> {
        self.context
            .directories()?
            .iter()
            .find_map(|d| match d {
                Directory::Id(d) if d.id == container => Some(d.id.clone()),
                _ => None,
            })
            .ok_or_else(|| VaultError::UnknownIdentity(container.to_string()))
    }

    fn resolve_container_v2(&self, container: &str) -> Result<String> {
        let normalized = normalize_dir_path(container);
        if normalized == "/" {
            return Ok(normalized);
        }
        self.context
            .directories()?
            .iter()
            .find_map(|d| match d {
                Directory::Path(d)
                    if d.full_path == normalized || codec::matches(container, &d.full_path) =>
                {
                    Some(d.full_path.clone())
                }
                _ => None,
            })
            .ok_or_else(|| VaultError::UnknownIdentity(container.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem_backend::MemState;

    fn open_v2() -> VaultApi<MemState> {
        let backend = MemState::new();
        VaultConfig {
            schema_version: SchemaVersion::V2,
        }
        .save(&backend)
        .unwrap();
        VaultApi::open(backend).unwrap()
    }

    #[test]
    fn test_open_defaults_to_v1() {
        let api = VaultApi::open(MemState::new()).unwrap();
        assert_eq!(api.version(), SchemaVersion::V1);
    }

    #[test]
    fn test_create_snippet_at_root_v2() {
        let mut api = open_v2();
        let listed = api.create_snippet("scratch", "x", "rust", None).unwrap();
        assert_eq!(listed.location, "/scratch");

        let all = api.snippets().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].handle, listed.handle);
    }

    #[test]
    fn test_create_snippet_in_directory_by_handle() {
        let mut api = open_v2();
        let dir = api.create_directory("lims", None).unwrap();

        // Container given as the derived handle rather than the path.
        let listed = api
            .create_snippet("template", "x=1", "python", Some(&dir.handle))
            .unwrap();
        assert_eq!(listed.location, "/lims/template");
    }

    #[test]
    fn test_create_duplicate_snippet_rejected() {
        let mut api = open_v2();
        api.create_snippet("scratch", "x", "rust", None).unwrap();

        let result = api.create_snippet("scratch", "y", "rust", None);
        assert!(matches!(result, Err(VaultError::DuplicateIdentity(_))));
    }

    #[test]
    fn test_create_in_unknown_container_rejected() {
        let mut api = open_v2();
        let result = api.create_snippet("x", "c", "rust", Some("/ghost/"));
        assert!(matches!(result, Err(VaultError::UnknownIdentity(_))));
    }

    #[test]
    fn test_v1_create_and_duplicate_guard() {
        let mut api = VaultApi::open(MemState::new()).unwrap();
        let dir = api.create_directory("lims", None).unwrap();
        api.create_snippet("template", "x", "python", Some(&dir.handle))
            .unwrap();

        let result = api.create_snippet("template", "y", "python", Some(&dir.handle));
        assert!(matches!(result, Err(VaultError::DuplicateIdentity(_))));

        // Same name at root is fine: uniqueness is per sibling set.
        api.create_snippet("template", "y", "python", None).unwrap();
    }

    #[test]
    fn test_migrate_command_updates_preference() {
        let backend = MemState::new();
        let mut api = VaultApi::open(backend.clone()).unwrap();
        api.create_snippet("scratch", "x", "rust", None).unwrap();

        let report = api
            .migrate_to_path_schema(ConvertOptions::default())
            .unwrap();
        assert!(report.converted);
        assert_eq!(api.version(), SchemaVersion::V2);
        assert_eq!(api.preferred_schema().unwrap(), SchemaVersion::V2);

        // Reopening lands on v2 both by preference and by data presence.
        let reopened = VaultApi::open(backend).unwrap();
        assert_eq!(reopened.version(), SchemaVersion::V2);
        assert_eq!(reopened.snippets().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_by_listed_handle() {
        let mut api = open_v2();
        let listed = api.create_snippet("scratch", "x", "rust", None).unwrap();

        api.delete_snippet(&listed.handle).unwrap();
        assert!(api.snippets().unwrap().is_empty());

        // Deleting again is an idempotent no-op.
        api.delete_snippet(&listed.handle).unwrap();
    }
}
