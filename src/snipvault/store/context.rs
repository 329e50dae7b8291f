//! # Storage Context
//!
//! [`StoreContext`] wraps the active schema store, delegates the whole
//! [`SnippetStore`] surface to it unchanged, and owns the convert-and-switch
//! migration between the two schemas.
//!
//! Migration runs through `&mut self`, so the borrow checker serializes it
//! statically: there is never more than one outstanding conversion, without
//! a runtime lock.
//!
//! ## Failure posture
//!
//! A conversion must always leave the system on *some* usable store rather
//! than stuck mid-migration:
//!
//! - A failing merge falls back to persisting the un-merged converted data.
//! - A failing source cleanup is logged and reported, never fatal — the new
//!   schema is already durable at that point.
//! - There is no rollback journal; the state store has no transactions, and
//!   whichever writes completed stay in place.

use super::backend::{write_flag, StateStore};
use super::factory;
use super::v1::IdStore;
use super::v2::PathStore;
use super::{SnippetStore, KEY_DIRECTORIES_LEGACY, KEY_MIGRATION_DONE, KEY_SNIPPETS_LEGACY};
use crate::codec;
use crate::convert::{self, PathTree, Rename};
use crate::error::{Result, VaultError};
use crate::model::{
    child_dir_path, normalize_dir_path, parent_dir_path, Directory, PathDirectory, PathSnippet,
    SchemaVersion, Snippet,
};

/// The schema store currently in charge. Both variants share the same
/// underlying state store handle.
pub enum ActiveStore<B: StateStore> {
    V1(IdStore<B>),
    V2(PathStore<B>),
}

impl<B: StateStore> ActiveStore<B> {
    pub fn as_store(&self) -> &dyn SnippetStore {
        match self {
            ActiveStore::V1(store) => store,
            ActiveStore::V2(store) => store,
        }
    }

    pub fn as_store_mut(&mut self) -> &mut dyn SnippetStore {
        match self {
            ActiveStore::V1(store) => store,
            ActiveStore::V2(store) => store,
        }
    }
}

/// Knobs for [`StoreContext::convert_to_v2`].
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    /// Re-run the conversion even when the path schema is already active.
    pub force: bool,
    /// Union the converted records with any data already present in the
    /// path schema instead of overwriting it.
    pub merge: bool,
    /// Clear the ID-schema keys once the converted data is durable.
    pub delete_source: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            force: false,
            merge: true,
            delete_source: false,
        }
    }
}

/// What a conversion did.
#[derive(Debug)]
pub struct MigrationReport {
    pub target: SchemaVersion,
    /// False when the conversion was skipped as a no-op.
    pub converted: bool,
    pub directories: usize,
    pub snippets: usize,
    pub renamed: Vec<Rename>,
    /// The merge step failed and the un-merged converted data was persisted
    /// instead.
    pub merge_fell_back: bool,
    /// Deleting the old schema's keys failed; the new data is unaffected.
    pub source_cleanup_failed: bool,
}

impl MigrationReport {
    fn skipped(target: SchemaVersion) -> Self {
        Self {
            target,
            converted: false,
            directories: 0,
            snippets: 0,
            renamed: Vec::new(),
            merge_fell_back: false,
            source_cleanup_failed: false,
        }
    }
}

/// Wraps the active schema store and orchestrates migration between them.
pub struct StoreContext<B: StateStore + Clone> {
    backend: B,
    active: ActiveStore<B>,
}

impl<B: StateStore + Clone> StoreContext<B> {
    /// Builds a context on the store picked by the factory rule.
    pub fn new(backend: B, preferred: SchemaVersion) -> Result<Self> {
        let active = factory::create_store(&backend, preferred)?;
        Ok(Self { backend, active })
    }

    pub fn version(&self) -> SchemaVersion {
        self.active.as_store().version()
    }

    pub fn migration_completed(&self) -> Result<bool> {
        super::backend::read_flag(&self.backend, KEY_MIGRATION_DONE)
    }

    /// Converts all ID-schema records to the path schema and makes the path
    /// store active. See [`ConvertOptions`] for the knobs.
    pub fn convert_to_v2(&mut self, options: ConvertOptions) -> Result<MigrationReport> {
        if self.version() == SchemaVersion::V2 && !options.force {
            tracing::debug!("convert_to_v2: path schema already active, nothing to do");
            return Ok(MigrationReport::skipped(SchemaVersion::V2));
        }

        let mut source = IdStore::new(self.backend.clone());
        let source_snippets = source.id_snippets()?;
        let source_dirs = source.id_directories()?;
        let target = PathStore::new(self.backend.clone());

        // Nothing to convert: still switch, so future writes land in the
        // new schema.
        if source_snippets.is_empty() && source_dirs.is_empty() {
            self.finish_v2_switch(target);
            return Ok(MigrationReport {
                target: SchemaVersion::V2,
                converted: true,
                directories: 0,
                snippets: 0,
                renamed: Vec::new(),
                merge_fell_back: false,
                source_cleanup_failed: false,
            });
        }

        let converted = convert::id_tree_to_paths(&source_dirs, &source_snippets);

        // A broken v2 key makes has_data fail; assume data is present and
        // let the merge attempt decide.
        let existing_present = PathStore::has_data(&self.backend).unwrap_or(true);
        let (tree, renamed, merge_fell_back) = if options.merge && existing_present {
            match Self::read_existing(&target) {
                Ok(existing) => {
                    let outcome = convert::merge_trees(existing, converted);
                    (outcome.tree, outcome.renamed, false)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "merge failed, persisting un-merged converted data");
                    (converted, Vec::new(), true)
                }
            }
        } else {
            (converted, Vec::new(), false)
        };

        let directories = tree.directories.len();
        let snippets = tree.snippets.len();
        target.store_directories(tree.directories)?;
        target.store_snippets(tree.snippets)?;

        let mut source_cleanup_failed = false;
        if options.delete_source {
            if let Err(err) = source.wipe() {
                // The converted data is already durable; never roll back.
                tracing::warn!(error = %err, "failed to clear id-schema keys after conversion");
                source_cleanup_failed = true;
            }
        }

        self.finish_v2_switch(target);

        Ok(MigrationReport {
            target: SchemaVersion::V2,
            converted: true,
            directories,
            snippets,
            renamed,
            merge_fell_back,
            source_cleanup_failed,
        })
    }

    /// Converts all path-schema records back to the ID schema (the legacy
    /// fallback path) and makes the ID store active. No merge semantics:
    /// the converted records replace whatever the ID schema held.
    pub fn convert_to_v1(&mut self, force: bool) -> Result<MigrationReport> {
        if self.version() == SchemaVersion::V1 && !force {
            tracing::debug!("convert_to_v1: id schema already active, nothing to do");
            return Ok(MigrationReport::skipped(SchemaVersion::V1));
        }

        let mut source = PathStore::new(self.backend.clone());
        let source_dirs = source.path_directories()?;
        let source_snippets = source.path_snippets()?;

        let tree = convert::paths_to_id_tree(&source_dirs, &source_snippets);
        let directories = tree.directories.len();
        let snippets = tree.snippets.len();

        // Directories first: snippets reference their ids.
        let target = IdStore::new(self.backend.clone());
        target.store_directories(tree.directories)?;
        target.store_snippets(tree.snippets)?;

        // Leaving the v2 keys in place would make the sticky factory rule
        // re-activate the path schema on the next startup.
        let mut source_cleanup_failed = false;
        if let Err(err) = source.wipe() {
            tracing::warn!(error = %err, "failed to clear path-schema keys after conversion");
            source_cleanup_failed = true;
        }
        if let Err(err) = write_flag(&self.backend, KEY_MIGRATION_DONE, false) {
            tracing::warn!(error = %err, "failed to reset migration flag");
        }

        self.active = ActiveStore::V1(target);

        Ok(MigrationReport {
            target: SchemaVersion::V1,
            converted: true,
            directories,
            snippets,
            renamed: Vec::new(),
            merge_fell_back: false,
            source_cleanup_failed,
        })
    }

    /// Removes the pre-versioning flat arrays. The versioned keys of both
    /// schemas are untouched.
    pub fn clear_legacy_data(&mut self) -> Result<()> {
        self.backend.remove(KEY_SNIPPETS_LEGACY)?;
        self.backend.remove(KEY_DIRECTORIES_LEGACY)?;
        // The v1 store may have served reads from the legacy arrays.
        self.active.as_store_mut().clear_cache();
        Ok(())
    }

    /// Renames a directory. In the path schema the new name cascades to
    /// every descendant path; in the ID schema identity is untouched and
    /// only the name changes.
    pub fn rename_directory(&mut self, handle: &str, new_name: &str) -> Result<()> {
        match &mut self.active {
            ActiveStore::V1(store) => {
                let Some(mut dir) = store.id_directories()?.into_iter().find(|d| d.id == handle)
                else {
                    return Err(VaultError::UnknownIdentity(handle.to_string()));
                };
                dir.name = new_name.to_string();
                store.update_directory(Directory::Id(dir))
            }
            ActiveStore::V2(store) => {
                let directories = store.path_directories()?;
                let normalized = normalize_dir_path(handle);
                let Some(old_path) = directories
                    .iter()
                    .find(|d| {
                        codec::matches(handle, &d.full_path) || d.full_path == normalized
                    })
                    .map(|d| d.full_path.clone())
                else {
                    return Err(VaultError::UnknownIdentity(handle.to_string()));
                };

                let new_path = child_dir_path(&parent_dir_path(&old_path), new_name);
                if new_path == old_path {
                    return Ok(());
                }
                if directories.iter().any(|d| d.full_path == new_path) {
                    return Err(VaultError::DuplicateIdentity(new_path));
                }

                let rewritten_dirs: Vec<PathDirectory> = directories
                    .into_iter()
                    .map(|mut d| {
                        if d.full_path == old_path {
                            d.name = new_name.to_string();
                        }
                        if let Some(rest) = d.full_path.strip_prefix(&old_path) {
                            d.full_path = format!("{}{}", new_path, rest);
                        }
                        d
                    })
                    .collect();
                let rewritten_snippets: Vec<PathSnippet> = store
                    .path_snippets()?
                    .into_iter()
                    .map(|mut s| {
                        if let Some(rest) = s.full_path.strip_prefix(&old_path) {
                            s.full_path = format!("{}{}", new_path, rest);
                        }
                        s
                    })
                    .collect();

                store.store_directories(rewritten_dirs)?;
                store.store_snippets(rewritten_snippets)
            }
        }
    }

    fn read_existing(target: &PathStore<B>) -> Result<PathTree> {
        Ok(PathTree {
            directories: target.path_directories()?,
            snippets: target.path_snippets()?,
        })
    }

    fn finish_v2_switch(&mut self, target: PathStore<B>) {
        if let Err(err) = write_flag(&self.backend, KEY_MIGRATION_DONE, true) {
            // The data is in place; a missing flag only re-offers migration.
            tracing::warn!(error = %err, "failed to persist migration flag");
        }
        self.active = ActiveStore::V2(target);
    }
}

impl<B: StateStore + Clone> SnippetStore for StoreContext<B> {
    fn snippets(&self) -> Result<Vec<Snippet>> {
        self.active.as_store().snippets()
    }

    fn directories(&self) -> Result<Vec<Directory>> {
        self.active.as_store().directories()
    }

    fn save_snippet(&mut self, snippet: Snippet) -> Result<()> {
        self.active.as_store_mut().save_snippet(snippet)
    }

    fn update_snippet(&mut self, snippet: Snippet) -> Result<()> {
        self.active.as_store_mut().update_snippet(snippet)
    }

    fn delete_snippet(&mut self, handle: &str) -> Result<()> {
        self.active.as_store_mut().delete_snippet(handle)
    }

    fn create_directory(&mut self, directory: Directory) -> Result<()> {
        self.active.as_store_mut().create_directory(directory)
    }

    fn update_directory(&mut self, directory: Directory) -> Result<()> {
        self.active.as_store_mut().update_directory(directory)
    }

    fn delete_directory(&mut self, handle: &str) -> Result<()> {
        self.active.as_store_mut().delete_directory(handle)
    }

    fn clear_cache(&mut self) {
        self.active.as_store_mut().clear_cache()
    }

    fn version(&self) -> SchemaVersion {
        self.active.as_store().version()
    }

    fn wipe(&mut self) -> Result<()> {
        self.active.as_store_mut().wipe()
    }
}
