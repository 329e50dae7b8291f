//! # Storage Layer
//!
//! Two schema stores implement the same [`SnippetStore`] surface over a
//! shared [`backend::StateStore`], hiding the V1/V2 difference from every
//! caller:
//!
//! - [`v1::IdStore`]: ID-indexed records (`id` / `parentId`), with a
//!   fallback read of the pre-versioning flat arrays.
//! - [`v2::PathStore`]: path-indexed records (`fullPath` is the identity).
//!
//! [`factory::create_store`] picks the store at startup;
//! [`context::StoreContext`] wraps the active one and owns the
//! convert-and-switch migration.
//!
//! ## Caching
//!
//! Each store keeps an in-memory copy of its record arrays, filled on first
//! read and dropped by `clear_cache`. Every mutation persists synchronously
//! to the state store and updates the cache in lockstep, so reads within the
//! same process never go stale.
//!
//! ## Persisted keys
//!
//! ```text
//! snippets, directories          # legacy pre-versioning arrays (fallback)
//! snippets.v1, directories.v1    # ID-schema arrays
//! snippets.v2, directories.v2    # path-schema arrays
//! migration.v2.completed         # migration flag, independent of the data
//! config                         # preferred schema version
//! ```

use crate::error::Result;
use crate::model::{Directory, SchemaVersion, Snippet};

pub mod backend;
pub mod context;
pub mod factory;
pub mod fs_backend;
pub mod mem_backend;
pub mod v1;
pub mod v2;

pub const KEY_SNIPPETS_LEGACY: &str = "snippets";
pub const KEY_DIRECTORIES_LEGACY: &str = "directories";
pub const KEY_SNIPPETS_V1: &str = "snippets.v1";
pub const KEY_DIRECTORIES_V1: &str = "directories.v1";
pub const KEY_SNIPPETS_V2: &str = "snippets.v2";
pub const KEY_DIRECTORIES_V2: &str = "directories.v2";
pub const KEY_MIGRATION_DONE: &str = "migration.v2.completed";
pub const KEY_CONFIG: &str = "config";

/// Uniform CRUD surface over snippets and directories, identical across the
/// ID-indexed and path-indexed stores.
///
/// Identity rules per method:
/// - `save_snippet` appends; `update_snippet` / `update_directory` replace
///   the unique record matching the schema-specific identity and fail with
///   [`crate::error::VaultError::UnknownIdentity`] if there is none.
/// - `create_directory` fails with
///   [`crate::error::VaultError::DuplicateIdentity`] if the identity exists.
/// - `delete_snippet` / `delete_directory` take an identifier handle; a
///   handle matching nothing is a warning, not an error. Directory deletion
///   cascades to all descendants.
pub trait SnippetStore {
    /// All snippets, from cache when warm. Full scan, no pagination.
    fn snippets(&self) -> Result<Vec<Snippet>>;

    /// All directories, from cache when warm.
    fn directories(&self) -> Result<Vec<Directory>>;

    fn save_snippet(&mut self, snippet: Snippet) -> Result<()>;

    fn update_snippet(&mut self, snippet: Snippet) -> Result<()>;

    fn delete_snippet(&mut self, handle: &str) -> Result<()>;

    fn create_directory(&mut self, directory: Directory) -> Result<()>;

    fn update_directory(&mut self, directory: Directory) -> Result<()>;

    fn delete_directory(&mut self, handle: &str) -> Result<()>;

    /// Drop the in-memory cache; the next read re-fetches from the state
    /// store.
    fn clear_cache(&mut self);

    fn version(&self) -> SchemaVersion;

    /// Remove this schema's persisted keys and drop the cache. Used by
    /// migration source cleanup; the other schema's keys are untouched.
    fn wipe(&mut self) -> Result<()>;
}
