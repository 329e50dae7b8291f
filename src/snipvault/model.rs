//! # Domain Model: Dual-Schema Records and Path Arithmetic
//!
//! snipvault persists the same two entity kinds — snippets and directories —
//! under two co-existing schemas:
//!
//! - **V1 (ID-indexed)**: every record carries an opaque `id`, and position
//!   in the hierarchy is expressed through `parentId` references.
//! - **V2 (path-indexed)**: there is no `id`; identity IS the `fullPath`
//!   string, which encodes both name and position at once. Directory paths
//!   are normalized to start and end with `/` (`/lims/`), snippet paths have
//!   no trailing slash (`/lims/template`).
//!
//! Records cross the storage boundary as the [`Snippet`] / [`Directory`]
//! tagged unions so every store matches exhaustively on the schema instead
//! of probing fields at runtime.
//!
//! ## Wire format
//!
//! The arrays in the underlying state store use camelCase member names and
//! epoch-millisecond timestamps (`createTime`). V2 snippet arrays written by
//! older versions may still embed an `id` member; it is accepted on read and
//! never written back.
//!
//! ## Path arithmetic
//!
//! A record's parent is found by removing its final path segment
//! ([`parent_dir_path`]); a directory's depth equals its number of non-empty
//! segments ([`path_depth`]). Both operations treat `/` as the root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The storage schema a record (or store) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    #[serde(rename = "v1")]
    V1,
    #[serde(rename = "v2")]
    V2,
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::V1 => write!(f, "v1"),
            SchemaVersion::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "v1" => Ok(SchemaVersion::V1),
            "v2" => Ok(SchemaVersion::V2),
            other => Err(format!("unknown schema version: {}", other)),
        }
    }
}

/// An ID-indexed (V1) snippet record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdSnippet {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub order: i64,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub create_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl IdSnippet {
    pub fn new(name: String, code: String, language: String, parent_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id,
            name,
            code,
            language,
            order: 0,
            create_time: Utc::now(),
            file_name: None,
            file_path: None,
            category: None,
        }
    }
}

/// A path-indexed (V2) snippet record. Identity is `full_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSnippet {
    pub full_path: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub order: i64,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub create_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Legacy member left behind by older writers. Read-only: used as the
    /// last-resort match when deleting, never serialized back.
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
}

impl PathSnippet {
    pub fn new(full_path: String, name: String, code: String, language: String) -> Self {
        Self {
            full_path,
            name,
            code,
            language,
            order: 0,
            create_time: Utc::now(),
            file_name: None,
            file_path: None,
            category: None,
            id: None,
        }
    }

    /// Path of the directory containing this snippet.
    pub fn parent_path(&self) -> String {
        parent_dir_path(&self.full_path)
    }
}

/// An ID-indexed (V1) directory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdDirectory {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub order: i64,
}

impl IdDirectory {
    pub fn new(name: String, parent_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id,
            name,
            order: 0,
        }
    }
}

/// A path-indexed (V2) directory record. `full_path` always starts and ends
/// with `/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathDirectory {
    pub full_path: String,
    pub name: String,
    #[serde(default)]
    pub order: i64,
}

impl PathDirectory {
    pub fn new(full_path: &str, name: String) -> Self {
        Self {
            full_path: normalize_dir_path(full_path),
            name,
            order: 0,
        }
    }

    pub fn parent_path(&self) -> String {
        parent_dir_path(&self.full_path)
    }
}

/// A snippet of either schema. Stores match exhaustively on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Snippet {
    Id(IdSnippet),
    Path(PathSnippet),
}

impl Snippet {
    pub fn schema(&self) -> SchemaVersion {
        match self {
            Snippet::Id(_) => SchemaVersion::V1,
            Snippet::Path(_) => SchemaVersion::V2,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Snippet::Id(s) => &s.name,
            Snippet::Path(s) => &s.name,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Snippet::Id(s) => &s.code,
            Snippet::Path(s) => &s.code,
        }
    }

    pub fn language(&self) -> &str {
        match self {
            Snippet::Id(s) => &s.language,
            Snippet::Path(s) => &s.language,
        }
    }

    pub fn order(&self) -> i64 {
        match self {
            Snippet::Id(s) => s.order,
            Snippet::Path(s) => s.order,
        }
    }
}

/// A directory of either schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Directory {
    Id(IdDirectory),
    Path(PathDirectory),
}

impl Directory {
    pub fn schema(&self) -> SchemaVersion {
        match self {
            Directory::Id(_) => SchemaVersion::V1,
            Directory::Path(_) => SchemaVersion::V2,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Directory::Id(d) => &d.name,
            Directory::Path(d) => &d.name,
        }
    }

    pub fn order(&self) -> i64 {
        match self {
            Directory::Id(d) => d.order,
            Directory::Path(d) => d.order,
        }
    }
}

/// Normalizes a directory path so it starts and ends with `/` and contains
/// no empty segments. The root is `/`.
pub fn normalize_dir_path(raw: &str) -> String {
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

/// Removes the final segment of a path. Works for directory paths
/// (`/a/b/` → `/a/`) and snippet paths (`/a/b` → `/a/`). The root's parent
/// is the root itself.
pub fn parent_dir_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..=idx].to_string(),
        None => "/".to_string(),
    }
}

/// Number of non-empty segments in a path.
pub fn path_depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

/// Final segment of a path (a directory's or snippet's own name slot).
pub fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Joins a directory path and a snippet name into the snippet's full path.
pub fn snippet_path(dir_path: &str, name: &str) -> String {
    format!("{}{}", normalize_dir_path(dir_path), name)
}

/// Joins a parent directory path and a child directory name.
pub fn child_dir_path(parent: &str, name: &str) -> String {
    format!("{}{}/", normalize_dir_path(parent), name)
}
