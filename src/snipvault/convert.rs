//! # Migration Converter
//!
//! Pure transformation logic between the two schemas. Both directions are
//! total: every input record produces exactly one output record, and nothing
//! is silently dropped.
//!
//! ## ID → Path
//!
//! Directory paths are resolved roots-down: a directory's path is its
//! parent's path plus its own name and a trailing slash; a snippet's path is
//! its containing directory's path plus its name. Two data-preserving
//! policies apply:
//!
//! - **Orphan promotion**: a record whose `parentId` resolves to no existing
//!   directory is placed at root level instead of being dropped.
//! - **Cycle breaking**: a directory whose parent chain loops back onto
//!   itself can never be reached from a root; the member whose parent is
//!   already on the resolution stack is promoted to root and the rest of the
//!   chain hangs off it.
//!
//! Colliding paths (possible only for malformed input, since V1 enforces
//! sibling-name uniqueness) are deduplicated: directories merge into one,
//! snippets are renamed with the same suffix scheme the merge uses.
//!
//! ## Path → ID
//!
//! Directories are processed shallow-first so parents exist before children;
//! each gets a fresh identifier and a `parentId` looked up from its path
//! with the last segment removed (root if none matches).
//!
//! ## Merge
//!
//! Merging a converted tree into existing path-schema data unions
//! directories by path (existing wins) and snippets by path, where a
//! collision renames the *incoming* snippet with a fresh 4-character
//! lowercase-alphanumeric suffix, regenerated on further collision for up to
//! 10 attempts. No snippet from either source is lost.

use crate::model::{
    parent_dir_path, snippet_path, IdDirectory, IdSnippet, PathDirectory, PathSnippet,
};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const SUFFIX_LEN: usize = 4;
const SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const MAX_RENAME_ATTEMPTS: usize = 10;

/// A full set of path-schema records.
#[derive(Debug, Clone, Default)]
pub struct PathTree {
    pub directories: Vec<PathDirectory>,
    pub snippets: Vec<PathSnippet>,
}

/// A full set of ID-schema records.
#[derive(Debug, Clone, Default)]
pub struct IdTree {
    pub directories: Vec<IdDirectory>,
    pub snippets: Vec<IdSnippet>,
}

/// One rename performed to keep snippet paths unique.
#[derive(Debug, Clone)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// Result of [`merge_trees`]: the unioned tree plus the renames applied to
/// incoming snippets.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub tree: PathTree,
    pub renamed: Vec<Rename>,
}

/// Converts an ID-indexed tree to path-indexed records.
pub fn id_tree_to_paths(directories: &[IdDirectory], snippets: &[IdSnippet]) -> PathTree {
    id_tree_to_paths_with(directories, snippets, &mut rand::thread_rng())
}

pub(crate) fn id_tree_to_paths_with<R: Rng>(
    directories: &[IdDirectory],
    snippets: &[IdSnippet],
    rng: &mut R,
) -> PathTree {
    let by_id: HashMap<&str, &IdDirectory> =
        directories.iter().map(|d| (d.id.as_str(), d)).collect();

    let mut memo: HashMap<String, String> = HashMap::new();
    let mut visiting: HashSet<String> = HashSet::new();
    for dir in directories {
        resolve_dir_path(dir, &by_id, &mut memo, &mut visiting);
    }

    // Colliding directory paths merge into one record; their children all
    // land under the shared path, so nothing is lost.
    let mut out_dirs: Vec<PathDirectory> = Vec::new();
    let mut seen_dirs: HashSet<String> = HashSet::new();
    for dir in directories {
        let full_path = memo[&dir.id].clone();
        if seen_dirs.insert(full_path.clone()) {
            out_dirs.push(PathDirectory {
                full_path,
                name: dir.name.clone(),
                order: dir.order,
            });
        }
    }

    let mut out_snippets: Vec<PathSnippet> = Vec::new();
    let mut taken: HashSet<String> = HashSet::new();
    for snippet in snippets {
        let parent_path = snippet
            .parent_id
            .as_ref()
            .and_then(|pid| memo.get(pid))
            .cloned()
            // Dangling parentId: promote to root.
            .unwrap_or_else(|| "/".to_string());

        let (name, full_path) = unique_snippet_path(&parent_path, &snippet.name, &taken, rng);
        taken.insert(full_path.clone());
        out_snippets.push(PathSnippet {
            full_path,
            name,
            code: snippet.code.clone(),
            language: snippet.language.clone(),
            order: snippet.order,
            create_time: snippet.create_time,
            file_name: snippet.file_name.clone(),
            file_path: snippet.file_path.clone(),
            category: snippet.category.clone(),
            id: None,
        });
    }

    PathTree {
        directories: out_dirs,
        snippets: out_snippets,
    }
}

fn resolve_dir_path(
    dir: &IdDirectory,
    by_id: &HashMap<&str, &IdDirectory>,
    memo: &mut HashMap<String, String>,
    visiting: &mut HashSet<String>,
) -> String {
    if let Some(path) = memo.get(&dir.id) {
        return path.clone();
    }

    visiting.insert(dir.id.clone());
    let path = match dir.parent_id.as_deref() {
        None => format!("/{}/", dir.name),
        Some(parent_id) => match by_id.get(parent_id) {
            // Dangling parentId: promote to root.
            None => format!("/{}/", dir.name),
            // Parent is already on the resolution stack: a cycle. Break it
            // here by promoting this member to root.
            Some(_) if visiting.contains(parent_id) => format!("/{}/", dir.name),
            Some(parent) => {
                let parent_path = resolve_dir_path(parent, by_id, memo, visiting);
                format!("{}{}/", parent_path, dir.name)
            }
        },
    };
    visiting.remove(&dir.id);

    memo.insert(dir.id.clone(), path.clone());
    path
}

/// Converts a path-indexed tree to ID-indexed records with fresh ids.
pub fn paths_to_id_tree(directories: &[PathDirectory], snippets: &[PathSnippet]) -> IdTree {
    // Shallow-first, so a parent's id exists before its children look it up.
    let mut ordered: Vec<&PathDirectory> = directories.iter().collect();
    ordered.sort_by_key(|d| crate::model::path_depth(&d.full_path));

    let mut id_by_path: HashMap<String, String> = HashMap::new();
    let mut out_dirs: Vec<IdDirectory> = Vec::new();
    for dir in ordered {
        let id = Uuid::new_v4().to_string();
        id_by_path.insert(dir.full_path.clone(), id.clone());
        let parent_id = id_by_path.get(&parent_dir_path(&dir.full_path)).cloned();
        out_dirs.push(IdDirectory {
            id,
            parent_id,
            name: dir.name.clone(),
            order: dir.order,
        });
    }

    let out_snippets: Vec<IdSnippet> = snippets
        .iter()
        .map(|s| IdSnippet {
            id: Uuid::new_v4().to_string(),
            parent_id: id_by_path.get(&parent_dir_path(&s.full_path)).cloned(),
            name: s.name.clone(),
            code: s.code.clone(),
            language: s.language.clone(),
            order: s.order,
            create_time: s.create_time,
            file_name: s.file_name.clone(),
            file_path: s.file_path.clone(),
            category: s.category.clone(),
        })
        .collect();

    IdTree {
        directories: out_dirs,
        snippets: out_snippets,
    }
}

/// Merges `incoming` (freshly converted) records into `existing` path-schema
/// data. Existing records always survive unchanged.
pub fn merge_trees(existing: PathTree, incoming: PathTree) -> MergeOutcome {
    merge_trees_with(existing, incoming, &mut rand::thread_rng())
}

pub(crate) fn merge_trees_with<R: Rng>(
    existing: PathTree,
    incoming: PathTree,
    rng: &mut R,
) -> MergeOutcome {
    let mut directories = existing.directories;
    let mut dir_paths: HashSet<String> =
        directories.iter().map(|d| d.full_path.clone()).collect();
    for dir in incoming.directories {
        if dir_paths.insert(dir.full_path.clone()) {
            directories.push(dir);
        } else {
            tracing::debug!(path = %dir.full_path, "merge: directory already present, keeping existing");
        }
    }

    let mut snippets = existing.snippets;
    let mut taken: HashSet<String> = snippets.iter().map(|s| s.full_path.clone()).collect();
    let mut renamed: Vec<Rename> = Vec::new();

    for mut snippet in incoming.snippets {
        if taken.contains(&snippet.full_path) {
            let from = snippet.full_path.clone();
            let parent = parent_dir_path(&snippet.full_path);
            let (name, full_path) = rename_with_suffix(&parent, &snippet.name, &taken, rng);
            tracing::debug!(%from, to = %full_path, "merge: snippet path collision, renamed incoming copy");
            renamed.push(Rename {
                from,
                to: full_path.clone(),
            });
            snippet.name = name;
            snippet.full_path = full_path;
        }
        taken.insert(snippet.full_path.clone());
        snippets.push(snippet);
    }

    MergeOutcome {
        tree: PathTree {
            directories,
            snippets,
        },
        renamed,
    }
}

/// Returns `(name, full_path)` for a snippet under `parent_path`, keeping
/// the plain name when free and falling back to suffix renaming otherwise.
fn unique_snippet_path<R: Rng>(
    parent_path: &str,
    name: &str,
    taken: &HashSet<String>,
    rng: &mut R,
) -> (String, String) {
    let plain = snippet_path(parent_path, name);
    if !taken.contains(&plain) {
        return (name.to_string(), plain);
    }
    rename_with_suffix(parent_path, name, taken, rng)
}

/// Appends `_<suffix>` to `name` with a fresh random suffix per attempt
/// until the resulting path is free, up to [`MAX_RENAME_ATTEMPTS`]. The
/// suffix space (36^4) makes exhaustion unreachable in practice; if it does
/// happen the last candidate is kept rather than losing the record.
fn rename_with_suffix<R: Rng>(
    parent_path: &str,
    name: &str,
    taken: &HashSet<String>,
    rng: &mut R,
) -> (String, String) {
    let mut candidate_name = String::new();
    let mut candidate_path = String::new();

    for attempt in 0..MAX_RENAME_ATTEMPTS {
        candidate_name = format!("{}_{}", name, random_suffix(rng));
        candidate_path = snippet_path(parent_path, &candidate_name);
        if !taken.contains(&candidate_path) {
            return (candidate_name, candidate_path);
        }
        tracing::debug!(attempt, path = %candidate_path, "rename suffix collided, regenerating");
    }

    tracing::warn!(path = %candidate_path, "suffix attempts exhausted, keeping last candidate");
    (candidate_name, candidate_path)
}

fn random_suffix<R: Rng>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARS[rng.gen_range(0..SUFFIX_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn id_dir(id: &str, name: &str, parent: Option<&str>) -> IdDirectory {
        IdDirectory {
            id: id.into(),
            parent_id: parent.map(String::from),
            name: name.into(),
            order: 0,
        }
    }

    fn id_snip(id: &str, name: &str, parent: Option<&str>, code: &str) -> IdSnippet {
        let mut s = IdSnippet::new(name.into(), code.into(), "python".into(), None);
        s.id = id.into();
        s.parent_id = parent.map(String::from);
        s
    }

    fn path_snip(path: &str, code: &str) -> PathSnippet {
        PathSnippet::new(
            path.into(),
            crate::model::last_segment(path).into(),
            code.into(),
            "python".into(),
        )
    }

    fn is_suffixed(path: &str, base: &str) -> bool {
        path.strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('_'))
            .map(|suffix| {
                suffix.len() == 4
                    && suffix
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            })
            .unwrap_or(false)
    }

    #[test]
    fn test_basic_id_to_path_conversion() {
        let dirs = vec![id_dir("d1", "lims", None)];
        let snippets = vec![id_snip("s1", "template", Some("d1"), "x=1")];

        let tree = id_tree_to_paths(&dirs, &snippets);

        assert_eq!(tree.directories.len(), 1);
        assert_eq!(tree.directories[0].full_path, "/lims/");
        assert_eq!(tree.directories[0].name, "lims");

        assert_eq!(tree.snippets.len(), 1);
        assert_eq!(tree.snippets[0].full_path, "/lims/template");
        assert_eq!(tree.snippets[0].code, "x=1");
    }

    #[test]
    fn test_nested_directories() {
        let dirs = vec![
            id_dir("d1", "a", None),
            id_dir("d2", "b", Some("d1")),
            id_dir("d3", "c", Some("d2")),
        ];
        let tree = id_tree_to_paths(&dirs, &[]);

        let paths: Vec<&str> = tree.directories.iter().map(|d| d.full_path.as_str()).collect();
        assert_eq!(paths, vec!["/a/", "/a/b/", "/a/b/c/"]);
    }

    #[test]
    fn test_orphan_snippet_promoted_to_root() {
        let snippets = vec![id_snip("s1", "loner", Some("nonexistent"), "c")];
        let tree = id_tree_to_paths(&[], &snippets);

        assert_eq!(tree.snippets.len(), 1);
        assert_eq!(tree.snippets[0].full_path, "/loner");
    }

    #[test]
    fn test_orphan_directory_promoted_to_root() {
        let dirs = vec![id_dir("d1", "stranded", Some("gone"))];
        let tree = id_tree_to_paths(&dirs, &[]);

        assert_eq!(tree.directories.len(), 1);
        assert_eq!(tree.directories[0].full_path, "/stranded/");
    }

    #[test]
    fn test_cycle_is_broken_without_loss() {
        // a's parent is b, b's parent is a.
        let dirs = vec![id_dir("d1", "a", Some("d2")), id_dir("d2", "b", Some("d1"))];
        let snippets = vec![id_snip("s1", "inside", Some("d1"), "c")];

        let tree = id_tree_to_paths(&dirs, &snippets);

        // Both directories survive, one promoted to root.
        assert_eq!(tree.directories.len(), 2);
        assert_eq!(tree.snippets.len(), 1);
        let paths: HashSet<&str> = tree.directories.iter().map(|d| d.full_path.as_str()).collect();
        assert!(paths.contains("/b/") || paths.contains("/a/"));
        assert!(tree.snippets[0].full_path.ends_with("/inside"));
    }

    #[test]
    fn test_path_to_id_conversion() {
        let dirs = vec![
            PathDirectory::new("/lims/http/", "http".into()),
            PathDirectory::new("/lims/", "lims".into()),
        ];
        let snippets = vec![path_snip("/lims/template", "x=1"), path_snip("/scratch", "y")];

        let tree = paths_to_id_tree(&dirs, &snippets);

        assert_eq!(tree.directories.len(), 2);
        let lims = tree.directories.iter().find(|d| d.name == "lims").unwrap();
        let http = tree.directories.iter().find(|d| d.name == "http").unwrap();
        assert!(lims.parent_id.is_none());
        assert_eq!(http.parent_id.as_deref(), Some(lims.id.as_str()));

        let template = tree.snippets.iter().find(|s| s.name == "template").unwrap();
        assert_eq!(template.parent_id.as_deref(), Some(lims.id.as_str()));
        let scratch = tree.snippets.iter().find(|s| s.name == "scratch").unwrap();
        assert!(scratch.parent_id.is_none());
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let dirs = vec![id_dir("d1", "a", None), id_dir("d2", "b", Some("d1"))];
        let snippets = vec![
            id_snip("s1", "x", Some("d1"), "one"),
            id_snip("s2", "y", Some("d2"), "two"),
            id_snip("s3", "z", None, "three"),
        ];

        let paths = id_tree_to_paths(&dirs, &snippets);
        let back = paths_to_id_tree(&paths.directories, &paths.snippets);

        assert_eq!(back.directories.len(), 2);
        assert_eq!(back.snippets.len(), 3);

        // Convert forward again: identical paths prove the parent/child
        // structure survived the trip even though the ids are fresh.
        let again = id_tree_to_paths(&back.directories, &back.snippets);
        let mut first: Vec<String> = paths.snippets.iter().map(|s| s.full_path.clone()).collect();
        let mut second: Vec<String> = again.snippets.iter().map(|s| s.full_path.clone()).collect();
        first.sort();
        second.sort();
        assert_eq!(first, second);

        let codes: HashSet<String> = back.snippets.iter().map(|s| s.code.clone()).collect();
        assert_eq!(codes.len(), 3);
    }

    #[test]
    fn test_merge_without_conflicts() {
        let existing = PathTree {
            directories: vec![PathDirectory::new("/a/", "a".into())],
            snippets: vec![path_snip("/a/x", "old")],
        };
        let incoming = PathTree {
            directories: vec![PathDirectory::new("/b/", "b".into())],
            snippets: vec![path_snip("/b/y", "new")],
        };

        let outcome = merge_trees(existing, incoming);
        assert_eq!(outcome.tree.directories.len(), 2);
        assert_eq!(outcome.tree.snippets.len(), 2);
        assert!(outcome.renamed.is_empty());
    }

    #[test]
    fn test_merge_directory_conflict_keeps_existing() {
        let mut kept = PathDirectory::new("/a/", "a".into());
        kept.order = 7;
        let existing = PathTree {
            directories: vec![kept],
            snippets: vec![],
        };
        let incoming = PathTree {
            directories: vec![PathDirectory::new("/a/", "a".into())],
            snippets: vec![],
        };

        let outcome = merge_trees(existing, incoming);
        assert_eq!(outcome.tree.directories.len(), 1);
        assert_eq!(outcome.tree.directories[0].order, 7);
    }

    #[test]
    fn test_merge_snippet_conflict_renames_incoming() {
        let existing = PathTree {
            directories: vec![],
            snippets: vec![path_snip("/a/foo", "keep-me")],
        };
        let incoming = PathTree {
            directories: vec![],
            snippets: vec![path_snip("/a/foo", "x=1")],
        };

        let outcome = merge_trees(existing, incoming);
        assert_eq!(outcome.tree.snippets.len(), 2);

        let kept = outcome
            .tree
            .snippets
            .iter()
            .find(|s| s.full_path == "/a/foo")
            .unwrap();
        assert_eq!(kept.code, "keep-me");

        let renamed = outcome
            .tree
            .snippets
            .iter()
            .find(|s| s.full_path != "/a/foo")
            .unwrap();
        assert!(is_suffixed(&renamed.full_path, "/a/foo"));
        assert!(is_suffixed(&renamed.name, "foo"));
        assert_eq!(renamed.code, "x=1");

        assert_eq!(outcome.renamed.len(), 1);
        assert_eq!(outcome.renamed[0].from, "/a/foo");
        assert_eq!(outcome.renamed[0].to, renamed.full_path);
    }

    #[test]
    fn test_merge_regenerates_suffix_on_second_collision() {
        // Pre-compute the first suffix a seeded rng will produce, occupy that
        // path, and check the merge moves on to a different one.
        let mut probe = StdRng::seed_from_u64(42);
        let blocked_name = format!("foo_{}", random_suffix(&mut probe));
        let blocked_path = format!("/a/{}", blocked_name);

        let existing = PathTree {
            directories: vec![],
            snippets: vec![path_snip("/a/foo", "keep"), path_snip(&blocked_path, "wall")],
        };
        let incoming = PathTree {
            directories: vec![],
            snippets: vec![path_snip("/a/foo", "new")],
        };

        let mut rng = StdRng::seed_from_u64(42);
        let outcome = merge_trees_with(existing, incoming, &mut rng);

        assert_eq!(outcome.tree.snippets.len(), 3);
        let landed = &outcome.renamed[0].to;
        assert_ne!(landed, &blocked_path);
        assert!(is_suffixed(landed, "/a/foo"));
    }

    #[test]
    fn test_converter_totality_on_degenerate_input() {
        // Two v1 directories with the same name and parent (malformed) plus
        // same-named snippets in each. Everything must come out the other
        // side exactly once.
        let dirs = vec![id_dir("d1", "dup", None), id_dir("d2", "dup", None)];
        let snippets = vec![
            id_snip("s1", "same", Some("d1"), "one"),
            id_snip("s2", "same", Some("d2"), "two"),
        ];

        let tree = id_tree_to_paths(&dirs, &snippets);

        // Directories merged, both snippets kept with distinct paths.
        assert_eq!(tree.directories.len(), 1);
        assert_eq!(tree.snippets.len(), 2);
        assert_ne!(tree.snippets[0].full_path, tree.snippets[1].full_path);
    }

    #[test]
    fn test_random_suffix_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let suffix = random_suffix(&mut rng);
            assert_eq!(suffix.len(), 4);
            assert!(suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
