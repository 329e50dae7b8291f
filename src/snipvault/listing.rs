//! # Listing Adapter
//!
//! Presentation-layer view of stored records. Path-indexed records carry no
//! identifier, so callers that need an ID-shaped handle (selection, delete)
//! get one computed here on demand via the codec — the domain records are
//! never annotated in place, and nothing computed here is persisted.

use crate::codec;
use crate::model::{Directory, Snippet};

/// A snippet paired with the handle a caller can select or delete it by.
#[derive(Debug, Clone)]
pub struct ListedSnippet {
    pub handle: String,
    pub location: String,
    pub snippet: Snippet,
}

/// A directory paired with its handle.
#[derive(Debug, Clone)]
pub struct ListedDirectory {
    pub handle: String,
    pub location: String,
    pub directory: Directory,
}

/// The handle for a snippet: its own id in the ID schema, the derived path
/// handle in the path schema.
pub fn snippet_handle(snippet: &Snippet) -> String {
    match snippet {
        Snippet::Id(s) => s.id.clone(),
        Snippet::Path(s) => codec::handle(&s.full_path),
    }
}

/// The handle for a directory.
pub fn directory_handle(directory: &Directory) -> String {
    match directory {
        Directory::Id(d) => d.id.clone(),
        Directory::Path(d) => codec::handle(&d.full_path),
    }
}

fn snippet_location(snippet: &Snippet) -> String {
    match snippet {
        Snippet::Id(s) => s.name.clone(),
        Snippet::Path(s) => s.full_path.clone(),
    }
}

fn directory_location(directory: &Directory) -> String {
    match directory {
        Directory::Id(d) => d.name.clone(),
        Directory::Path(d) => d.full_path.clone(),
    }
}

/// Sorts snippets for display (sibling `order`, then name) and pairs each
/// with its handle.
pub fn list_snippets(mut snippets: Vec<Snippet>) -> Vec<ListedSnippet> {
    snippets.sort_by(|a, b| {
        a.order()
            .cmp(&b.order())
            .then_with(|| a.name().cmp(b.name()))
    });
    snippets
        .into_iter()
        .map(|snippet| ListedSnippet {
            handle: snippet_handle(&snippet),
            location: snippet_location(&snippet),
            snippet,
        })
        .collect()
}

/// Sorts directories for display and pairs each with its handle.
pub fn list_directories(mut directories: Vec<Directory>) -> Vec<ListedDirectory> {
    directories.sort_by(|a, b| {
        a.order()
            .cmp(&b.order())
            .then_with(|| a.name().cmp(b.name()))
    });
    directories
        .into_iter()
        .map(|directory| ListedDirectory {
            handle: directory_handle(&directory),
            location: directory_location(&directory),
            directory,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IdSnippet, PathSnippet};

    fn path_snippet(path: &str, order: i64) -> Snippet {
        let mut s = PathSnippet::new(
            path.into(),
            crate::model::last_segment(path).into(),
            "c".into(),
            "rust".into(),
        );
        s.order = order;
        Snippet::Path(s)
    }

    #[test]
    fn test_v1_handle_is_the_id() {
        let mut record = IdSnippet::new("x".into(), "c".into(), "rust".into(), None);
        record.id = "s1".into();
        assert_eq!(snippet_handle(&Snippet::Id(record)), "s1");
    }

    #[test]
    fn test_v2_handle_is_derived_and_stable() {
        let snippet = path_snippet("/a/x", 0);
        assert_eq!(snippet_handle(&snippet), codec::handle("/a/x"));
        // Recomputed, not stored: the same path always lists the same handle.
        assert_eq!(snippet_handle(&snippet), snippet_handle(&snippet));
    }

    #[test]
    fn test_listing_sorts_by_order_then_name() {
        let listed = list_snippets(vec![
            path_snippet("/b", 1),
            path_snippet("/a", 1),
            path_snippet("/z", 0),
        ]);

        let names: Vec<&str> = listed.iter().map(|l| l.snippet.name()).collect();
        assert_eq!(names, vec!["z", "a", "b"]);
    }
}
