//! # Path/Handle Codec
//!
//! Path-indexed records have no stored identifier, but callers written
//! against ID-shaped interfaces (selection, delete-by-id) still need an
//! ID-like handle. The codec derives one deterministically from the
//! `fullPath` string: same path, same handle, no persisted state.
//!
//! Handles are presentation-time values. They are stable only for as long as
//! the path is unchanged, and they are never written to storage — the path
//! string remains the source of truth.

use uuid::Uuid;

/// Namespace for path-derived handles. Fixed so that encoding is stable
/// across processes and versions.
const HANDLE_NAMESPACE: Uuid = Uuid::from_bytes([
    0x9c, 0x4e, 0x21, 0xd3, 0x5a, 0x0f, 0x4b, 0x87, 0x8f, 0x2e, 0x6b, 0x91, 0x40, 0xce, 0xa7,
    0x35,
]);

/// Derives the handle for a full path.
pub fn handle(full_path: &str) -> String {
    Uuid::new_v5(&HANDLE_NAMESPACE, full_path.as_bytes()).to_string()
}

/// Whether `candidate` is the handle of `full_path`.
pub fn matches(candidate: &str, full_path: &str) -> bool {
    candidate == handle(full_path)
}
