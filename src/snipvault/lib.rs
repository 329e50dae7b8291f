//! # snipvault Architecture
//!
//! snipvault is a **UI-agnostic snippet-storage library**. The CLI is just
//! one client; the same core could sit behind an editor plugin or any other
//! front end.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  CLI Layer (args.rs, wired by main.rs)                     │
//! │  - Parses arguments, prints results, owns exit codes       │
//! └────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                        │
//! │  - Thin facade; resolves handles, guards invariants        │
//! │  - Returns structured Result types, no I/O                 │
//! └────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                    │
//! │  - SnippetStore trait over two schema stores (v1, v2)      │
//! │  - StoreContext: delegation + convert-and-switch migration │
//! │  - StateStore trait: the injected key-value persistence    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The dual-schema model
//!
//! Snippets and directories persist under one of two schemas: ID-indexed
//! (V1, `id`/`parentId` references) or path-indexed (V2, the `fullPath`
//! string is the identity). The [`store::SnippetStore`] trait hides the
//! difference from every caller; [`store::context::StoreContext`] migrates
//! between them without interrupting the rest of the system. See
//! [`convert`] for the transformation rules and [`codec`] for the
//! derived handles that let path-indexed records flow through ID-shaped
//! interfaces.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade — entry point for all operations
//! - [`store`]: State-store abstraction, schema stores, factory, context
//! - [`convert`]: Pure ID-tree ⇄ path-tree converters and merge logic
//! - [`codec`]: Deterministic path → handle derivation
//! - [`model`]: Record types, tagged unions, path arithmetic
//! - [`listing`]: Presentation adapter (handles computed on demand)
//! - [`config`]: Persisted schema preference
//! - [`error`]: Error types

pub mod api;
pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod listing;
pub mod model;
pub mod store;
