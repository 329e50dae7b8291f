use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "snipvault", version, about = "A schema-versioned vault for code snippets")]
pub struct Cli {
    /// Path to the state file (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List directories and snippets with their handles
    List,
    /// Add a snippet
    Add {
        name: String,
        /// Snippet body; read from stdin when omitted
        #[arg(long)]
        code: Option<String>,
        #[arg(long, default_value = "plaintext")]
        language: String,
        /// Containing directory (path or handle); root when omitted
        #[arg(long)]
        dir: Option<String>,
    },
    /// Delete a snippet by handle or path
    Rm { handle: String },
    /// Create a directory
    Mkdir {
        name: String,
        /// Parent directory (path or handle); root when omitted
        #[arg(long)]
        dir: Option<String>,
    },
    /// Delete a directory and everything under it
    Rmdir { handle: String },
    /// Rename a directory (cascades to descendants in the path schema)
    Rename { handle: String, new_name: String },
    /// Convert the stored data to the other schema and switch over
    Migrate {
        /// Target schema: v1 or v2
        target: String,
        /// Re-run even if the target schema is already active
        #[arg(long)]
        force: bool,
        /// v2 only: overwrite existing path-schema data instead of merging
        #[arg(long)]
        no_merge: bool,
        /// v2 only: clear the ID-schema keys after converting
        #[arg(long)]
        delete_source: bool,
    },
    /// Remove the pre-versioning legacy arrays
    ClearLegacy,
    /// Drop in-memory caches so the next read hits the store
    Refresh,
    /// Show or set the preferred schema version
    Config {
        /// New preferred schema (v1 or v2)
        #[arg(long)]
        schema: Option<String>,
    },
}
