use clap::Parser;
use directories::ProjectDirs;
use snipvault::api::VaultApi;
use snipvault::error::{Result, VaultError};
use snipvault::model::SchemaVersion;
use snipvault::store::context::{ConvertOptions, MigrationReport};
use snipvault::store::fs_backend::FsState;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod args;
use args::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let state_file = match &cli.state_file {
        Some(path) => path.clone(),
        None => default_state_file()?,
    };
    let mut api = VaultApi::open(FsState::new(state_file))?;

    match cli.command {
        Some(Commands::List) | None => handle_list(&api),
        Some(Commands::Add {
            name,
            code,
            language,
            dir,
        }) => {
            let code = match code {
                Some(code) => code,
                None => read_stdin()?,
            };
            let listed = api.create_snippet(&name, &code, &language, dir.as_deref())?;
            println!("{}  {}", listed.handle, listed.location);
            Ok(())
        }
        Some(Commands::Rm { handle }) => api.delete_snippet(&handle),
        Some(Commands::Mkdir { name, dir }) => {
            let listed = api.create_directory(&name, dir.as_deref())?;
            println!("{}  {}", listed.handle, listed.location);
            Ok(())
        }
        Some(Commands::Rmdir { handle }) => api.delete_directory(&handle),
        Some(Commands::Rename { handle, new_name }) => api.rename_directory(&handle, &new_name),
        Some(Commands::Migrate {
            target,
            force,
            no_merge,
            delete_source,
        }) => handle_migrate(&mut api, &target, force, no_merge, delete_source),
        Some(Commands::ClearLegacy) => api.clear_legacy_data(),
        Some(Commands::Refresh) => {
            api.refresh();
            Ok(())
        }
        Some(Commands::Config { schema }) => handle_config(&mut api, schema),
    }
}

fn default_state_file() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "snipvault", "snipvault")
        .ok_or_else(|| VaultError::Store("No usable data directory found".to_string()))?;
    Ok(dirs.data_dir().join("state.json"))
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn handle_list(api: &VaultApi<FsState>) -> Result<()> {
    let directories = api.directories()?;
    let snippets = api.snippets()?;

    if directories.is_empty() && snippets.is_empty() {
        println!("(empty vault, schema {})", api.version());
        return Ok(());
    }

    for dir in &directories {
        println!("d {}  {}", dir.handle, dir.location);
    }
    for snip in &snippets {
        println!(
            "s {}  {}  [{}]",
            snip.handle,
            snip.location,
            snip.snippet.language()
        );
    }
    Ok(())
}

fn handle_migrate(
    api: &mut VaultApi<FsState>,
    target: &str,
    force: bool,
    no_merge: bool,
    delete_source: bool,
) -> Result<()> {
    let target: SchemaVersion = target.parse().map_err(VaultError::Api)?;

    let report = match target {
        SchemaVersion::V2 => api.migrate_to_path_schema(ConvertOptions {
            force,
            merge: !no_merge,
            delete_source,
        })?,
        SchemaVersion::V1 => api.migrate_to_id_schema(force)?,
    };
    print_report(&report);
    Ok(())
}

fn print_report(report: &MigrationReport) {
    if !report.converted {
        println!("Nothing to do: {} is already active.", report.target);
        return;
    }

    println!(
        "Converted {} directories and {} snippets to {}.",
        report.directories, report.snippets, report.target
    );
    for rename in &report.renamed {
        println!("Renamed on collision: {} -> {}", rename.from, rename.to);
    }
    if report.merge_fell_back {
        println!("Warning: merge failed, the un-merged converted data was written.");
    }
    if report.source_cleanup_failed {
        println!("Warning: the old schema's keys could not be cleared (data is safe).");
    }
}

fn handle_config(api: &mut VaultApi<FsState>, schema: Option<String>) -> Result<()> {
    match schema {
        Some(schema) => {
            let version: SchemaVersion = schema.parse().map_err(VaultError::Api)?;
            api.set_preferred_schema(version)?;
            println!("Preferred schema set to {}.", version);
        }
        None => {
            println!("Preferred schema: {}", api.preferred_schema()?);
            println!("Active schema:    {}", api.version());
        }
    }
    Ok(())
}
