//! Folder Mirror - Main entry point
//!
//! The only place that decides the process exit code.

use anyhow::{Context, Result};
use clap::Parser;
use folder_mirror::commands::{self, InitOutcome};
use folder_mirror::executor::{EXIT_FAILURE, EXIT_SUCCESS};
use folder_mirror::report::TracingSink;
use folder_mirror::shutdown::ShutdownCoordinator;
use folder_mirror::sync::{RcloneEngine, SyncEngine};
use folder_mirror::{utils, Orchestrator, OrchestratorConfig, PathConfig, RunOptions, Settings};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Show what would change without touching the backups
    #[arg(long)]
    dry_run: bool,

    /// Stream sync engine progress to the console
    #[arg(short, long)]
    verbose: bool,

    /// List configured sources and exit
    #[arg(long, conflicts_with_all = ["init", "check_tools"])]
    list_only: bool,

    /// Create a configuration template for this machine and exit
    #[arg(long, conflicts_with = "check_tools")]
    init: bool,

    /// Check that the sync engine is installed and exit
    #[arg(long)]
    check_tools: bool,

    /// Root directory holding config/, logs/ and backups/ (defaults to the working directory)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(args: Args) -> Result<u8> {
    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to read working directory")?,
    };
    let machine_name = hostname::get()
        .context("Failed to read hostname")?
        .to_string_lossy()
        .into_owned();

    let paths = PathConfig::resolve(root, &machine_name);
    let settings = Settings::load(&paths.settings_file())
        .with_context(|| format!("Failed to load {}", paths.settings_file().display()))?;

    let log_level = args.log_level.as_deref().unwrap_or(&settings.log.level);
    let log_dir = settings.log.to_file.then_some(paths.logs_dir.as_path());
    utils::logger::init(log_level, log_dir)?;

    tracing::info!(
        "folder-mirror v{} on {} (root: {})",
        env!("CARGO_PKG_VERSION"),
        machine_name,
        paths.root.display()
    );

    let engine = RcloneEngine::new(settings.sync.binary.clone());

    if args.check_tools {
        return Ok(check_tools(&engine).await);
    }
    if args.init {
        return init(&paths, &machine_name);
    }
    if args.list_only {
        return list(&paths);
    }

    let shutdown = ShutdownCoordinator::new();
    let listener = shutdown.listen();

    let orchestrator = Orchestrator::new(
        OrchestratorConfig {
            paths,
            machine_name,
        },
        engine,
        TracingSink,
    )
    .with_cancel(shutdown.token());

    let outcome = orchestrator
        .run(RunOptions {
            dry_run: args.dry_run,
            verbose: args.verbose,
        })
        .await;
    listener.abort();

    match outcome {
        Ok(summary) => Ok(summary.exit_code()),
        Err(e) => {
            tracing::error!("{}", e);
            Ok(EXIT_FAILURE)
        }
    }
}

async fn check_tools(engine: &RcloneEngine) -> u8 {
    let check = engine.probe().await;
    if check.available {
        println!(
            "{}: available ({}, {})",
            engine.binary(),
            check.version.as_deref().unwrap_or("unknown version"),
            check.path.as_deref().unwrap_or("unknown path")
        );
        EXIT_SUCCESS
    } else {
        println!("{}: not found. Install rclone from https://rclone.org/install/", engine.binary());
        EXIT_FAILURE
    }
}

fn init(paths: &PathConfig, machine_name: &str) -> Result<u8> {
    match commands::init_config(paths, machine_name)? {
        InitOutcome::Created(path) => {
            println!("Created {}", path.display());
            println!("Edit it to add your folders, then set \"enabled\": true.");
        }
        InitOutcome::AlreadyExists(path) => {
            println!("Configuration already exists at {} (left unchanged)", path.display());
        }
    }
    Ok(EXIT_SUCCESS)
}

fn list(paths: &PathConfig) -> Result<u8> {
    let listing = match commands::list_sources(paths) {
        Ok(listing) => listing,
        Err(e) => {
            tracing::error!("{}", e);
            return Ok(EXIT_FAILURE);
        }
    };

    if listing.is_empty() {
        println!("No sources configured in {}", paths.machine_config_file.display());
        return Ok(EXIT_SUCCESS);
    }

    for entry in listing {
        println!(
            "[{}] {:<20} {} -> {}{}",
            if entry.source.enabled { "on " } else { "off" },
            entry.source.name,
            entry.source.path,
            entry.destination.display(),
            if entry.source_exists { "" } else { "  (source missing)" }
        );
    }
    Ok(EXIT_SUCCESS)
}
