//! # Manifest Harness CLI (`mh`)
//!
//! Walks a manifest tree and prints what it finds.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mh files [ROOT]` | Every file, depth-first, with its Helm hints |
//! | `mh resources [ROOT]` | Resource table, or JSON with `--json` |
//! | `mh tree [ROOT]` | File map as JSON |
//! | `mh scan [ROOT]` | Summary counts |
//!
//! ROOT defaults to `[project] root` from the config file. With
//! `--source github` it is an `/owner/repo` path.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use manifest_harness::aggregate::{get_service, open_repository, SourceKind};
use manifest_harness::config::{self, Config};
use manifest_harness::diagnostics::DiagnosticsMode;
use manifest_harness::{logging, scan};

/// Manifest Harness CLI: aggregate Kubernetes resources from a manifest tree.
#[derive(Parser)]
#[command(
    name = "mh",
    about = "Manifest Harness: aggregate Kubernetes resources from a manifest tree",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply without one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where parse diagnostics go. Defaults to `log` on a terminal, `json` otherwise.
    #[arg(long, global = true, value_enum)]
    diagnostics: Option<DiagnosticsMode>,

    /// Debug-level logging.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments shared by every command.
#[derive(Args)]
struct Target {
    /// Root to walk: a directory, or `/owner/repo` with `--source github`.
    root: Option<String>,

    /// Repository implementation to read from.
    #[arg(long, value_enum, default_value = "local")]
    source: SourceKind,
}

#[derive(Subcommand)]
enum Commands {
    /// List every file in depth-first order.
    Files {
        #[command(flatten)]
        target: Target,
    },

    /// List every resource.
    Resources {
        #[command(flatten)]
        target: Target,

        /// Print the resource map as JSON.
        #[arg(long)]
        json: bool,

        /// Only resources of this kind (case-insensitive).
        #[arg(long)]
        kind: Option<String>,
    },

    /// Print the file map as JSON.
    Tree {
        #[command(flatten)]
        target: Target,
    },

    /// Print summary counts.
    Scan {
        #[command(flatten)]
        target: Target,
    },
}

impl Commands {
    fn target(&self) -> &Target {
        match self {
            Commands::Files { target }
            | Commands::Resources { target, .. }
            | Commands::Tree { target }
            | Commands::Scan { target } => target,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    let mode = cli
        .diagnostics
        .or(cfg.diagnostics.mode)
        .unwrap_or_else(DiagnosticsMode::default_for_tty);

    let target = cli.command.target();
    let root = scan::resolve_root(target.root.as_deref(), &cfg, target.source)?;
    let repository = open_repository(&cfg, target.source, mode.sink())?;
    let service = get_service(repository);

    match &cli.command {
        Commands::Files { .. } => scan::run_files(&service, &root).await?,
        Commands::Resources { json, kind, .. } => {
            scan::run_resources(&service, &root, *json, kind.as_deref()).await?
        }
        Commands::Tree { .. } => scan::run_tree(&service, &root).await?,
        Commands::Scan { .. } => scan::run_scan(&service, &root).await?,
    }

    Ok(())
}
