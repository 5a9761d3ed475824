mod clear;
mod index;
mod lookup;
mod resolve;
mod view;
mod watch;

use clap::{Parser, Subcommand};
use smaliscope_core::{EngineHandle, SmaliscopeEngine};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "smaliscope",
    version,
    about = "Symbol index and reference resolver for smali projects",
    long_about = "Smaliscope indexes the classes declared in a tree of .smali files and resolves \
                  class, field and method references against that index, following the super \
                  class and interface hierarchy the way the runtime does."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index a project directory
    #[command(
        long_about = "Scans the project for .smali files and builds the symbol index. Stubs are \
                      persisted under ~/.smaliscope/indices/ (or $SMALISCOPE_INDEX_DIR) so that \
                      unchanged files are not parsed again."
    )]
    Index {
        /// Path to the project root directory to index
        #[arg(value_name = "PROJECT_PATH")]
        path: PathBuf,
        /// Ignore persisted stubs and parse every file
        #[arg(long)]
        rebuild: bool,
    },
    /// List every class declared under a qualified name
    Lookup {
        /// Dotted class name, e.g. com.example.Foo
        name: String,
        /// Project root. Defaults to the current directory.
        #[arg(long, value_name = "PROJECT_PATH")]
        project: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// List the fields and methods a class declares
    Members {
        /// Dotted class name, e.g. com.example.Foo
        name: String,
        #[arg(long, value_name = "PROJECT_PATH")]
        project: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Resolve the reference at a position of a smali file
    Resolve {
        file: PathBuf,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        #[arg(long, value_name = "PROJECT_PATH")]
        project: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Watch for file changes and update the index automatically
    Watch {
        #[arg(value_name = "PROJECT_PATH")]
        path: PathBuf,
    },
    /// Clear persisted indices
    #[command(
        long_about = "Removes persisted stub stores. If a path is provided, only that project's \
                      store is removed. Otherwise, all stores are cleared."
    )]
    Clear {
        #[arg(value_name = "PROJECT_PATH")]
        path: Option<PathBuf>,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let to_stderr = matches!(cli.command, Commands::Index { .. } | Commands::Watch { .. });
    let _guard = smaliscope_core::logging::init_logging("cli", to_stderr);

    match cli.command {
        Commands::Index { path, rebuild } => index::run(path, rebuild),
        Commands::Lookup {
            name,
            project,
            json,
        } => lookup::run_lookup(&open_project(project)?, &name, json),
        Commands::Members {
            name,
            project,
            json,
        } => lookup::run_members(&open_project(project)?, &name, json),
        Commands::Resolve {
            file,
            line,
            column,
            project,
            json,
        } => {
            let handle = open_project(project)?;
            resolve::run(&handle, file, line, column, json)
        }
        Commands::Watch { path } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(watch::run(path))
        }
        Commands::Clear { path } => clear::run(path),
    }
}

/// Open and index the project at `path`, or the current directory.
fn open_project(path: Option<PathBuf>) -> Result<EngineHandle, Box<dyn std::error::Error>> {
    let root = match path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let engine = Arc::new(SmaliscopeEngine::builder(root).build());
    engine.open()?;
    Ok(EngineHandle::from_engine(engine))
}
