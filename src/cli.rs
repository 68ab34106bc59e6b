//! Command-line interface implementation

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::{load_config, SluiceConfig};
use crate::error::Error;
use crate::orchestrator::Orchestrator;
use crate::report::ConsoleReporter;
use crate::transforms::TransformRegistry;
use crate::watch::watch_and_rebuild;

const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// Sluice - incremental asset build pipeline
#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Incremental asset build pipeline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full build pass over the source directory
    Build {
        /// Path to sluice.toml (discovered by walking up from the
        /// current directory when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Per-stream progress output
        #[arg(short, long)]
        verbose: bool,

        /// Suppress progress output entirely
        #[arg(short, long, conflicts_with = "verbose")]
        quiet: bool,
    },
    /// Build once, then watch the source directory and rebuild on changes
    Watch {
        /// Path to sluice.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Per-stream progress output
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { config, verbose, quiet } => run_build(config.as_deref(), verbose, quiet),
        Commands::Watch { config, verbose } => run_watch(config.as_deref(), verbose),
    }
}

/// Default pipeline when no programmatic registration happened: a single
/// catch-all copy stream built from the `read` and `write` plugins.
fn default_pipeline(orchestrator: &mut Orchestrator) -> Result<(), Error> {
    let registry = TransformRegistry::with_builtins();
    let mut def = orchestrator.pick("**/*")?;
    for name in ["read", "write"] {
        let transform = registry
            .get(name)
            .ok_or_else(|| Error::Config(format!("unknown transform: {}", name)))?;
        def = def.pipe(transform);
    }
    orchestrator.register(def, "copy")
}

fn load_or_exit(config: Option<&std::path::Path>) -> Result<SluiceConfig, ExitCode> {
    load_config(config).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}

fn setup(config: SluiceConfig, verbose: bool, quiet: bool) -> Result<Orchestrator, ExitCode> {
    let mut orchestrator = Orchestrator::new(config);
    if !quiet {
        orchestrator.add_observer(Box::new(ConsoleReporter::new().with_verbose(verbose)));
    }
    default_pipeline(&mut orchestrator).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_ERROR)
    })?;
    Ok(orchestrator)
}

/// Execute the build command
fn run_build(config: Option<&std::path::Path>, verbose: bool, quiet: bool) -> ExitCode {
    let config = match load_or_exit(config) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let mut orchestrator = match setup(config, verbose, quiet) {
        Ok(o) => o,
        Err(code) => return code,
    };

    match orchestrator.build() {
        Ok(summary) if summary.is_success() => ExitCode::from(EXIT_SUCCESS),
        Ok(_) => ExitCode::from(EXIT_ERROR),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Execute the watch command
fn run_watch(config: Option<&std::path::Path>, verbose: bool) -> ExitCode {
    let config = match load_or_exit(config) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let mut orchestrator = match setup(config, verbose, false) {
        Ok(o) => o,
        Err(code) => return code,
    };

    // A failing initial pass is not fatal in watch mode; fixing the file
    // triggers a recovery pass.
    if let Err(e) = orchestrator.build() {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }

    match watch_and_rebuild(&mut orchestrator) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
