//! Janus CLI - Inspect C++ cursors from the command line.
//!
//! Janus parses C++ files with tree-sitter into classified cursors and can
//! keep them fresh while the files change on disk.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

/// Janus: C++ cursor inspection and incremental monitoring.
#[derive(Parser)]
#[command(name = "janus")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Header search directory (can be repeated)
    #[arg(short = 'I', long = "include", global = true)]
    include: Vec<PathBuf>,

    /// Macro definition, NAME or NAME=VALUE (can be repeated)
    #[arg(short = 'D', long = "define", global = true)]
    define: Vec<String>,

    /// Language standard (e.g., "c++17")
    #[arg(long = "std", global = true)]
    standard: Option<String>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cursor tree of a file
    Dump {
        /// C++ source file
        file: PathBuf,

        /// Maximum depth to print (root is depth 0)
        #[arg(short, long)]
        depth: Option<usize>,

        /// Emit JSON instead of an indented tree
        #[arg(long)]
        json: bool,
    },

    /// Count cursors by kind across files
    Kinds {
        /// C++ source files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List every cursor of one kind
    Find {
        /// C++ source file
        file: PathBuf,

        /// Cursor kind (e.g., "DO_STMT" or "DoStmt")
        kind: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show the innermost cursor at a position
    At {
        /// C++ source file
        file: PathBuf,

        /// Line (1-indexed)
        line: u32,

        /// Column (1-indexed, in bytes)
        column: u32,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Watch files and report every new generation until stdin closes
    Watch {
        /// C++ source files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = cli::Options {
        config: cli.config,
        include: cli.include,
        define: cli.define,
        standard: cli.standard,
    };

    let result = match cli.command {
        Commands::Dump { file, depth, json } => cli::dump::run(&options, &file, depth, json),
        Commands::Kinds { files } => cli::kinds::run(&options, &files),
        Commands::Find { file, kind, limit } => cli::find::run(&options, &file, &kind, limit),
        Commands::At {
            file,
            line,
            column,
            json,
        } => cli::at::run(&options, &file, line, column, json),
        Commands::Watch { files } => cli::watch::run(&options, &files),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  {}: {cause}", "caused by".dimmed());
                source = std::error::Error::source(cause);
            }
            ExitCode::FAILURE
        }
    }
}
