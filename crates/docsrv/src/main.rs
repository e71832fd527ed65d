//! docsrv CLI - Versioned documentation server.
//!
//! Provides commands for:
//! - `serve`: Start the documentation server
//! - `releases`: List the releases docsrv would index for a repository

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ReleasesArgs, ServeArgs};
use error::CliError;
use output::Output;

/// docsrv - Builds and serves every released version of your docs.
#[derive(Parser)]
#[command(name = "docsrv", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the documentation server.
    Serve(ServeArgs),
    /// List the releases of a repository as docsrv indexes them.
    Releases(ReleasesArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose (or DEBUG_LOG) enables DEBUG level, otherwise RUST_LOG or INFO
    let verbose = matches!(&cli.command, Commands::Serve(args) if args.verbose);
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(cli.command) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Serve(args) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(args.execute())
        }
        Commands::Releases(args) => args.execute(),
    }
}
