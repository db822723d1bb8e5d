// ABOUTME: Entry point for the djangostack CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use djangostack::error::Result;
use djangostack::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);

    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { project, force } => {
            commands::init(&cwd, project.as_deref(), force, &output)
        }
        Commands::Check => commands::check(&cwd, &output),
        Commands::Build { yes, server } => {
            commands::build(&cwd, yes, server.as_deref(), output).await
        }
        Commands::Status { server } => commands::status(&cwd, server.as_deref(), output).await,
    }
}
