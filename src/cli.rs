// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "djangostack")]
#[command(about = "Provision Django servers over SSH: packages, database, web server, checkouts")]
#[command(version)]
pub struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results and warnings
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a djangostack.yml template in the current directory
    Init {
        /// Project name (defaults to the directory name)
        #[arg(short, long)]
        project: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration and print the stage plan
    Check,

    /// Build the configured servers
    Build {
        /// Rebuild provisioned servers without asking
        #[arg(short, long)]
        yes: bool,

        /// Only build the server with this host
        #[arg(short, long)]
        server: Option<String>,
    },

    /// Show the provisioning marker of every server
    Status {
        /// Only query the server with this host
        #[arg(short, long)]
        server: Option<String>,
    },
}
