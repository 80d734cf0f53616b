//! Portal CLI - navigation engine.
//!
//! Provides commands for:
//! - `resolve`: Resolve a request path to a navigation node
//! - `children`: List the children of the node at a path
//! - `parent`: Show the parent of the node at a path
//! - `root`: Show the website's Home node
//! - `tree`: Render the navigation tree below a node

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{GlobalArgs, PathArgs, TreeArgs};
use output::Output;

/// Portal - content-path resolution and navigation.
#[derive(Parser)]
#[command(name = "portal", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a request path or URL to a node.
    Resolve(PathArgs),
    /// List the children of the node at a path.
    Children(PathArgs),
    /// Show the parent of the node at a path.
    Parent(PathArgs),
    /// Show the website's Home node.
    Root,
    /// Render the navigation tree below a node.
    Tree(TreeArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new(cli.global.json);

    // --verbose enables DEBUG level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Resolve(args) => commands::resolve(&cli.global, &args, &output),
        Commands::Children(args) => commands::children(&cli.global, &args, &output),
        Commands::Parent(args) => commands::parent(&cli.global, &args, &output),
        Commands::Root => commands::root(&cli.global, &output),
        Commands::Tree(args) => commands::tree(&cli.global, &args, &output),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
