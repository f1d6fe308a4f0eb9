//! faceid CLI - inspect and query a face identity store.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    ConfigCommand, ListCommand, RecognizeCommand, RegisterCommand, RemoveCommand, ShowCommand,
};

/// faceid CLI - manage enrolled face identities.
///
/// Works on precomputed embeddings: enroll an identity from one or more
/// sample vectors, match a query vector, list or remove identities.
///
/// Configuration is stored in ~/.faceid/config.yaml and the identity store
/// in ~/.faceid/data/faces.redb by default.
#[derive(Parser)]
#[command(name = "faceid")]
#[command(about = "Face identity store CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.faceid/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Store file (overrides store_path from the config)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Input file (YAML or JSON)
    #[arg(short = 'f', long = "file", global = true)]
    pub input: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List enrolled identities
    List(ListCommand),
    /// Show one identity
    Show(ShowCommand),
    /// Remove an identity
    Remove(RemoveCommand),
    /// Match an embedding against enrolled identities
    Recognize(RecognizeCommand),
    /// Enroll an identity from sample embeddings
    Register(RegisterCommand),
    /// Manage CLI configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::List(cmd) => cmd.run(&cli).await,
        Commands::Show(cmd) => cmd.run(&cli).await,
        Commands::Remove(cmd) => cmd.run(&cli).await,
        Commands::Recognize(cmd) => cmd.run(&cli).await,
        Commands::Register(cmd) => cmd.run(&cli).await,
        Commands::Config(cmd) => cmd.run(&cli).await,
    }
}
