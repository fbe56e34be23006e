use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "docvec", about = "Index local documents into a vector store and search them")]
pub struct Cli {
    /// Configuration file; `config.<env>.toml` next to it is merged on top
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create and populate the active collection if it is missing or empty
    Index,
    /// Rebuild into the alternate collection and switch to it
    Refresh,
    /// Search the active collection
    Search(SearchArgs),
    /// Show the active collection and its size
    Status,
}

#[derive(Debug, clap::Args)]
pub struct SearchArgs {
    /// Free-text query
    pub query: String,

    /// Number of results (defaults to `search_result_limit`)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Skip keyword re-ranking
    #[arg(long)]
    pub no_boost: bool,
}
