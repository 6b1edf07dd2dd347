//! CLI module for pocketrag.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Offline document retrieval for grounded question answering.
#[derive(Debug, Parser)]
#[command(name = "pocketrag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show embedding backend and chunk store status
    Status,

    /// Index a text file or a directory of text files
    Index(commands::IndexArgs),

    /// Search indexed chunks
    Search(commands::SearchArgs),

    /// Build a length-bounded context block for a query
    Context(commands::ContextArgs),

    /// List indexed documents
    List,

    /// Delete one indexed document
    Delete(commands::DeleteArgs),

    /// Delete every indexed document
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        force: bool,
    },

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
