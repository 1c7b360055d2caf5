use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seeker")]
#[command(about = "Seeker - semantic search over a local directory", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging (same as DEBUG_MODE=true)
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new config file
    Init {
        /// Path for new config file
        #[arg(default_value = "seeker.toml")]
        path: PathBuf,
    },
    /// Index the configured root, reprocessing only changed files
    Index,
    /// Search the index
    Search {
        /// Natural-language query
        query: String,
        /// Filters as a JSON object, e.g. '{"file_type": "image"}'
        #[arg(long)]
        filters: Option<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show index statistics
    Stats,
    /// Start the HTTP search server
    Serve {
        /// Host to bind to (defaults to config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (defaults to config)
        #[arg(long)]
        port: Option<u16>,
        /// Reindex automatically when files under the root change
        #[arg(long)]
        watch: bool,
    },
}
