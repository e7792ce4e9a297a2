//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Strata - layered semantic indexing and retrieval
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(about = "Build a three-layer semantic index and answer queries against it")]
#[command(
    long_about = "Strata indexes chunked transcripts at three levels (filename, chunk title, chunk content) \
and picks a retrieval strategy per query from the best score of each level.\n\n\
Typical flow:\n  \
strata chunk raw.json -o chunked.json\n  \
strata index chunked.json\n  \
strata search \"how do arrays work\""
)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: ./strata.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Minimize output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Split raw transcripts into semantic chunks with a language model
    Chunk {
        /// JSON array of {id, filename, external_link, content}
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Where the chunked corpus is written
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Keep documents already present in OUTPUT and only chunk the rest
        #[arg(long)]
        resume: bool,
    },

    /// Normalize filenames, titles and contents of a chunked corpus
    Normalize {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Recreate the collection and index a chunked corpus
    Index {
        #[arg(value_name = "CORPUS")]
        corpus: PathBuf,

        /// Normalize text before embedding
        #[arg(long)]
        normalize: bool,

        /// Print embedding and store telemetry when done
        #[arg(long)]
        stats: bool,
    },

    /// Answer a query from the index
    Search {
        #[arg(value_name = "QUERY")]
        query: String,

        /// Number of ranked results (default from config)
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check the embedding service and the vector store
    Health {
        /// Print telemetry and Prometheus metrics when done
        #[arg(long)]
        stats: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}
