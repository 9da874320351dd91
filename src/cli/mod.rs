//! CLI module for vidqa.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// vidqa - Ask questions about YouTube videos
///
/// Fetches a video's captions, indexes them in a vector store, and answers
/// questions with retrieved passages and a language model.
#[derive(Parser, Debug)]
#[command(name = "vidqa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question about a video
    Ask {
        /// YouTube URL or 11-character video ID
        video: String,

        /// The question to ask
        question: String,
    },

    /// Start an interactive conversation about a video
    Chat {
        /// YouTube URL or 11-character video ID
        video: String,
    },

    /// Manage the shared vector index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Check credentials, providers and index reachability
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Create the index if it does not exist
    Ensure,

    /// Show vector counts per namespace
    Stats,

    /// Delete the whole index
    Delete {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Drop a video's vectors so the next question re-indexes it
    Reindex {
        /// YouTube URL or 11-character video ID
        video: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from(["vidqa", "-vv", "ask", "dQw4w9WgXcQ", "What is this?"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask { video, question } => {
                assert_eq!(video, "dQw4w9WgXcQ");
                assert_eq!(question, "What is this?");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_index_reindex() {
        let cli = Cli::try_parse_from(["vidqa", "index", "reindex", "https://youtu.be/dQw4w9WgXcQ"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Index { action: IndexAction::Reindex { .. } }
        ));
    }
}
