//! CLI module for Lexwise.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Lexwise - Legal Document Chat Assistant
///
/// Summarize legal documents, index reference material, and ask questions
/// answered from both.
#[derive(Parser, Debug)]
#[command(name = "lexwise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "LEXWISE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check API keys, folders and configuration
    Doctor,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ingest the documents folder into a vector index
    Ingest {
        /// Index to write to (defaults to chat.index_name)
        #[arg(short, long)]
        index: Option<String>,

        /// Namespace within the index (defaults to chat.namespace)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Run on a Lexwise server instead of locally (e.g. http://127.0.0.1:3000)
        #[arg(short, long)]
        server: Option<String>,
    },

    /// List the files waiting in the documents folder
    Files,

    /// Summarize a legal document (JPEG, PNG, WEBP or PDF)
    Summarize {
        /// Path to the document
        path: String,

        /// Also write the summary to this file, for use with `ask --summary-file`
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Ask a legal question, optionally about a summarized document
    Ask {
        /// The question to ask
        question: String,

        /// Document summary to answer against
        #[arg(short, long, conflicts_with = "summary_file")]
        summary: Option<String>,

        /// Read the document summary from a file
        #[arg(long)]
        summary_file: Option<String>,

        /// Print the retrieved legal references after the answer
        #[arg(short = 'r', long)]
        show_references: bool,
    },

    /// Show how many vectors an index namespace holds
    Stats {
        /// Index to inspect (defaults to chat.index_name)
        #[arg(short, long)]
        index: Option<String>,

        /// Namespace within the index (defaults to chat.namespace)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest_against_server() {
        let cli = Cli::try_parse_from([
            "lexwise",
            "-v",
            "ingest",
            "--index",
            "index-one",
            "--namespace",
            "acts",
            "--server",
            "http://127.0.0.1:3000",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Ingest {
                index,
                namespace,
                server,
            } => {
                assert_eq!(index.as_deref(), Some("index-one"));
                assert_eq!(namespace.as_deref(), Some("acts"));
                assert_eq!(server.as_deref(), Some("http://127.0.0.1:3000"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_summary_sources_conflict() {
        let result = Cli::try_parse_from([
            "lexwise",
            "ask",
            "Is this lease valid?",
            "--summary",
            "text",
            "--summary-file",
            "summary.txt",
        ]);
        assert!(result.is_err());
    }
}
