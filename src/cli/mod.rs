//! CLI module for Evrika.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Evrika Briefs - ask questions about YouTube videos and turn them into briefs
///
/// Ingests a video's captions (or Whisper transcript) into a vector store,
/// answers questions about it and writes one-page Markdown/PDF briefs.
#[derive(Parser, Debug)]
#[command(name = "evrika")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "EVRIKA_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API used by the web front-end
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ingest a YouTube video into the knowledge base
    Ingest {
        /// YouTube URL or video ID
        url: String,

        /// Delete stored chunks and process the video again
        #[arg(short, long)]
        force: bool,
    },

    /// Ask a question about an ingested video
    Ask {
        /// The question to ask
        question: String,

        /// YouTube URL or ID to restrict the answer to
        #[arg(short, long)]
        video: Option<String>,
    },

    /// Show the transcript chunks closest to a query
    Search {
        /// Search query
        query: String,

        /// YouTube URL or ID to restrict the search to
        #[arg(short, long)]
        video: Option<String>,
    },

    /// Generate a one-page brief for a video
    Brief {
        /// YouTube URL or video ID
        video: String,

        /// Also render the brief to this PDF file
        #[arg(long)]
        pdf: Option<String>,
    },

    /// Start an interactive chat with the tool-calling agent
    Chat,

    /// List ingested videos
    List,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Tracing filter directive: `-v` flags win over the configured level.
pub fn log_directive(verbose: u8, configured_level: &str) -> String {
    let level = match verbose {
        0 => configured_level.trim(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let level = if level.is_empty() { "warn" } else { level };
    format!("evrika={}", level)
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
        #[arg(long)]
        force: bool,
    },
}
