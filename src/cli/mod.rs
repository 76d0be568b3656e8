//! CLI module for Lectern.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Lectern - course content ingestion and retrieval
///
/// Upload lecture videos and slides, index them per course, and answer
/// student questions from the indexed material.
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "LECTERN_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Process local assets for a course in the foreground
    Process {
        /// Course identifier
        #[arg(long)]
        course: String,

        /// Instructor identifier
        #[arg(long)]
        instructor: String,

        /// Lecture video file
        #[arg(long)]
        video: Option<String>,

        /// Slide PDF file
        #[arg(long)]
        pdf: Option<String>,
    },

    /// Ask a question against one course's material
    Ask {
        /// The question to ask
        question: String,

        /// Course to search
        #[arg(long)]
        course: String,
    },

    /// Show processing status of a course
    Status {
        /// Course identifier
        course: String,
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

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init,
}
