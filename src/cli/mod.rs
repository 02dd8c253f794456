//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const EXAMPLES: &str = "\
Examples:
  chat-export list                                   # List all chat sessions
  chat-export export --format markdown               # Export current project's sessions
  chat-export export --all-projects --format html    # Export every project's sessions
  chat-export export --session-id abc123 --format html --output chat.html
  chat-export export --project cursor-view --format json
  chat-export logs --format markdown --limit 3       # Export Claude Code session logs";

/// Chat Exporter - Export Cursor IDE and Claude Code chat history.
#[derive(Parser, Debug)]
#[command(name = "chat-export")]
#[command(author, version, about, long_about = None, after_help = EXAMPLES)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file path (default: ~/.chat-exporter/config.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all chat sessions, grouped by project.
    List {
        /// Show a preview of each session's first message.
        #[arg(short, long)]
        verbose: bool,

        /// Show a summary table instead of the grouped listing.
        #[arg(long)]
        table: bool,
    },

    /// Export chat sessions to files.
    Export {
        /// Export format: json, markdown, md or html (default from config).
        #[arg(short, long)]
        format: Option<String>,

        /// Output directory or file path.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only sessions whose ID starts with this prefix.
        #[arg(short, long)]
        session_id: Option<String>,

        /// Only sessions whose project name contains this text.
        #[arg(short, long)]
        project: Option<String>,

        /// Export all projects' sessions (default: only the current project).
        #[arg(short, long)]
        all_projects: bool,

        /// Maximum number of sessions to export (0 means all).
        #[arg(short, long)]
        limit: Option<usize>,

        /// Enable debug logging.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show extraction statistics.
    Stats,

    /// Show the storage paths being used.
    Paths,

    /// Export Claude Code session logs for the current project.
    Logs {
        /// Output file path (default: claude_history_<timestamp>.<format>).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: json, jsonl or markdown.
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Only the N most recent log files (0 means all).
        #[arg(short, long)]
        limit: Option<usize>,

        /// List the available log files instead of exporting.
        #[arg(short, long)]
        summary: bool,
    },
}

impl Cli {
    /// Effective log verbosity; `export -v` means debug.
    #[must_use]
    pub fn verbosity(&self) -> u8 {
        match self.command {
            Commands::Export { verbose: true, .. } if self.verbose < 2 => 2,
            _ => self.verbose,
        }
    }
}
