//! Chat Exporter - Export chat history from Cursor IDE and Claude Code.
//!
//! Reads Cursor's `SQLite` state databases (read-only) and reassembles the
//! conversations stored in them, then writes them as JSON, Markdown or
//! self-contained HTML. Claude Code's JSONL session logs can be exported
//! as well.
//!
//! QUICK START:
//!   chat-export list -v                       # Sessions grouped by project
//!   chat-export export                        # Current project's sessions to Markdown
//!   chat-export export -a -f html -o exports  # Everything, as HTML files
//!   chat-export logs -f markdown              # Claude Code logs for this directory

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    default_output_name, export_batch, export_logs, export_single, extract_all_conversations,
    format_conversations_table, format_log_summary, format_session_list, format_stats,
    LogFormat, OutputFormat, SessionFilter, NO_RECORDS_HINT,
};
use cli::{Cli, Commands};
use domain::{AppConfig, AppError};
use infrastructure::{
    default_logs_dir, find_cursor_root, global_storage_path, list_log_files, load_config,
    project_log_dir, workspace_databases,
};

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbosity());

    if let Err(e) = run(cli) {
        match e {
            AppError::NoRecords { message, hint } => {
                println!("❌ {message}");
                if let Some(hint) = hint {
                    println!("💡 {hint}");
                }
            }
            e => eprintln!("{} {}", "Error:".red().bold(), e),
        }
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> domain::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::List { verbose, table } => cmd_list(&config, verbose, table),
        Commands::Export {
            format,
            output,
            session_id,
            project,
            all_projects,
            limit,
            ..
        } => {
            let filter =
                SessionFilter::new(session_id, project, all_projects, limit, &current_dir()?);
            cmd_export(&config, format.as_deref(), output, &filter)
        }
        Commands::Stats => cmd_stats(&config),
        Commands::Paths => cmd_paths(&config),
        Commands::Logs {
            output,
            format,
            limit,
            summary,
        } => cmd_logs(&config, output, &format, limit, summary),
    }
}

fn current_dir() -> domain::Result<PathBuf> {
    std::env::current_dir().map_err(|e| AppError::io("Failed to read current directory", e))
}

fn parse_format<T: std::str::FromStr<Err = String>>(value: &str) -> domain::Result<T> {
    value
        .parse()
        .map_err(|message| AppError::InvalidData { message })
}

/// List sessions command.
fn cmd_list(config: &AppConfig, verbose: bool, table: bool) -> domain::Result<()> {
    println!("🔍 Searching Cursor chat records...");

    let (conversations, _) = extract_all_conversations(config)?;
    if conversations.is_empty() {
        return Err(AppError::no_records("No chat records found", Some(NO_RECORDS_HINT)));
    }

    println!("✅ Found {} chat sessions\n", conversations.len());

    if table {
        println!("{}", format_conversations_table(&conversations));
    } else {
        print!("{}", format_session_list(&conversations, verbose));
    }

    Ok(())
}

/// Export sessions command.
fn cmd_export(
    config: &AppConfig,
    format: Option<&str>,
    output: Option<PathBuf>,
    filter: &SessionFilter,
) -> domain::Result<()> {
    let format: OutputFormat = parse_format(format.unwrap_or(&config.export.format))?;

    println!("🔍 Searching Cursor chat records...");
    let (conversations, _) = extract_all_conversations(config)?;

    let selected = filter.apply(conversations)?;
    println!("📋 {}", filter.scope);
    println!(
        "📊 Preparing to export {} chat sessions (format: {})",
        selected.len(),
        format
    );

    let output_base = match output.or_else(|| config.export.output_dir.clone()) {
        Some(path) => path,
        None => current_dir()?,
    };

    if let [record] = selected.as_slice() {
        let file = export_single(record, format, &output_base)?;
        println!("{} Export successful: {}", "✅".green(), file.path.display());
        println!("📄 File size: {} bytes", file.bytes);
        if let Some(diagnostic) = file.diagnostic {
            println!("{} Formatter failed, wrote error document: {}", "⚠".yellow(), diagnostic);
        }
        return Ok(());
    }

    println!("📁 Output directory: {}", output_base.display());
    let entries = export_batch(&selected, format, &output_base)?;
    let total = entries.len();

    for entry in entries {
        match entry.result {
            Ok(file) => {
                let name = file
                    .path
                    .file_name()
                    .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
                println!("✅ {}/{}: {}", entry.index, total, name);
                if let Some(diagnostic) = file.diagnostic {
                    println!("   {} {}", "⚠ error document written:".yellow(), diagnostic);
                }
            }
            Err(e) => println!(
                "❌ {}/{}: Export failed for {} - {}",
                entry.index, total, entry.session_id, e
            ),
        }
    }

    println!(
        "\n🎉 Batch export completed! Files saved in: {}",
        output_base.display()
    );
    Ok(())
}

/// Show statistics command.
fn cmd_stats(config: &AppConfig) -> domain::Result<()> {
    let (conversations, stats) = extract_all_conversations(config)?;
    println!("{}", format_stats(&stats, &conversations));
    Ok(())
}

/// Show storage paths command.
fn cmd_paths(config: &AppConfig) -> domain::Result<()> {
    let root = find_cursor_root(&config.paths)?;

    println!("{}", "📂 Cursor Storage Paths".bold());
    println!();
    println!("  Root: {}", root.display());

    match global_storage_path(&root) {
        Some(path) => println!("  [{}] {}", "global".green(), path.display()),
        None => println!("  [{}] not found", "global".green()),
    }

    let workspaces = workspace_databases(&root);
    for (i, ws) in workspaces.iter().enumerate() {
        println!("  {}. [{}] {}", i + 1, "workspace".blue(), ws.path.display());
    }

    println!();
    println!("Total: {} workspace database(s)", workspaces.len());
    println!("Session logs: {}", logs_dir(config)?.display());

    Ok(())
}

/// Claude Code session log command.
fn cmd_logs(
    config: &AppConfig,
    output: Option<PathBuf>,
    format: &str,
    limit: Option<usize>,
    summary: bool,
) -> domain::Result<()> {
    let dir = logs_dir(config)?;

    if summary {
        println!("{}", format_log_summary(&list_log_files(&dir)?).trim_end());
        return Ok(());
    }

    let format: LogFormat = parse_format(format)?;
    let output = output.unwrap_or_else(|| PathBuf::from(default_output_name(format, Local::now())));

    let count = export_logs(&dir, &output, format, limit)?;
    println!("Exported {} entries to {}", count, output.display());
    Ok(())
}

/// Session log directory for the working directory's project.
fn logs_dir(config: &AppConfig) -> domain::Result<PathBuf> {
    let base = config
        .paths
        .session_logs_dir
        .clone()
        .unwrap_or_else(default_logs_dir);
    Ok(project_log_dir(&base, &current_dir()?))
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
