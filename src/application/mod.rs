//! Application layer - use cases and orchestration.
//!
//! This layer contains the extraction pipeline, the export formats and
//! the selection and writing logic behind each command.

pub mod export;
pub mod extractor;
pub mod formatter;
pub mod log_export;
pub mod parser;
pub mod project_name;
pub mod readers;
pub mod selection;
pub mod workspace;

pub use export::{export_batch, export_single};
pub use extractor::extract_all_conversations;
pub use formatter::{format_conversations_table, format_session_list, format_stats, OutputFormat};
pub use log_export::{default_output_name, export_logs, format_log_summary, LogFormat};
pub use selection::{SessionFilter, NO_RECORDS_HINT};
