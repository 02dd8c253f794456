//! Infrastructure layer - external adapters (database, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod cursor_paths;
pub mod session_logs;
pub mod sqlite_reader;

pub use config::load_config;
pub use cursor_paths::{find_cursor_root, global_storage_path, workspace_databases};
pub use session_logs::{
    default_logs_dir, list_log_files, project_log_dir, read_log_file, LogEntry, LogFile,
};
pub use sqlite_reader::StateDbReader;
