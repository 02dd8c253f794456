//! Domain layer - core types and errors.
//!
//! This layer contains pure domain models, configuration structures and
//! error types without any I/O.

pub mod config;
pub mod error;
pub mod models;

pub use config::{AppConfig, PathConfig, CONTAINER_DIRS};
pub use error::{AppError, Result};
pub use models::{
    ChatRecord, ConversationRecord, ExtractionStats, Message, MessageContent, ProjectInfo, Role,
    SessionMetadata, GLOBAL_WORKSPACE, UNKNOWN,
};
