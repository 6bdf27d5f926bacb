pub mod annotate;
pub mod bio;
pub mod cli;
pub mod core;
pub mod kits;
pub mod testing;
pub mod tools;
pub mod utils;

pub use crate::annotate::pipeline::{annotate_project, AnnotateOutcome, AnnotateRequest};
pub use crate::annotate::table::AnnotationTable;
pub use crate::kits::DatabaseKit;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl AnnotError {
    pub fn external(tool: impl Into<String>, message: impl Into<String>) -> Self {
        AnnotError::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Process exit code used by the binary for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            AnnotError::Usage(_) => 2,
            AnnotError::Configuration(_) => 3,
            AnnotError::ExternalTool { .. } => 4,
            AnnotError::Io(_) => 5,
            AnnotError::Parse(_) | AnnotError::Serialization(_) | AnnotError::Other(_) => 1,
        }
    }
}

impl From<serde_json::Error> for AnnotError {
    fn from(e: serde_json::Error) -> Self {
        AnnotError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for AnnotError {
    fn from(e: csv::Error) -> Self {
        AnnotError::Parse(format!("Malformed table: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, AnnotError>;
