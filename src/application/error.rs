//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add document, table and run context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("gene '{gene}', tree '{tree}': {source}")]
    TreeFailed {
        gene: String,
        tree: String,
        #[source]
        source: DomainError,
    },

    #[error("invalid result document {path}: {message}")]
    InvalidDocument { path: PathBuf, message: String },

    #[error("invalid table {path}: {message}")]
    InvalidTable { path: PathBuf, message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
