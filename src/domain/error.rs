//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent structural problems with a tree or its branch data.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("malformed tree: {reason}")]
    TreeParse { reason: String },

    #[error("invalid traversal: {0}")]
    InvalidTraversal(String),

    #[error("missing {attribute} for branch: {node}")]
    MissingAttribute {
        node: String,
        attribute: &'static str,
    },
}

impl DomainError {
    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        Self::TreeParse {
            reason: reason.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
