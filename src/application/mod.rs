//! Application layer: loaders, reports and services
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod document;
pub mod error;
pub mod error_ext;
pub mod report;
pub mod services;
pub mod tables;

pub use document::{SelectionResult, DEFAULT_PARTITION};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::PathContextExt;
pub use report::{OutputFormat, PssReport};
pub use tables::{AnnotationTable, SignificanceTable};
