//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),

    #[error("{failed} of {total} result documents failed")]
    Failed { failed: usize, total: usize },
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::Failed { .. } => exitcode::DATAERR,
            CliError::Infra(InfraError::Io { .. }) => exitcode::IOERR,
            CliError::Infra(InfraError::Application(e)) => application_exit_code(e),
        }
    }
}

/// Exit code for an application error.
pub fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::Domain(_)
        | ApplicationError::TreeFailed { .. }
        | ApplicationError::InvalidDocument { .. }
        | ApplicationError::InvalidTable { .. } => exitcode::DATAERR,
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::OperationFailed { source, .. } => {
            match source.downcast_ref::<std::io::Error>().map(|io| io.kind()) {
                Some(std::io::ErrorKind::NotFound) => exitcode::NOINPUT,
                Some(std::io::ErrorKind::PermissionDenied) => exitcode::CANTCREAT,
                _ => exitcode::IOERR,
            }
        }
    }
}
