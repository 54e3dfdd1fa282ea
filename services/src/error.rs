use grading::GradingError;
use sea_orm::DbErr;
use validator::ValidationErrors;

/// Errors surfaced by the service layer.
///
/// Domain rule violations pass through unchanged in [`ServiceError::Grading`]
/// so callers can map each kind to a client error.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Grading(#[from] GradingError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The row changed between read and write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(common::format_validation_errors(&errors))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
