use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("precondition violated: {0}")]
    Precondition(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
}
