use thiserror::Error;

use crate::messages::JobRequestedMessage;
use crate::ports::BoxFuture;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus unavailable: {0}")]
    Unavailable(String),
    #[error("bus serialization error: {0}")]
    Serialization(String),
    #[error("bus operation failed: {0}")]
    Operation(String),
}

/// Outbound edge of the pipeline. Publishing happens strictly after the job
/// rows are committed; a failed publish is logged and absorbed, with the
/// timeout sweeper bounding the damage.
pub trait JobRequestPublisher: Send + Sync {
    fn publish(&self, message: &JobRequestedMessage) -> BoxFuture<'_, Result<(), BusError>>;
}
