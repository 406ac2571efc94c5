pub mod aggregator;
pub mod error;
pub mod factory;
pub mod job;
pub mod messages;
pub mod orchestrator;
pub mod ports;
pub mod post;
pub mod reconciler;
pub mod sweeper;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;
