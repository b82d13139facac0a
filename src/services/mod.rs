//! Service layer: the pipeline stages between the external seams.
//!
//! Services orchestrate the gateway, the binding repository and the schedule
//! source. Each stage returns typed failures; the distribution scheduler and
//! the refresh handler are the last line of defense and never let a failure
//! escape a tick.

pub mod collector;
pub mod digest;
pub mod distributor;
pub mod refresh;

pub use collector::HomeworkCollector;
pub use digest::DigestBuilder;
pub use distributor::{DestinationLocks, DistributionScheduler};
pub use refresh::RefreshHandler;

use crate::db::RepositoryError;
use crate::gateway::GatewayError;
use crate::scraper::ScrapeError;

/// Error type covering every pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
