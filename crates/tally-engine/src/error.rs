use tally_core::StoreError;
use thiserror::Error;

/// Errors surfaced by timesheet computation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A storage call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A caller-provided range is not usable.
    #[error("invalid range: {0}")]
    InvalidRange(String),
    /// The batch worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    /// A background task did not run to completion.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
