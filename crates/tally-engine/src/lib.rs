//! Computation engine for the timesheet calculator.
//!
//! Sits between the core domain logic and whatever stores the data:
//! - Builders: daily and weekly timesheets computed from stored events
//! - Batching: directory-wide weekly runs on a fixed worker pool
//! - Scheduling: a periodic loop plus gated on-demand runs
//! - Rollups: monthly figures derived from stored weekly summaries

mod aggregator;
mod batch;
mod builder;
mod config;
mod error;
#[cfg(test)]
pub(crate) mod memstore;
mod rollup;
mod scheduler;

pub use aggregator::WeeklyAggregator;
pub use batch::{BatchFailure, BatchOutcome, BatchProcessor};
pub use builder::DailyTimesheetBuilder;
pub use config::{EngineConfig, ScheduleConfig};
pub use error::EngineError;
pub use rollup::monthly_rollup;
pub use scheduler::{Scheduler, TriggerRequest, TriggerResult};
