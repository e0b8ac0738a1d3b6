//! Directory-wide weekly batch computation.

use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;

use tally_core::{EmployeeDirectory, EmployeeId, EventStore, SummaryStore, WeeklySummary};

use crate::aggregator::{WeeklyAggregator, ensure_week_start};
use crate::config::EngineConfig;
use crate::error::EngineError;

/// One employee skipped during a batch run, with the error that caused it.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub employee: EmployeeId,
    pub message: String,
}

/// Result of one batch run over the employee directory.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Sunday of the computed week.
    pub week_start: NaiveDate,
    /// Summaries computed and stored, in directory order.
    pub summaries: Vec<WeeklySummary>,
    /// Employees skipped after a computation failure.
    pub failures: Vec<BatchFailure>,
}

/// Recomputes a week for every employee in the directory on a fixed-size
/// worker pool.
///
/// A failure while computing one employee does not abort the run; that
/// employee moves to [`BatchOutcome::failures`] and the rest are still
/// computed and stored. Only a failure to enumerate the directory itself
/// fails the whole run.
pub struct BatchProcessor<S> {
    aggregator: WeeklyAggregator<S>,
    directory: Arc<S>,
    pool: rayon::ThreadPool,
}

impl<S> BatchProcessor<S>
where
    S: EventStore + EmployeeDirectory + SummaryStore,
{
    pub fn new(store: Arc<S>, config: EngineConfig) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|index| format!("tally-batch-{index}"))
            .build()?;
        let aggregator = WeeklyAggregator::new(Arc::clone(&store), config.utc_offset);
        Ok(Self {
            aggregator,
            directory: store,
            pool,
        })
    }

    /// Computes and stores the given week for every employee in the
    /// directory.
    pub fn process_week(&self, week_start: NaiveDate) -> Result<BatchOutcome, EngineError> {
        ensure_week_start(week_start)?;
        let employees = self.directory.list_employee_ids()?;
        tracing::info!(
            week_start = %week_start,
            employees = employees.len(),
            "starting weekly batch"
        );

        let results: Vec<Result<WeeklySummary, BatchFailure>> = self.pool.install(|| {
            employees
                .par_iter()
                .map(|employee| {
                    self.aggregator
                        .compute_and_store(employee, week_start)
                        .map_err(|err| {
                            tracing::warn!(
                                employee = %employee,
                                week_start = %week_start,
                                error = %err,
                                "skipping employee after computation failure"
                            );
                            BatchFailure {
                                employee: employee.clone(),
                                message: err.to_string(),
                            }
                        })
                })
                .collect()
        });

        let mut summaries = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(failure) => failures.push(failure),
            }
        }
        tracing::info!(
            week_start = %week_start,
            computed = summaries.len(),
            failed = failures.len(),
            "weekly batch finished"
        );
        Ok(BatchOutcome {
            week_start,
            summaries,
            failures,
        })
    }
}
