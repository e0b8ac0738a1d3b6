//! Weekly aggregation over daily timesheets.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Utc};

use tally_core::{EmployeeId, EventStore, SummaryStore, WeeklySummary, WeeklyTimesheet, calendar};

use crate::builder::DailyTimesheetBuilder;
use crate::error::EngineError;

/// Rolls one employee's seven days into a weekly timesheet.
pub struct WeeklyAggregator<S> {
    store: Arc<S>,
    daily: DailyTimesheetBuilder<S>,
}

impl<S> Clone for WeeklyAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            daily: self.daily.clone(),
        }
    }
}

impl<S: EventStore> WeeklyAggregator<S> {
    pub fn new(store: Arc<S>, utc_offset: FixedOffset) -> Self {
        let daily = DailyTimesheetBuilder::new(Arc::clone(&store), utc_offset);
        Self { store, daily }
    }

    /// Aggregates the week starting on the given Sunday.
    ///
    /// Every aggregate field is the sum of the corresponding daily field; no
    /// weekly cap is applied on top of the per-day split.
    pub fn aggregate(
        &self,
        employee: &EmployeeId,
        week_start: NaiveDate,
    ) -> Result<WeeklyTimesheet, EngineError> {
        ensure_week_start(week_start)?;
        let mut days = Vec::with_capacity(7);
        for date in calendar::week_days(week_start) {
            days.push(self.daily.build(employee, date)?);
        }
        Ok(WeeklyTimesheet::from_days(
            employee.clone(),
            week_start,
            days,
        ))
    }
}

impl<S: EventStore + SummaryStore> WeeklyAggregator<S> {
    /// Computes one employee's week and persists the summary.
    ///
    /// Recomputing the same week overwrites the stored row.
    pub fn compute_and_store(
        &self,
        employee: &EmployeeId,
        week_start: NaiveDate,
    ) -> Result<WeeklySummary, EngineError> {
        let week = self.aggregate(employee, week_start)?;
        let summary = week.to_summary(Utc::now());
        self.store.upsert_summary(&summary)?;
        tracing::debug!(
            employee = %summary.employee,
            week_start = %summary.week_start,
            total_hours = summary.total_hours,
            "stored weekly summary"
        );
        Ok(summary)
    }
}

/// Rejects week starts that do not fall on a Sunday.
pub(crate) fn ensure_week_start(week_start: NaiveDate) -> Result<(), EngineError> {
    if calendar::is_week_start(week_start) {
        Ok(())
    } else {
        Err(EngineError::InvalidRange(format!(
            "week start {week_start} is not a Sunday"
        )))
    }
}
