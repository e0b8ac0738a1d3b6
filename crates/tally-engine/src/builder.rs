//! Per-day timesheet assembly.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};

use tally_core::{DailyTimesheet, EmployeeId, EventStore, calendar, compute_daily};

use crate::error::EngineError;

/// Assembles one employee's timesheet for one calendar day.
///
/// The day window runs from local midnight to the next local midnight in the
/// reference timezone; events inside that window are folded by the daily
/// calculator.
pub struct DailyTimesheetBuilder<S> {
    store: Arc<S>,
    utc_offset: FixedOffset,
}

impl<S> Clone for DailyTimesheetBuilder<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            utc_offset: self.utc_offset,
        }
    }
}

impl<S: EventStore> DailyTimesheetBuilder<S> {
    pub fn new(store: Arc<S>, utc_offset: FixedOffset) -> Self {
        Self { store, utc_offset }
    }

    /// Builds the timesheet for one day.
    ///
    /// A day with no events yields a timesheet with zero hours.
    pub fn build(
        &self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<DailyTimesheet, EngineError> {
        let (start, end) = calendar::day_window(date, self.utc_offset);
        let events = self.store.list_events(employee, start, end)?;
        Ok(compute_daily(employee.clone(), date, events))
    }
}
