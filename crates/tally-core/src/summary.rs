//! Weekly and monthly aggregates over daily timesheets.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::daily::{DailyTimesheet, round_hours};
use crate::types::EmployeeId;

/// One employee's week, derived from seven daily timesheets.
///
/// Each aggregate field is the sum of the corresponding daily field,
/// rounded independently. Weekly regular hours are deliberately not
/// re-capped: overtime exists only where an individual day exceeded the
/// daily limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTimesheet {
    /// The employee the week belongs to.
    pub employee: EmployeeId,
    /// The Sunday the week starts on (inclusive).
    pub week_start: NaiveDate,
    /// The Saturday the week ends on (inclusive).
    pub week_end: NaiveDate,
    /// The seven days that produced the aggregates, Sunday first.
    pub days: Vec<DailyTimesheet>,
    /// Sum of daily total hours.
    pub total_hours: f64,
    /// Sum of daily regular hours.
    pub regular_hours: f64,
    /// Sum of daily overtime hours.
    pub overtime_hours: f64,
}

impl WeeklyTimesheet {
    /// Folds daily timesheets into a week.
    pub fn from_days(employee: EmployeeId, week_start: NaiveDate, days: Vec<DailyTimesheet>) -> Self {
        let total_hours = round_hours(days.iter().map(|day| day.total_hours).sum());
        let regular_hours = round_hours(days.iter().map(|day| day.regular_hours).sum());
        let overtime_hours = round_hours(days.iter().map(|day| day.overtime_hours).sum());
        Self {
            employee,
            week_start,
            week_end: calendar::week_end(week_start),
            days,
            total_hours,
            regular_hours,
            overtime_hours,
        }
    }

    /// The persistable projection of this week.
    pub fn to_summary(&self, computed_at: DateTime<Utc>) -> WeeklySummary {
        WeeklySummary {
            employee: self.employee.clone(),
            week_start: self.week_start,
            week_end: self.week_end,
            total_hours: self.total_hours,
            regular_hours: self.regular_hours,
            overtime_hours: self.overtime_hours,
            computed_at,
        }
    }
}

/// The sole persisted derived entity: one employee's one week.
///
/// Uniquely keyed by `(employee, week_start)`. Recomputation overwrites the
/// existing row; nothing in this core ever deletes one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    /// The employee the summary belongs to.
    pub employee: EmployeeId,
    /// The Sunday the week starts on (inclusive).
    pub week_start: NaiveDate,
    /// The Saturday the week ends on (inclusive).
    pub week_end: NaiveDate,
    /// Sum of daily total hours.
    pub total_hours: f64,
    /// Sum of daily regular hours.
    pub regular_hours: f64,
    /// Sum of daily overtime hours.
    pub overtime_hours: f64,
    /// When this row was last computed, refreshed on every upsert.
    pub computed_at: DateTime<Utc>,
}

/// A month of stored weekly summaries, computed on read and never persisted.
///
/// A week belongs to the month containing its `week_start`; weeks with no
/// stored summary contribute zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRollup {
    /// The employee the rollup belongs to.
    pub employee: EmployeeId,
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
    /// Sum of weekly total hours.
    pub total_hours: f64,
    /// Sum of weekly regular hours.
    pub regular_hours: f64,
    /// Sum of weekly overtime hours.
    pub overtime_hours: f64,
    /// The contributing summaries, ordered by week start.
    pub weeks: Vec<WeeklySummary>,
}

impl MonthlyRollup {
    /// Folds stored weekly summaries into a month.
    pub fn from_weeks(
        employee: EmployeeId,
        year: i32,
        month: u32,
        weeks: Vec<WeeklySummary>,
    ) -> Self {
        let total_hours = round_hours(weeks.iter().map(|week| week.total_hours).sum());
        let regular_hours = round_hours(weeks.iter().map(|week| week.regular_hours).sum());
        let overtime_hours = round_hours(weeks.iter().map(|week| week.overtime_hours).sum());
        Self {
            employee,
            year,
            month,
            total_hours,
            regular_hours,
            overtime_hours,
            weeks,
        }
    }
}
