//! Monthly rollups computed from stored weekly summaries.

use tally_core::{EmployeeId, MonthlyRollup, SummaryStore, calendar};

use crate::error::EngineError;

/// Rolls the stored weekly summaries whose week start falls inside the given
/// calendar month into a [`MonthlyRollup`].
///
/// A week belongs to the month containing its start date, so a week spanning
/// a month boundary counts once, toward the earlier month. Weeks that were
/// never computed contribute nothing; the rollup itself is never persisted.
pub fn monthly_rollup<S: SummaryStore>(
    store: &S,
    employee: &EmployeeId,
    year: i32,
    month: u32,
) -> Result<MonthlyRollup, EngineError> {
    let (first, last) = calendar::month_bounds(year, month).ok_or_else(|| {
        EngineError::InvalidRange(format!("{year}-{month:02} is not a calendar month"))
    })?;
    let weeks = store.list_summaries(employee, first, last)?;
    Ok(MonthlyRollup::from_weeks(
        employee.clone(),
        year,
        month,
        weeks,
    ))
}

#[cfg(test)]
mod tests {
    #![expect(
        clippy::float_cmp,
        reason = "exact equality intended for rounded hour figures"
    )]

    use chrono::{NaiveDate, Utc};

    use tally_core::{WeeklySummary, calendar};

    use super::*;
    use crate::memstore::MemoryStore;

    fn emp(name: &str) -> EmployeeId {
        EmployeeId::new(name).unwrap()
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn summary(
        employee: &EmployeeId,
        week_start: NaiveDate,
        total: f64,
        regular: f64,
        overtime: f64,
    ) -> WeeklySummary {
        WeeklySummary {
            employee: employee.clone(),
            week_start,
            week_end: calendar::week_end(week_start),
            total_hours: total,
            regular_hours: regular,
            overtime_hours: overtime,
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn sums_weeks_whose_start_falls_in_the_month() {
        let store = MemoryStore::default();
        let ana = emp("ana");
        // Weeks starting in February and April stay out, even when they
        // overlap March.
        store.push_summary(summary(&ana, date(2025, 2, 23), 40.00, 40.00, 0.00));
        store.push_summary(summary(&ana, date(2025, 3, 2), 42.50, 40.00, 2.50));
        store.push_summary(summary(&ana, date(2025, 3, 30), 8.25, 8.25, 0.00));
        store.push_summary(summary(&ana, date(2025, 4, 6), 40.00, 40.00, 0.00));
        store.push_summary(summary(&emp("ben"), date(2025, 3, 9), 40.00, 40.00, 0.00));

        let rollup = monthly_rollup(&store, &ana, 2025, 3).unwrap();

        assert_eq!(rollup.year, 2025);
        assert_eq!(rollup.month, 3);
        assert_eq!(rollup.weeks.len(), 2);
        assert_eq!(rollup.weeks[0].week_start, date(2025, 3, 2));
        assert_eq!(rollup.weeks[1].week_start, date(2025, 3, 30));
        assert_eq!(rollup.total_hours, 50.75);
        assert_eq!(rollup.regular_hours, 48.25);
        assert_eq!(rollup.overtime_hours, 2.50);
    }

    #[test]
    fn missing_weeks_contribute_nothing() {
        let store = MemoryStore::default();
        let ana = emp("ana");
        store.push_summary(summary(&ana, date(2025, 3, 16), 12.00, 12.00, 0.00));

        let rollup = monthly_rollup(&store, &ana, 2025, 3).unwrap();

        assert_eq!(rollup.weeks.len(), 1);
        assert_eq!(rollup.total_hours, 12.00);
    }

    #[test]
    fn an_empty_month_rolls_up_to_zero() {
        let store = MemoryStore::default();

        let rollup = monthly_rollup(&store, &emp("ana"), 2025, 3).unwrap();

        assert!(rollup.weeks.is_empty());
        assert_eq!(rollup.total_hours, 0.00);
        assert_eq!(rollup.regular_hours, 0.00);
        assert_eq!(rollup.overtime_hours, 0.00);
    }

    #[test]
    fn rejects_months_outside_the_calendar() {
        let store = MemoryStore::default();

        let result = monthly_rollup(&store, &emp("ana"), 2025, 13);
        assert!(matches!(result, Err(EngineError::InvalidRange(_))));
    }
}
