//! Status command for showing database counts and recent activity.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use tally_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let stats = db.stats()?;

    writeln!(writer, "Timesheet status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(writer, "Employees: {}", stats.employees)?;
    writeln!(writer, "Events: {}", stats.events)?;
    writeln!(writer, "Weekly summaries: {}", stats.summaries)?;

    match &stats.last_event_at {
        Some(timestamp) => writeln!(writer, "Last event: {timestamp}")?,
        None => writeln!(writer, "No events recorded.")?,
    }
    if let Some(timestamp) = &stats.last_computed_at {
        writeln!(writer, "Last computed: {timestamp}")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use tally_core::{EmployeeId, EventId, EventKind, TimeEvent, WeeklySummary, calendar};

    use super::*;

    #[test]
    fn status_reports_counts_and_the_latest_event() {
        let db = Database::open_in_memory().unwrap();
        db.insert_events(&[TimeEvent {
            id: EventId::new("in-1").unwrap(),
            employee: EmployeeId::new("ana").unwrap(),
            kind: EventKind::ClockIn,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
            note: None,
        }])
        .unwrap();

        let week_start = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        db.upsert_weekly_summary(&WeeklySummary {
            employee: EmployeeId::new("ana").unwrap(),
            week_start,
            week_end: calendar::week_end(week_start),
            total_hours: 8.00,
            regular_hours: 8.00,
            overtime_hours: 0.00,
            computed_at: Utc::now(),
        })
        .unwrap();

        let mut out = Vec::new();
        run(&mut out, &db, Path::new("/tmp/tally.db")).unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("Database: /tmp/tally.db"), "{output}");
        assert!(output.contains("Employees: 1"), "{output}");
        assert!(output.contains("Events: 1"), "{output}");
        assert!(output.contains("Weekly summaries: 1"), "{output}");
        assert!(output.contains("Last event: 2025-03-03"), "{output}");
        assert!(output.contains("Last computed: "), "{output}");
    }

    #[test]
    fn an_empty_database_reports_no_events() {
        let db = Database::open_in_memory().unwrap();

        let mut out = Vec::new();
        run(&mut out, &db, Path::new("/tmp/tally.db")).unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("Employees: 0"), "{output}");
        assert!(output.contains("No events recorded."), "{output}");
    }
}
