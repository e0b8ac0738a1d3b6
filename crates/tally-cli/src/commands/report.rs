//! Report command for monthly rollups and weekly breakdowns.
//!
//! `--month` folds the stored weekly summaries for a calendar month;
//! `--week` recomputes one week from events and shows the per-day split.
//! Both render as text or, with `--json`, as serialized structures.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use tally_core::{EmployeeId, MonthlyRollup, WeeklyTimesheet};
use tally_db::Database;
use tally_engine::{EngineConfig, WeeklyAggregator, monthly_rollup};

pub fn run<W: Write>(
    writer: &mut W,
    store: Arc<Database>,
    engine: EngineConfig,
    employee: &str,
    month: Option<&str>,
    week: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let employee = EmployeeId::new(employee).context("invalid employee id")?;

    match (month, week) {
        (Some(month), None) => {
            let (year, month) = parse_month(month)?;
            let rollup = monthly_rollup(store.as_ref(), &employee, year, month)?;
            if json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&rollup)?)?;
            } else {
                write_monthly(writer, &rollup)?;
            }
        }
        (None, Some(week_start)) => {
            let aggregator = WeeklyAggregator::new(store, engine.utc_offset);
            let timesheet = aggregator.aggregate(&employee, week_start)?;
            if json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&timesheet)?)?;
            } else {
                write_weekly(writer, &timesheet)?;
            }
        }
        _ => bail!("exactly one of --month or --week is required"),
    }
    Ok(())
}

/// Splits `YYYY-MM` into year and month numbers.
fn parse_month(value: &str) -> Result<(i32, u32)> {
    let (year, month) = value
        .split_once('-')
        .with_context(|| format!("invalid month {value:?}, expected YYYY-MM"))?;
    let year = year
        .parse()
        .with_context(|| format!("invalid year in {value:?}"))?;
    let month = month
        .parse()
        .with_context(|| format!("invalid month in {value:?}"))?;
    Ok((year, month))
}

fn write_monthly<W: Write>(writer: &mut W, rollup: &MonthlyRollup) -> Result<()> {
    writeln!(
        writer,
        "MONTHLY HOURS: {} {:04}-{:02}",
        rollup.employee, rollup.year, rollup.month
    )?;
    if rollup.weeks.is_empty() {
        writeln!(writer, "No computed weeks in this month.")?;
        return Ok(());
    }

    writeln!(writer)?;
    for week in &rollup.weeks {
        writeln!(
            writer,
            "  week of {}  total {:>6.2}  regular {:>6.2}  overtime {:>6.2}",
            week.week_start, week.total_hours, week.regular_hours, week.overtime_hours
        )?;
    }
    writeln!(writer)?;
    writeln!(
        writer,
        "  month total {:.2}h ({:.2} regular, {:.2} overtime)",
        rollup.total_hours, rollup.regular_hours, rollup.overtime_hours
    )?;
    Ok(())
}

fn write_weekly<W: Write>(writer: &mut W, timesheet: &WeeklyTimesheet) -> Result<()> {
    writeln!(
        writer,
        "WEEKLY HOURS: {} week of {} through {}",
        timesheet.employee, timesheet.week_start, timesheet.week_end
    )?;
    writeln!(writer)?;
    for day in &timesheet.days {
        writeln!(
            writer,
            "  {}  total {:>6.2}  regular {:>6.2}  overtime {:>6.2}  ({} events)",
            day.date,
            day.total_hours,
            day.regular_hours,
            day.overtime_hours,
            day.events.len()
        )?;
    }
    writeln!(writer)?;
    writeln!(
        writer,
        "  week total {:.2}h ({:.2} regular, {:.2} overtime)",
        timesheet.total_hours, timesheet.regular_hours, timesheet.overtime_hours
    )?;
    Ok(())
}
