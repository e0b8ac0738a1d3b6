//! Run command for on-demand weekly computation.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use tally_core::{EmployeeId, WeeklySummary, calendar};
use tally_db::Database;
use tally_engine::{BatchProcessor, EngineConfig, WeeklyAggregator};

/// Computes and stores weekly summaries for one week.
///
/// Without `--week` the current week is computed; without `--employee` the
/// whole directory is. Waits for the computation to finish. Skipped
/// employees are reported but do not fail the command; an invalid week or a
/// single-employee failure does.
pub fn run<W: Write>(
    writer: &mut W,
    store: Arc<Database>,
    engine: EngineConfig,
    week: Option<NaiveDate>,
    employee: Option<&str>,
) -> Result<()> {
    let week_start =
        week.unwrap_or_else(|| calendar::week_start_for(calendar::today_in(engine.utc_offset)));

    match employee {
        Some(id) => {
            let employee = EmployeeId::new(id).context("invalid employee id")?;
            let aggregator = WeeklyAggregator::new(store, engine.utc_offset);
            let summary = aggregator.compute_and_store(&employee, week_start)?;
            writeln!(writer, "Computed week of {week_start} for {employee}")?;
            write_summary(writer, &summary)?;
        }
        None => {
            let batch = BatchProcessor::new(store, engine)?;
            let outcome = batch.process_week(week_start)?;
            writeln!(
                writer,
                "Computed week of {week_start} for {} employee(s)",
                outcome.summaries.len()
            )?;
            for summary in &outcome.summaries {
                write_summary(writer, summary)?;
            }
            if !outcome.failures.is_empty() {
                writeln!(writer, "Skipped {} employee(s):", outcome.failures.len())?;
                for failure in &outcome.failures {
                    writeln!(writer, "  {}: {}", failure.employee, failure.message)?;
                }
            }
        }
    }
    Ok(())
}

fn write_summary<W: Write>(writer: &mut W, summary: &WeeklySummary) -> Result<()> {
    writeln!(
        writer,
        "  {}: total {:.2}h, regular {:.2}h, overtime {:.2}h",
        summary.employee, summary.total_hours, summary.regular_hours, summary.overtime_hours
    )?;
    Ok(())
}
