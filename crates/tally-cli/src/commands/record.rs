//! Record command for appending punch events.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use tally_core::{EmployeeId, EventId, TimeEvent};
use tally_db::Database;

use crate::cli::RecordKind;

/// Appends one punch event, minting a fresh event ID.
///
/// The employee is registered in the directory as a side effect, so punches
/// can arrive before `employee add`.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    kind: RecordKind,
    employee: &str,
    at: DateTime<Utc>,
    note: Option<String>,
) -> Result<()> {
    let employee = EmployeeId::new(employee).context("invalid employee id")?;
    let id =
        EventId::new(Uuid::new_v4().to_string()).context("generated event id was rejected")?;
    let event = TimeEvent {
        id,
        employee: employee.clone(),
        kind: kind.into(),
        timestamp: at,
        note,
    };

    db.insert_events(std::slice::from_ref(&event))?;
    tracing::debug!(event = %event.id, employee = %employee, "event stored");

    writeln!(
        writer,
        "Recorded {} for {} at {}",
        event.kind,
        employee,
        at.to_rfc3339()
    )?;
    Ok(())
}
