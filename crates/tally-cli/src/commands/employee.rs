//! Employee directory commands.

use std::io::Write;

use anyhow::{Context, Result};

use tally_core::EmployeeId;
use tally_db::Database;

/// Registers an employee. Repeating an ID updates the name instead of
/// failing.
pub fn add<W: Write>(writer: &mut W, db: &Database, id: &str, name: Option<&str>) -> Result<()> {
    let employee = EmployeeId::new(id).context("invalid employee id")?;
    db.add_employee(&employee, name)?;
    writeln!(writer, "Registered employee {employee}")?;
    Ok(())
}

/// Lists registered employees, one per line.
pub fn list<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let employees = db.list_employees()?;
    if employees.is_empty() {
        writeln!(writer, "No employees registered.")?;
        return Ok(());
    }
    for record in employees {
        match record.name {
            Some(name) => writeln!(writer, "{}  {}", record.id, name)?,
            None => writeln!(writer, "{}", record.id)?,
        }
    }
    Ok(())
}
