//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use tally_core::EventKind;

/// Workforce timesheet calculator.
///
/// Turns recorded clock and break punches into daily and weekly worked-hours
/// figures and keeps one stored summary per employee per week.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage the employee directory.
    Employee {
        #[command(subcommand)]
        action: EmployeeAction,
    },

    /// Record one clock or break punch.
    Record {
        /// The kind of punch.
        kind: RecordKind,

        /// Employee the punch belongs to.
        #[arg(long)]
        employee: String,

        /// When the punch happened, as an RFC 3339 timestamp.
        #[arg(long)]
        at: DateTime<Utc>,

        /// Optional free-text note.
        #[arg(long)]
        note: Option<String>,
    },

    /// Compute and store weekly summaries for one week.
    Run {
        /// Sunday starting the week to compute. Defaults to the current week.
        #[arg(long)]
        week: Option<NaiveDate>,

        /// Compute a single employee instead of the whole directory.
        #[arg(long)]
        employee: Option<String>,
    },

    /// Run the periodic scheduler until interrupted.
    Daemon {
        /// Hours between scheduled runs, overriding the configured cadence.
        #[arg(long)]
        every_hours: Option<u64>,
    },

    /// Report stored hours for one employee.
    Report {
        /// Employee to report on.
        #[arg(long)]
        employee: String,

        /// Calendar month to roll up, as YYYY-MM.
        #[arg(long, group = "period")]
        month: Option<String>,

        /// Sunday starting the week to break down day by day.
        #[arg(long, group = "period")]
        week: Option<NaiveDate>,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show database row counts and freshness.
    Status,
}

/// Employee directory subcommands.
#[derive(Debug, Subcommand)]
pub enum EmployeeAction {
    /// Register an employee, or rename one already registered.
    Add {
        /// Employee identifier.
        id: String,

        /// Display name.
        #[arg(long)]
        name: Option<String>,
    },

    /// List registered employees.
    List,
}

/// Punch kinds accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordKind {
    ClockIn,
    ClockOut,
    BreakStart,
    BreakEnd,
}

impl From<RecordKind> for EventKind {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::ClockIn => Self::ClockIn,
            RecordKind::ClockOut => Self::ClockOut,
            RecordKind::BreakStart => Self::BreakStart,
            RecordKind::BreakEnd => Self::BreakEnd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_kinds_parse_as_kebab_case() {
        let cli = Cli::try_parse_from([
            "tally",
            "record",
            "break-start",
            "--employee",
            "emp-1",
            "--at",
            "2025-03-03T12:00:00Z",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Record { kind, .. }) => assert_eq!(kind, RecordKind::BreakStart),
            other => panic!("expected a record command, got {other:?}"),
        }
    }

    #[test]
    fn report_refuses_month_and_week_together() {
        let result = Cli::try_parse_from([
            "tally", "report", "--employee", "emp-1", "--month", "2025-03", "--week", "2025-03-02",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn run_parses_week_as_a_date() {
        let cli = Cli::try_parse_from(["tally", "run", "--week", "2025-03-02"]).unwrap();
        match cli.command {
            Some(Commands::Run { week, employee }) => {
                assert_eq!(week, NaiveDate::from_ymd_opt(2025, 3, 2));
                assert!(employee.is_none());
            }
            other => panic!("expected a run command, got {other:?}"),
        }
    }
}
