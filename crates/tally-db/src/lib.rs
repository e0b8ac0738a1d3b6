//! Storage layer for the timesheet calculator.
//!
//! Provides persistence for punch events and weekly summaries using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps its `rusqlite::Connection` in a `Mutex`, so one
//! instance can be shared across threads (e.g., behind an `Arc`) by the batch
//! workers. Every statement runs under the lock; a summary upsert is therefore
//! atomic per `(employee_id, week_start)` key, which is the only cross-worker
//! guarantee callers get.
//!
//! # Schema
//!
//! ## Timestamp and Date Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format (e.g.,
//! `2025-03-04T09:00:00.000Z`) and dates as ISO `YYYY-MM-DD` strings. Both
//! formats order lexicographically in chronological order, so range predicates
//! run directly against the TEXT columns.
//!
//! ## Derived Rows
//!
//! The `weekly_summaries` table is the only place derived hours are persisted,
//! keyed by `(employee_id, week_start)`. Recomputation overwrites rows in
//! place; nothing here deletes them.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use thiserror::Error;

use tally_core::{
    EmployeeDirectory, EmployeeId, EventId, EventKind, EventStore, StoreError, SummaryStore,
    TimeEvent, WeeklySummary,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The connection lock was poisoned by a panicking thread.
    #[error("database lock poisoned")]
    Poisoned,
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for row {row_id}: {timestamp}")]
    TimestampParse {
        row_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// Failed to parse a stored date.
    #[error("invalid date for row {row_id}: {date}")]
    DateParse {
        row_id: String,
        date: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row holds a value the domain types reject.
    #[error("invalid stored value for row {row_id}: {message}")]
    InvalidRow { row_id: String, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Mutex<Connection>,
}

/// Employee metadata stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeRecord {
    pub id: String,
    pub name: Option<String>,
    pub created_at: String,
}

/// Row counts and freshness for a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStats {
    pub employees: i64,
    pub events: i64,
    pub summaries: i64,
    pub last_event_at: Option<String>,
    pub last_computed_at: Option<String>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        tracing::debug!(path = %path.display(), "opened timesheet database");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS employees (
                id TEXT PRIMARY KEY,
                name TEXT,
                created_at TEXT NOT NULL
            );

            -- Punch table: stores raw clock and break events
            -- timestamp: RFC 3339 format (e.g., '2025-03-04T09:00:00.000Z')
            -- kind: one of 'clock_in', 'clock_out', 'break_start', 'break_end'
            CREATE TABLE IF NOT EXISTS time_events (
                id TEXT PRIMARY KEY,
                employee_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                note TEXT,
                FOREIGN KEY (employee_id) REFERENCES employees(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_time_events_employee_time
                ON time_events(employee_id, timestamp);

            -- Weekly summaries: the only derived rows that are persisted
            -- week_start/week_end: ISO dates ('2025-03-02'); week_start is always a Sunday
            CREATE TABLE IF NOT EXISTS weekly_summaries (
                employee_id TEXT NOT NULL,
                week_start TEXT NOT NULL,
                week_end TEXT NOT NULL,
                total_hours REAL NOT NULL,
                regular_hours REAL NOT NULL,
                overtime_hours REAL NOT NULL,
                computed_at TEXT NOT NULL,
                PRIMARY KEY (employee_id, week_start)
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of events, ignoring duplicates by ID.
    ///
    /// Employees referenced by the events are registered on first sight so the
    /// directory always covers everyone who has punched.
    pub fn insert_events(&self, events: &[TimeEvent]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let now = format_timestamp(Utc::now());
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut employee_stmt =
                tx.prepare("INSERT OR IGNORE INTO employees (id, created_at) VALUES (?, ?)")?;
            let mut event_stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO time_events (id, employee_id, timestamp, kind, note)
                VALUES (?, ?, ?, ?, ?)
                ",
            )?;
            for event in events {
                employee_stmt.execute(params![event.employee.as_str(), now])?;
                inserted += event_stmt.execute(params![
                    event.id.as_str(),
                    event.employee.as_str(),
                    format_timestamp(event.timestamp),
                    event.kind.as_str(),
                    event.note,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Registers an employee, or updates the stored name of an existing one.
    ///
    /// A `None` name leaves any previously stored name in place.
    pub fn add_employee(&self, id: &EmployeeId, name: Option<&str>) -> Result<(), DbError> {
        let conn = self.lock()?;
        conn.execute(
            "
            INSERT INTO employees (id, name, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = COALESCE(excluded.name, employees.name)
            ",
            params![id.as_str(), name, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    /// Lists employees ordered by ID.
    pub fn list_employees(&self) -> Result<Vec<EmployeeRecord>, DbError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM employees ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(EmployeeRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        let mut employees = Vec::new();
        for row in rows {
            employees.push(row?);
        }
        Ok(employees)
    }

    /// Lists all employee IDs ordered ascending.
    pub fn employee_ids(&self) -> Result<Vec<EmployeeId>, DbError> {
        let employees = self.list_employees()?;
        let mut ids = Vec::with_capacity(employees.len());
        for employee in employees {
            ids.push(
                EmployeeId::new(employee.id.clone()).map_err(|err| DbError::InvalidRow {
                    row_id: employee.id,
                    message: err.to_string(),
                })?,
            );
        }
        Ok(ids)
    }

    /// Lists one employee's events within a time range.
    ///
    /// The range is inclusive of `start` and exclusive of `end`.
    pub fn events_in_range(
        &self,
        employee: &EmployeeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeEvent>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "
            SELECT id, employee_id, timestamp, kind, note
            FROM time_events
            WHERE employee_id = ? AND timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                employee.as_str(),
                format_timestamp(start),
                format_timestamp(end)
            ],
            |row| {
                Ok(EventRow {
                    id: row.get(0)?,
                    employee_id: row.get(1)?,
                    timestamp: row.get(2)?,
                    kind: row.get(3)?,
                    note: row.get(4)?,
                })
            },
        )?;
        let mut events = Vec::new();
        for row in rows {
            events.push(decode_event(row?)?);
        }
        Ok(events)
    }

    /// Inserts a weekly summary, or overwrites the row with the same
    /// `(employee_id, week_start)` key.
    pub fn upsert_weekly_summary(&self, summary: &WeeklySummary) -> Result<(), DbError> {
        let conn = self.lock()?;
        conn.execute(
            "
            INSERT INTO weekly_summaries
            (employee_id, week_start, week_end, total_hours, regular_hours, overtime_hours, computed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(employee_id, week_start) DO UPDATE SET
                week_end = excluded.week_end,
                total_hours = excluded.total_hours,
                regular_hours = excluded.regular_hours,
                overtime_hours = excluded.overtime_hours,
                computed_at = excluded.computed_at
            ",
            params![
                summary.employee.as_str(),
                format_date(summary.week_start),
                format_date(summary.week_end),
                summary.total_hours,
                summary.regular_hours,
                summary.overtime_hours,
                format_timestamp(summary.computed_at),
            ],
        )?;
        Ok(())
    }

    /// Lists one employee's summaries with a week start inside the range.
    ///
    /// Both bounds are inclusive.
    pub fn summaries_in_range(
        &self,
        employee: &EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeeklySummary>, DbError> {
        if end < start {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "
            SELECT employee_id, week_start, week_end, total_hours, regular_hours, overtime_hours, computed_at
            FROM weekly_summaries
            WHERE employee_id = ? AND week_start >= ? AND week_start <= ?
            ORDER BY week_start ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![employee.as_str(), format_date(start), format_date(end)],
            |row| {
                Ok(SummaryRow {
                    employee_id: row.get(0)?,
                    week_start: row.get(1)?,
                    week_end: row.get(2)?,
                    total_hours: row.get(3)?,
                    regular_hours: row.get(4)?,
                    overtime_hours: row.get(5)?,
                    computed_at: row.get(6)?,
                })
            },
        )?;
        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(decode_summary(row?)?);
        }
        Ok(summaries)
    }

    /// Returns row counts and the most recent event and computation times.
    pub fn stats(&self) -> Result<DbStats, DbError> {
        let conn = self.lock()?;
        let employees =
            conn.query_row("SELECT COUNT(*) FROM employees", [], |row| {
                row.get::<_, i64>(0)
            })?;
        let events = conn.query_row("SELECT COUNT(*) FROM time_events", [], |row| {
            row.get::<_, i64>(0)
        })?;
        let summaries = conn.query_row("SELECT COUNT(*) FROM weekly_summaries", [], |row| {
            row.get::<_, i64>(0)
        })?;
        let last_event_at = conn.query_row("SELECT MAX(timestamp) FROM time_events", [], |row| {
            row.get::<_, Option<String>>(0)
        })?;
        let last_computed_at =
            conn.query_row("SELECT MAX(computed_at) FROM weekly_summaries", [], |row| {
                row.get::<_, Option<String>>(0)
            })?;
        Ok(DbStats {
            employees,
            events,
            summaries,
            last_event_at,
            last_computed_at,
        })
    }
}

#[derive(Debug)]
struct EventRow {
    id: String,
    employee_id: String,
    timestamp: String,
    kind: String,
    note: Option<String>,
}

#[derive(Debug)]
struct SummaryRow {
    employee_id: String,
    week_start: String,
    week_end: String,
    total_hours: f64,
    regular_hours: f64,
    overtime_hours: f64,
    computed_at: String,
}

fn decode_event(row: EventRow) -> Result<TimeEvent, DbError> {
    let timestamp = parse_timestamp(&row.timestamp, &row.id)?;
    let kind = row
        .kind
        .parse::<EventKind>()
        .map_err(|err| DbError::InvalidRow {
            row_id: row.id.clone(),
            message: err.to_string(),
        })?;
    let employee = EmployeeId::new(row.employee_id).map_err(|err| DbError::InvalidRow {
        row_id: row.id.clone(),
        message: err.to_string(),
    })?;
    let id = EventId::new(row.id.clone()).map_err(|err| DbError::InvalidRow {
        row_id: row.id,
        message: err.to_string(),
    })?;
    Ok(TimeEvent {
        id,
        employee,
        kind,
        timestamp,
        note: row.note,
    })
}

fn decode_summary(row: SummaryRow) -> Result<WeeklySummary, DbError> {
    let week_start = parse_date(&row.week_start, &row.employee_id)?;
    let week_end = parse_date(&row.week_end, &row.employee_id)?;
    let computed_at = parse_timestamp(&row.computed_at, &row.employee_id)?;
    let employee = EmployeeId::new(row.employee_id.clone()).map_err(|err| DbError::InvalidRow {
        row_id: row.employee_id,
        message: err.to_string(),
    })?;
    Ok(WeeklySummary {
        employee,
        week_start,
        week_end,
        total_hours: row.total_hours,
        regular_hours: row.regular_hours,
        overtime_hours: row.overtime_hours,
        computed_at,
    })
}

fn parse_timestamp(timestamp: &str, row_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            row_id: row_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_date(date: &str, row_id: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|source| DbError::DateParse {
        row_id: row_id.to_string(),
        date: date.to_string(),
        source,
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlite(_) | DbError::Poisoned => Self::Unavailable(err.to_string()),
            DbError::TimestampParse { .. }
            | DbError::DateParse { .. }
            | DbError::InvalidRow { .. } => Self::InvalidData(err.to_string()),
        }
    }
}

impl EventStore for Database {
    fn list_events(
        &self,
        employee: &EmployeeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeEvent>, StoreError> {
        Ok(self.events_in_range(employee, start, end)?)
    }
}

impl EmployeeDirectory for Database {
    fn list_employee_ids(&self) -> Result<Vec<EmployeeId>, StoreError> {
        Ok(self.employee_ids()?)
    }
}

impl SummaryStore for Database {
    fn upsert_summary(&self, summary: &WeeklySummary) -> Result<(), StoreError> {
        Ok(self.upsert_weekly_summary(summary)?)
    }

    fn list_summaries(
        &self,
        employee: &EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeeklySummary>, StoreError> {
        Ok(self.summaries_in_range(employee, start, end)?)
    }
}
