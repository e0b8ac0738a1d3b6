//! Daily worked-hours calculation.
//!
//! Turns one employee's clock events for one calendar day into total,
//! regular, and overtime hours.
//!
//! # Algorithm Summary
//!
//! 1. Sort events ascending by timestamp, breaking ties by kind precedence
//! 2. Walk the sequence with two pieces of state: the currently open
//!    clock-in (if any) and whether the employee is on break
//! 3. Accumulate closed working spans in milliseconds; an open span at end
//!    of day earns no credit
//! 4. Split the total at the daily regular-hours limit and round each
//!    figure to two decimals

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::event::{EventKind, TimeEvent};
use crate::types::EmployeeId;

/// Daily regular-hours limit in milliseconds. Work beyond this is overtime.
///
/// A fixed policy constant, not configurable per employee.
pub const DAILY_REGULAR_LIMIT_MS: i64 = 8 * 60 * 60 * 1000;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Computed hours for a single employee-day.
///
/// Derived and ephemeral: regenerated on every calculation, never stored.
/// Only its weekly fold is persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTimesheet {
    /// The employee the day belongs to.
    pub employee: EmployeeId,
    /// The calendar day in the reference timezone.
    pub date: NaiveDate,
    /// All worked hours, rounded to two decimals.
    pub total_hours: f64,
    /// Worked hours up to the daily limit.
    pub regular_hours: f64,
    /// Worked hours beyond the daily limit.
    pub overtime_hours: f64,
    /// The contributing events in applied order, kept for audit display.
    pub events: Vec<TimeEvent>,
}

/// Rounds an hour figure to two decimal places, half away from zero.
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

#[expect(
    clippy::cast_precision_loss,
    reason = "worked milliseconds per day are far below 2^52"
)]
fn ms_to_hours(ms: i64) -> f64 {
    ms as f64 / MS_PER_HOUR
}

/// Computes worked hours for one employee-day from its clock events.
///
/// The input may arrive in any order; it is sorted here regardless of what
/// the event store returned. Events that do not match the expected state
/// (a `BreakEnd` with no break open, a `ClockOut` while on break) are
/// ignored for totals and logged at debug level. A day that ends with an
/// unclosed `ClockIn` earns nothing for the open interval.
pub fn compute_daily(
    employee: EmployeeId,
    date: NaiveDate,
    mut events: Vec<TimeEvent>,
) -> DailyTimesheet {
    events.sort_by_key(|event| (event.timestamp, event.kind.precedence()));

    let mut worked_ms: i64 = 0;
    let mut open_clock_in: Option<DateTime<Utc>> = None;
    let mut on_break = false;

    for event in &events {
        match event.kind {
            EventKind::ClockIn => {
                if open_clock_in.is_some() && !on_break {
                    tracing::debug!(
                        employee = %employee,
                        event = %event.id,
                        "clock_in while a span was open, restarting the span"
                    );
                }
                open_clock_in = Some(event.timestamp);
                on_break = false;
            }
            EventKind::BreakStart => match open_clock_in {
                Some(open) if !on_break => {
                    worked_ms += (event.timestamp - open).num_milliseconds();
                    on_break = true;
                }
                _ => tracing::debug!(
                    employee = %employee,
                    event = %event.id,
                    "ignoring break_start outside an open working span"
                ),
            },
            EventKind::BreakEnd => {
                if on_break {
                    open_clock_in = Some(event.timestamp);
                    on_break = false;
                } else {
                    tracing::debug!(
                        employee = %employee,
                        event = %event.id,
                        "ignoring break_end with no break open"
                    );
                }
            }
            EventKind::ClockOut => match open_clock_in {
                Some(open) if !on_break => {
                    worked_ms += (event.timestamp - open).num_milliseconds();
                    open_clock_in = None;
                }
                _ => tracing::debug!(
                    employee = %employee,
                    event = %event.id,
                    "ignoring clock_out outside an open working span"
                ),
            },
        }
    }

    if open_clock_in.is_some() && !on_break {
        tracing::debug!(
            employee = %employee,
            %date,
            "day ended with an unclosed clock_in, open interval earns no credit"
        );
    }

    let regular_ms = worked_ms.min(DAILY_REGULAR_LIMIT_MS);
    let overtime_ms = (worked_ms - DAILY_REGULAR_LIMIT_MS).max(0);

    DailyTimesheet {
        employee,
        date,
        total_hours: round_hours(ms_to_hours(worked_ms)),
        regular_hours: round_hours(ms_to_hours(regular_ms)),
        overtime_hours: round_hours(ms_to_hours(overtime_ms)),
        events,
    }
}
