//! Core domain logic for the timesheet calculator.
//!
//! This crate contains the fundamental types and logic for:
//! - Daily calculation: folding clock and break punches into worked hours
//! - Weekly aggregation: rolling seven days into a persistable summary
//! - Calendar arithmetic: day windows, Sunday-based weeks, month bounds

pub mod calendar;
mod daily;
mod event;
mod store;
mod summary;
mod types;

pub use daily::{DAILY_REGULAR_LIMIT_MS, DailyTimesheet, compute_daily, round_hours};
pub use event::{EventKind, TimeEvent, UnknownEventKind};
pub use store::{EmployeeDirectory, EventStore, StoreError, SummaryStore};
pub use summary::{MonthlyRollup, WeeklySummary, WeeklyTimesheet};
pub use types::{EmployeeId, EventId, ValidationError};
