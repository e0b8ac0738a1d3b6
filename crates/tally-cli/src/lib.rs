//! Timesheet calculator CLI library.
//!
//! This crate provides the command-line interface for the timesheet engine.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, EmployeeAction, RecordKind};
pub use config::Config;
