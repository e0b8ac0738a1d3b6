//! CLI command implementations.

pub mod daemon;
pub mod employee;
pub mod record;
pub mod report;
pub mod run;
pub mod status;
