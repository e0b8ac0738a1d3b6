use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

/// Tuning for the calculation engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Reference timezone offset used for day and week boundaries.
    pub utc_offset: FixedOffset,
    /// Number of batch worker threads.
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            workers: 4,
        }
    }
}

/// Tuning for the periodic scheduler.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    /// How often the periodic batch fires.
    pub interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}
