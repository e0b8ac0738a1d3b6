//! Daemon command running the periodic scheduler until interrupted.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};

use tally_db::Database;
use tally_engine::{EngineConfig, ScheduleConfig, Scheduler};

pub fn run<W: Write>(
    writer: &mut W,
    store: Arc<Database>,
    engine: EngineConfig,
    schedule: ScheduleConfig,
) -> Result<()> {
    let hours = schedule.interval.as_secs() / 3600;
    writeln!(
        writer,
        "Computing weekly summaries every {hours} hour(s). Press Ctrl-C to stop."
    )?;
    writer.flush()?;

    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    runtime.block_on(async {
        let scheduler = Scheduler::new(store, engine, schedule)?;
        scheduler.start();
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        scheduler.stop();
        anyhow::Ok(())
    })?;

    writeln!(writer, "Stopped.")?;
    Ok(())
}
