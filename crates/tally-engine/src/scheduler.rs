//! Periodic and on-demand batch scheduling.
//!
//! The scheduler owns two entry points into the batch machinery. A background
//! loop recomputes the previous completed week at a fixed interval, and
//! [`Scheduler::trigger`] runs an ad-hoc recomputation, optionally scoped to
//! one employee. Runs targeting the same week are serialized through a
//! per-week gate; a scheduled pass that finds its gate taken skips instead of
//! queueing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate};
use tokio::sync::Mutex as AsyncMutex;

use tally_core::{
    EmployeeDirectory, EmployeeId, EventStore, SummaryStore, WeeklySummary, calendar,
};

use crate::aggregator::{WeeklyAggregator, ensure_week_start};
use crate::batch::{BatchOutcome, BatchProcessor};
use crate::config::{EngineConfig, ScheduleConfig};
use crate::error::EngineError;

/// Parameters for an on-demand run.
#[derive(Debug, Clone, Default)]
pub struct TriggerRequest {
    /// Sunday of the week to compute. Defaults to the current week.
    pub week_start: Option<NaiveDate>,
    /// Restricts the run to one employee instead of the whole directory.
    pub employee: Option<EmployeeId>,
    /// How long to wait for the run. Without a timeout the call waits for
    /// completion.
    pub timeout: Option<Duration>,
}

/// What an on-demand run produced.
#[derive(Debug, Clone)]
pub enum TriggerResult {
    /// Directory-wide run that finished within the time limit.
    Week(BatchOutcome),
    /// Single-employee run that finished within the time limit.
    Employee(WeeklySummary),
    /// The run is still executing in the background; its summaries land in
    /// the store when it completes.
    TimedOut { week_start: NaiveDate },
}

/// Drives periodic and on-demand weekly batch runs.
pub struct Scheduler<S> {
    batch: Arc<BatchProcessor<S>>,
    aggregator: WeeklyAggregator<S>,
    utc_offset: FixedOffset,
    schedule: ScheduleConfig,
    running: Arc<AtomicBool>,
    week_gates: Arc<Mutex<HashMap<NaiveDate, Arc<AsyncMutex<()>>>>>,
}

impl<S> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            batch: Arc::clone(&self.batch),
            aggregator: self.aggregator.clone(),
            utc_offset: self.utc_offset,
            schedule: self.schedule,
            running: Arc::clone(&self.running),
            week_gates: Arc::clone(&self.week_gates),
        }
    }
}

impl<S> Scheduler<S>
where
    S: EventStore + EmployeeDirectory + SummaryStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        config: EngineConfig,
        schedule: ScheduleConfig,
    ) -> Result<Self, EngineError> {
        let batch = Arc::new(BatchProcessor::new(Arc::clone(&store), config)?);
        let aggregator = WeeklyAggregator::new(store, config.utc_offset);
        Ok(Self {
            batch,
            aggregator,
            utc_offset: config.utc_offset,
            schedule,
            running: Arc::new(AtomicBool::new(false)),
            week_gates: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Starts the periodic loop on the current tokio runtime.
    ///
    /// The first pass runs immediately; later passes follow the configured
    /// interval. Calling `start` on a scheduler that is already running is a
    /// no-op.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("scheduler already running");
            return;
        }
        tracing::info!(
            interval_secs = self.schedule.interval.as_secs(),
            "scheduler started"
        );
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.schedule.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !scheduler.running.load(Ordering::SeqCst) {
                    break;
                }
                scheduler.scheduled_pass().await;
            }
            tracing::debug!("scheduler loop exited");
        });
    }

    /// Signals the periodic loop to exit at its next tick. A pass already in
    /// flight runs to completion.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("scheduler stopping");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One iteration of the periodic loop: recompute the most recent fully
    /// completed week for the whole directory, unless a run for that week is
    /// already in flight.
    async fn scheduled_pass(&self) {
        let week_start = calendar::previous_week_start(calendar::today_in(self.utc_offset));
        let gate = self.gate_for(week_start);
        let Ok(guard) = gate.try_lock_owned() else {
            tracing::warn!(
                week_start = %week_start,
                "run for this week still in flight, skipping scheduled pass"
            );
            return;
        };
        let batch = Arc::clone(&self.batch);
        let joined = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            batch.process_week(week_start)
        })
        .await;
        match joined {
            Ok(Ok(outcome)) => tracing::info!(
                week_start = %outcome.week_start,
                computed = outcome.summaries.len(),
                failed = outcome.failures.len(),
                "scheduled pass finished"
            ),
            Ok(Err(err)) => tracing::error!(
                week_start = %week_start,
                error = %err,
                "scheduled pass failed"
            ),
            Err(err) => tracing::error!(
                week_start = %week_start,
                error = %err,
                "scheduled pass panicked"
            ),
        }
    }

    /// Runs an on-demand recomputation.
    ///
    /// Waits for any in-flight run of the same week before starting. Without
    /// a timeout the call waits for completion; with one, a run that exceeds
    /// it keeps executing in the background and is reported as
    /// [`TriggerResult::TimedOut`].
    pub async fn trigger(&self, request: TriggerRequest) -> Result<TriggerResult, EngineError> {
        let week_start = request
            .week_start
            .unwrap_or_else(|| calendar::week_start_for(calendar::today_in(self.utc_offset)));
        ensure_week_start(week_start)?;

        let gate = self.gate_for(week_start);
        let mut handle = match request.employee {
            Some(employee) => {
                tracing::info!(week_start = %week_start, employee = %employee, "manual run accepted");
                let aggregator = self.aggregator.clone();
                tokio::spawn(run_gated(gate, move || {
                    aggregator
                        .compute_and_store(&employee, week_start)
                        .map(TriggerResult::Employee)
                }))
            }
            None => {
                tracing::info!(week_start = %week_start, "manual run accepted");
                let batch = Arc::clone(&self.batch);
                tokio::spawn(run_gated(gate, move || {
                    batch.process_week(week_start).map(TriggerResult::Week)
                }))
            }
        };

        let Some(limit) = request.timeout else {
            return handle.await?;
        };
        match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined?,
            Err(_elapsed) => {
                tracing::warn!(
                    week_start = %week_start,
                    timeout = ?limit,
                    "manual run exceeded its time limit, finishing in the background"
                );
                tokio::spawn(async move {
                    match handle.await {
                        Ok(Ok(_)) => tracing::info!(
                            week_start = %week_start,
                            "background run finished"
                        ),
                        Ok(Err(err)) => tracing::error!(
                            week_start = %week_start,
                            error = %err,
                            "background run failed"
                        ),
                        Err(err) => tracing::error!(
                            week_start = %week_start,
                            error = %err,
                            "background run panicked"
                        ),
                    }
                });
                Ok(TriggerResult::TimedOut { week_start })
            }
        }
    }

    /// The serialization gate for one week, created on first use.
    fn gate_for(&self, week_start: NaiveDate) -> Arc<AsyncMutex<()>> {
        let mut gates = match self.week_gates.lock() {
            Ok(gates) => gates,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(gates.entry(week_start).or_default())
    }
}

/// Holds the week gate while the job runs on the blocking pool.
async fn run_gated<T, F>(gate: Arc<AsyncMutex<()>>, job: F) -> Result<T, EngineError>
where
    F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    T: Send + 'static,
{
    let _guard = gate.lock_owned().await;
    tokio::task::spawn_blocking(job).await?
}

#[cfg(test)]
mod tests {
    #![expect(
        clippy::float_cmp,
        reason = "exact equality intended for rounded hour figures"
    )]

    use chrono::{Offset, TimeZone, Utc};

    use tally_core::{EventId, EventKind, StoreError, TimeEvent};

    use super::*;
    use crate::memstore::MemoryStore;

    fn emp(name: &str) -> EmployeeId {
        EmployeeId::new(name).unwrap()
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn shift(store: &MemoryStore, employee: &EmployeeId, day: u32, start_hour: u32, end_hour: u32) {
        let clock_in = Utc.with_ymd_and_hms(2025, 3, day, start_hour, 0, 0).unwrap();
        let clock_out = Utc.with_ymd_and_hms(2025, 3, day, end_hour, 0, 0).unwrap();
        store.push_events(vec![
            TimeEvent {
                id: EventId::new(format!("{employee}-in-{day}")).unwrap(),
                employee: employee.clone(),
                kind: EventKind::ClockIn,
                timestamp: clock_in,
                note: None,
            },
            TimeEvent {
                id: EventId::new(format!("{employee}-out-{day}")).unwrap(),
                employee: employee.clone(),
                kind: EventKind::ClockOut,
                timestamp: clock_out,
                note: None,
            },
        ]);
    }

    fn scheduler(store: &Arc<MemoryStore>, interval: Duration) -> Scheduler<MemoryStore> {
        let config = EngineConfig {
            utc_offset: Utc.fix(),
            workers: 2,
        };
        Scheduler::new(Arc::clone(store), config, ScheduleConfig { interval }).unwrap()
    }

    async fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
        let started = tokio::time::Instant::now();
        while started.elapsed() < deadline {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        check()
    }

    #[tokio::test]
    async fn the_loop_computes_the_previous_week_on_start() {
        let store = Arc::new(MemoryStore::default());
        let ana = emp("ana");
        store.add_employee(&ana);

        let scheduler = scheduler(&store, Duration::from_secs(3600));
        scheduler.start();
        assert!(scheduler.is_running());

        let expected_week = calendar::previous_week_start(calendar::today_in(Utc.fix()));
        let stored = wait_until(Duration::from_secs(2), || {
            store.summary_for(&ana, expected_week).is_some()
        })
        .await;
        scheduler.stop();

        assert!(stored, "first pass should store the previous week");
        let summary = store.summary_for(&ana, expected_week).unwrap();
        assert_eq!(summary.week_start, expected_week);
        assert_eq!(summary.total_hours, 0.00);
    }

    #[tokio::test]
    async fn stop_halts_the_periodic_loop() {
        let store = Arc::new(MemoryStore::default());
        store.add_employee(&emp("ana"));

        let scheduler = scheduler(&store, Duration::from_millis(25));
        scheduler.start();

        let ticked = wait_until(Duration::from_secs(2), || {
            store.upsert_calls.load(Ordering::SeqCst) >= 2
        })
        .await;
        assert!(ticked, "loop should keep recomputing on its interval");

        scheduler.stop();
        assert!(!scheduler.is_running());

        // Let any in-flight pass finish, then confirm no further runs land.
        tokio::time::sleep(Duration::from_millis(150)).await;
        let settled = store.upsert_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(store.upsert_calls.load(Ordering::SeqCst), settled);
    }

    #[tokio::test]
    async fn scheduled_passes_skip_while_the_week_is_in_flight() {
        let store = Arc::new(MemoryStore::default());
        store.add_employee(&emp("ana"));
        store.set_read_delay(Duration::from_millis(150));

        let week_start = calendar::previous_week_start(calendar::today_in(Utc.fix()));
        let scheduler = scheduler(&store, Duration::from_millis(50));

        // Occupy the week's gate with a manual run before the loop starts.
        let manual = tokio::spawn({
            let scheduler = scheduler.clone();
            async move {
                scheduler
                    .trigger(TriggerRequest {
                        week_start: Some(week_start),
                        employee: None,
                        timeout: None,
                    })
                    .await
            }
        });
        let manual_started = wait_until(Duration::from_secs(2), || {
            store.directory_calls.load(Ordering::SeqCst) == 1
        })
        .await;
        assert!(manual_started);

        // Seven stalled reads keep the manual run in flight for about a
        // second while the loop ticks every 50ms.
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(
            store.directory_calls.load(Ordering::SeqCst),
            1,
            "scheduled passes should skip, not queue behind the manual run"
        );
        scheduler.stop();

        let result = manual.await.unwrap().unwrap();
        assert!(matches!(result, TriggerResult::Week(_)));
    }

    #[tokio::test]
    async fn trigger_defaults_to_the_current_week() {
        let store = Arc::new(MemoryStore::default());
        let ana = emp("ana");
        store.add_employee(&ana);

        let scheduler = scheduler(&store, Duration::from_secs(3600));
        let result = scheduler.trigger(TriggerRequest::default()).await.unwrap();

        let expected_week = calendar::week_start_for(calendar::today_in(Utc.fix()));
        match result {
            TriggerResult::Week(outcome) => {
                assert_eq!(outcome.week_start, expected_week);
                assert_eq!(outcome.summaries.len(), 1);
            }
            other => panic!("expected a week outcome, got {other:?}"),
        }
        assert!(store.summary_for(&ana, expected_week).is_some());
    }

    #[tokio::test]
    async fn trigger_for_one_employee_returns_the_summary() {
        let store = Arc::new(MemoryStore::default());
        let ana = emp("ana");
        shift(&store, &ana, 3, 9, 17);
        store.add_employee(&emp("ben"));

        let scheduler = scheduler(&store, Duration::from_secs(3600));
        let result = scheduler
            .trigger(TriggerRequest {
                week_start: Some(date(2025, 3, 2)),
                employee: Some(ana.clone()),
                timeout: None,
            })
            .await
            .unwrap();

        match result {
            TriggerResult::Employee(summary) => {
                assert_eq!(summary.employee, ana);
                assert_eq!(summary.total_hours, 8.00);
            }
            other => panic!("expected an employee summary, got {other:?}"),
        }
        // A single-employee run never touches the directory.
        assert_eq!(store.directory_calls.load(Ordering::SeqCst), 0);
        assert!(store.summary_for(&emp("ben"), date(2025, 3, 2)).is_none());
    }

    #[tokio::test]
    async fn trigger_propagates_single_employee_failures() {
        let store = Arc::new(MemoryStore::default());
        let ana = emp("ana");
        store.poison(&ana);

        let scheduler = scheduler(&store, Duration::from_secs(3600));
        let result = scheduler
            .trigger(TriggerRequest {
                week_start: Some(date(2025, 3, 2)),
                employee: Some(ana),
                timeout: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(EngineError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn trigger_rejects_week_starts_that_are_not_sundays() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = scheduler(&store, Duration::from_secs(3600));

        let result = scheduler
            .trigger(TriggerRequest {
                week_start: Some(date(2025, 3, 4)),
                employee: None,
                timeout: None,
            })
            .await;

        assert!(matches!(result, Err(EngineError::InvalidRange(_))));
        assert_eq!(store.directory_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn a_slow_trigger_times_out_and_finishes_in_the_background() {
        let store = Arc::new(MemoryStore::default());
        let ana = emp("ana");
        store.add_employee(&ana);
        store.set_read_delay(Duration::from_millis(100));

        let week_start = date(2025, 3, 2);
        let scheduler = scheduler(&store, Duration::from_secs(3600));
        let result = scheduler
            .trigger(TriggerRequest {
                week_start: Some(week_start),
                employee: Some(ana.clone()),
                timeout: Some(Duration::from_millis(50)),
            })
            .await
            .unwrap();

        match result {
            TriggerResult::TimedOut { week_start: week } => assert_eq!(week, week_start),
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert!(
            store.summary_for(&ana, week_start).is_none(),
            "the run should still be executing when the trigger returns"
        );

        let finished = wait_until(Duration::from_secs(5), || {
            store.summary_for(&ana, week_start).is_some()
        })
        .await;
        assert!(finished, "the background run should still store its result");
    }
}
