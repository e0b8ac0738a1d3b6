//! In-memory store used by the engine tests.
//!
//! Implements all three store traits over plain collections, with knobs for
//! simulating slow reads, per-employee outages, and a downed directory, plus
//! counters the concurrency tests read.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use tally_core::{
    EmployeeDirectory, EmployeeId, EventStore, StoreError, SummaryStore, TimeEvent, WeeklySummary,
};

#[derive(Default)]
pub struct MemoryStore {
    events: Mutex<Vec<TimeEvent>>,
    summaries: Mutex<HashMap<(EmployeeId, NaiveDate), WeeklySummary>>,
    employees: Mutex<Vec<EmployeeId>>,
    poisoned: Mutex<Vec<EmployeeId>>,
    read_delay: Mutex<Option<Duration>>,
    directory_down: AtomicBool,
    active_reads: AtomicUsize,
    /// Number of `list_employee_ids` calls observed.
    pub directory_calls: AtomicUsize,
    /// Number of `upsert_summary` calls observed.
    pub upsert_calls: AtomicUsize,
    /// Highest number of `list_events` calls in flight at once.
    pub peak_reads: AtomicUsize,
}

impl MemoryStore {
    /// Registers an employee in the directory without recording any events.
    pub fn add_employee(&self, employee: &EmployeeId) {
        let mut employees = self.employees.lock().unwrap();
        if !employees.contains(employee) {
            employees.push(employee.clone());
        }
    }

    /// Appends events, registering each event's employee in the directory.
    pub fn push_events(&self, new_events: Vec<TimeEvent>) {
        for event in &new_events {
            self.add_employee(&event.employee);
        }
        self.events.lock().unwrap().extend(new_events);
    }

    pub fn push_summary(&self, summary: WeeklySummary) {
        self.summaries
            .lock()
            .unwrap()
            .insert((summary.employee.clone(), summary.week_start), summary);
    }

    /// Makes every event read for this employee fail with `Unavailable`.
    pub fn poison(&self, employee: &EmployeeId) {
        self.add_employee(employee);
        self.poisoned.lock().unwrap().push(employee.clone());
    }

    /// Stalls each event read by `delay`, so overlapping reads are observable.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_directory_down(&self) {
        self.directory_down.store(true, Ordering::SeqCst);
    }

    pub fn summary_for(
        &self,
        employee: &EmployeeId,
        week_start: NaiveDate,
    ) -> Option<WeeklySummary> {
        self.summaries
            .lock()
            .unwrap()
            .get(&(employee.clone(), week_start))
            .cloned()
    }

    pub fn summary_count(&self) -> usize {
        self.summaries.lock().unwrap().len()
    }
}

/// Tracks one in-flight event read, updating `peak_reads` on entry.
struct ReadTicket<'a>(&'a MemoryStore);

impl<'a> ReadTicket<'a> {
    fn take(store: &'a MemoryStore) -> Self {
        let live = store.active_reads.fetch_add(1, Ordering::SeqCst) + 1;
        store.peak_reads.fetch_max(live, Ordering::SeqCst);
        Self(store)
    }
}

impl Drop for ReadTicket<'_> {
    fn drop(&mut self) {
        self.0.active_reads.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EventStore for MemoryStore {
    fn list_events(
        &self,
        employee: &EmployeeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeEvent>, StoreError> {
        let _ticket = ReadTicket::take(self);
        if self.poisoned.lock().unwrap().contains(employee) {
            return Err(StoreError::Unavailable(format!(
                "events offline for {employee}"
            )));
        }
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| {
                event.employee == *employee && event.timestamp >= start && event.timestamp < end
            })
            .cloned()
            .collect())
    }
}

impl EmployeeDirectory for MemoryStore {
    fn list_employee_ids(&self) -> Result<Vec<EmployeeId>, StoreError> {
        self.directory_calls.fetch_add(1, Ordering::SeqCst);
        if self.directory_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("directory offline".to_string()));
        }
        Ok(self.employees.lock().unwrap().clone())
    }
}

impl SummaryStore for MemoryStore {
    fn upsert_summary(&self, summary: &WeeklySummary) -> Result<(), StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.push_summary(summary.clone());
        Ok(())
    }

    fn list_summaries(
        &self,
        employee: &EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeeklySummary>, StoreError> {
        let mut rows: Vec<WeeklySummary> = self
            .summaries
            .lock()
            .unwrap()
            .values()
            .filter(|summary| {
                summary.employee == *employee
                    && summary.week_start >= start
                    && summary.week_start <= end
            })
            .cloned()
            .collect();
        rows.sort_by_key(|summary| summary.week_start);
        Ok(rows)
    }
}
