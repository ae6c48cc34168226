//! Rent indexing schedules and reminders.
//!
//! An indexing schedule is an anchor `(day, month)` stepped every N months
//! across the contract's active window, with the day clamped to each month's
//! length (an anchor of Feb 29 lands on Feb 29 in leap years and Feb 28
//! otherwise). Manually entered dates survive every regeneration.

use chrono::{Datelike, NaiveDate};

use crate::domain::{clamped_date, Contract};
use crate::error::AppResult;
use crate::services::events::{DomainEvent, EventBus};
use crate::store::Store;

/// Reminder lead times, in days before the indexing date.
pub const REMINDER_THRESHOLDS: [i64; 3] = [60, 30, 20];

#[derive(Debug, Clone, Copy)]
pub struct IndexingSchedule {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub day: u32,
    pub month: u32,
    pub every_months: u32,
}

fn add_months(year: i32, month: u32, delta: u32) -> (i32, u32) {
    let zero_based = (month - 1) + delta;
    (year + (zero_based / 12) as i32, zero_based % 12 + 1)
}

/// All indexing dates the schedule produces within `[start, end]`, ascending.
pub fn generate_indexing_dates_from_schedule(schedule: &IndexingSchedule) -> Vec<NaiveDate> {
    if schedule.every_months == 0 || schedule.end < schedule.start {
        return Vec::new();
    }
    let mut year = schedule.start.year();
    let mut current_month = schedule.month;
    let Some(mut candidate) = clamped_date(year, current_month, schedule.day) else {
        return Vec::new();
    };
    while candidate < schedule.start {
        let (next_year, next_month) = add_months(year, current_month, schedule.every_months);
        year = next_year;
        current_month = next_month;
        match clamped_date(year, current_month, schedule.day) {
            Some(date) => candidate = date,
            None => return Vec::new(),
        }
    }

    let mut dates = Vec::new();
    while candidate <= schedule.end {
        dates.push(candidate);
        let (next_year, next_month) = add_months(year, current_month, schedule.every_months);
        year = next_year;
        current_month = next_month;
        match clamped_date(year, current_month, schedule.day) {
            Some(date) => candidate = date,
            None => break,
        }
    }
    dates
}

/// The contract's full indexing calendar: the generated schedule merged with
/// the manually entered dates, deduplicated and sorted.
pub fn compute_future_indexing_dates(contract: &Contract) -> Vec<NaiveDate> {
    let mut dates = match (contract.indexing_day, contract.indexing_month) {
        (Some(day), Some(month)) => generate_indexing_dates_from_schedule(&IndexingSchedule {
            start: contract.start_date,
            end: contract.effective_end_date(),
            day,
            month,
            every_months: contract.indexing_every_months,
        }),
        _ => Vec::new(),
    };
    dates.extend(contract.manual_indexing_dates.iter().copied());
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// Scan all active contracts for indexing dates approaching one of the
/// reminder thresholds and emit one reminder per `(contract, date,
/// threshold)`. The notification log makes re-running the same day a no-op.
pub async fn run_indexing_reminder_scan(
    store: &Store,
    bus: &EventBus,
    today: NaiveDate,
) -> AppResult<u32> {
    let contracts = store.list_contracts().await?;
    let mut emitted = 0;
    for contract in &contracts {
        if !contract.is_active_on(today) {
            continue;
        }
        let Some(next_date) = compute_future_indexing_dates(contract)
            .into_iter()
            .find(|date| *date >= today)
        else {
            continue;
        };
        let days_until = (next_date - today).num_days();
        if !REMINDER_THRESHOLDS.contains(&days_until) {
            continue;
        }
        if store
            .reminder_logged(&contract.id, next_date, days_until)
            .await?
        {
            continue;
        }
        store.log_reminder(&contract.id, next_date, days_until).await?;
        bus.publish(DomainEvent::IndexingReminderDue {
            contract_id: contract.id.clone(),
            indexing_date: next_date,
            days_until,
        });
        emitted += 1;
    }
    if emitted > 0 {
        tracing::info!(emitted, %today, "Indexing reminder scan emitted reminders");
    }
    Ok(emitted)
}
