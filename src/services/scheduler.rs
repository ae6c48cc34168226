use std::time::Duration;

use chrono::{Datelike, Timelike, Utc};
use tokio::time::sleep;

use crate::state::AppState;

/// Spawn the background scheduler that runs periodic jobs.
///
/// Each job runs in its own `tokio::spawn` so a failure in one job never
/// crashes the scheduler loop or other jobs.
pub async fn run_background_scheduler(state: AppState) {
    tracing::info!("Background scheduler started");

    let mut last_daily_run: Option<u32> = None;

    loop {
        sleep(Duration::from_secs(60)).await;

        let now_utc = Utc::now();
        let today = now_utc.date_naive();

        // --- Daily jobs (run once per calendar day) ---
        let today_ordinal = today.ordinal();
        if last_daily_run == Some(today_ordinal) {
            continue;
        }

        // Run daily jobs at or after 05:00 UTC
        if now_utc.hour() < 5 {
            continue;
        }

        last_daily_run = Some(today_ordinal);
        tracing::info!("Scheduler: running daily jobs for {today}");

        // 05:00 — indexing reminder scan
        {
            let st = state.clone();
            tokio::spawn(async move {
                match crate::services::indexing::run_indexing_reminder_scan(
                    &st.store, &st.events, today,
                )
                .await
                {
                    Ok(emitted) => {
                        tracing::info!(emitted, "Scheduler: indexing reminder scan completed");
                    }
                    Err(error) => {
                        tracing::error!(error = %error, "Scheduler: indexing reminder scan failed");
                    }
                }
            });
        }

        // 05:00 — refresh the HICP cache so contract views stay warm
        {
            let st = state.clone();
            tokio::spawn(async move {
                let from = today
                    .checked_sub_months(chrono::Months::new(12))
                    .unwrap_or(today);
                match crate::services::inflation::get_euro_inflation_percent(
                    &st.store,
                    &st.http_client,
                    &st.config,
                    from,
                    today,
                )
                .await
                {
                    Ok(Some(percent)) => {
                        tracing::info!(percent, "Scheduler: HICP refresh completed");
                    }
                    Ok(None) => {
                        tracing::warn!("Scheduler: HICP refresh found no usable series");
                    }
                    Err(error) => {
                        tracing::error!(error = %error, "Scheduler: HICP refresh failed");
                    }
                }
            });
        }
    }
}
