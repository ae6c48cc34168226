use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    schemas::AsOfQuery,
    services::indexing,
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route(
        "/internal/cron/indexing-reminders",
        axum::routing::post(run_indexing_reminders),
    )
}

fn require_internal_key(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = state.config.internal_api_key.as_deref() else {
        return Err(AppError::Forbidden(
            "Internal endpoints are disabled: no INTERNAL_API_KEY configured.".to_string(),
        ));
    };
    let provided = headers
        .get("x-internal-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        return Err(AppError::Forbidden("Invalid internal key.".to_string()));
    }
    Ok(())
}

/// Cron-triggered reminder scan. `as_of` lets replays and tests pin the day.
async fn run_indexing_reminders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AsOfQuery>,
) -> AppResult<impl IntoResponse> {
    require_internal_key(&state, &headers)?;
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let emitted = indexing::run_indexing_reminder_scan(&state.store, &state.events, as_of).await?;
    Ok(Json(json!({
        "asOf": as_of,
        "remindersEmitted": emitted
    })))
}
