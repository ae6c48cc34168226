use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    // Wrap in a short timeout so the healthcheck always responds quickly,
    // even if the first DB connection hangs (e.g. DNS, SSL, TCP).
    let store_ok = match tokio::time::timeout(Duration::from_secs(3), state.store.ping()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Health check store ping failed");
            false
        }
        Err(_) => {
            tracing::error!("Health check store ping timed out (3s)");
            false
        }
    };

    let status = if store_ok { "ok" } else { "degraded" };
    let mut body = json!({
        "status": status,
        "now": Utc::now().to_rfc3339(),
        "store": store_ok
    });
    if state.store.is_file_backed() {
        body["storeMode"] =
            json!("local fallback store: single-process only, no atomicity guarantees");
    }
    Json(body)
}
