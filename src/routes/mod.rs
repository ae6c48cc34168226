use axum::{routing::get, Router};

use crate::state::AppState;

pub mod contracts;
pub mod deposits;
pub mod health;
pub mod internal;
pub mod invoices;
pub mod stats;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(contracts::router())
        .merge(invoices::router())
        .merge(deposits::router())
        .merge(stats::router())
        .merge(internal::router())
}
