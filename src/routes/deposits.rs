use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    domain::Deposit,
    error::{AppError, AppResult},
    schemas::{validate_input, CreateDepositInput, UpdateDepositInput},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/deposits",
            axum::routing::get(list_deposits).post(create_deposit),
        )
        .route(
            "/deposits/{deposit_id}",
            axum::routing::patch(update_deposit).delete(delete_deposit),
        )
        .route(
            "/deposits/{deposit_id}/toggle",
            axum::routing::post(toggle_deposit),
        )
}

#[derive(Debug, serde::Deserialize)]
struct DepositPath {
    deposit_id: String,
}

async fn list_deposits(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.store.list_deposits().await?))
}

async fn create_deposit(
    State(state): State<AppState>,
    Json(input): Json<CreateDepositInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;
    if state.store.get_contract(&input.contract_id).await?.is_none() {
        return Err(AppError::NotFound("Contract not found.".to_string()));
    }
    let now = Utc::now();
    let deposit = Deposit {
        id: uuid::Uuid::new_v4().to_string(),
        contract_id: input.contract_id,
        kind: input.kind,
        is_deposited: input.is_deposited,
        amount_eur: input.amount_eur,
        note: input.note,
        created_at: now,
        updated_at: now,
    };
    state.store.upsert_deposit(&deposit).await?;
    Ok((StatusCode::CREATED, Json(deposit)))
}

async fn update_deposit(
    State(state): State<AppState>,
    Path(path): Path<DepositPath>,
    Json(input): Json<UpdateDepositInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;
    let mut deposit = state
        .store
        .get_deposit(&path.deposit_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Deposit not found.".to_string()))?;

    if let Some(kind) = input.kind {
        deposit.kind = kind;
    }
    if let Some(is_deposited) = input.is_deposited {
        deposit.is_deposited = is_deposited;
    }
    if input.amount_eur.is_some() {
        deposit.amount_eur = input.amount_eur;
    }
    if input.note.is_some() {
        deposit.note = input.note;
    }
    deposit.updated_at = Utc::now();
    state.store.upsert_deposit(&deposit).await?;
    Ok(Json(deposit))
}

async fn toggle_deposit(
    State(state): State<AppState>,
    Path(path): Path<DepositPath>,
) -> AppResult<impl IntoResponse> {
    let mut deposit = state
        .store
        .get_deposit(&path.deposit_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Deposit not found.".to_string()))?;
    deposit.is_deposited = !deposit.is_deposited;
    deposit.updated_at = Utc::now();
    state.store.upsert_deposit(&deposit).await?;
    Ok(Json(deposit))
}

async fn delete_deposit(
    State(state): State<AppState>,
    Path(path): Path<DepositPath>,
) -> AppResult<impl IntoResponse> {
    if !state.store.delete_deposit(&path.deposit_id).await? {
        return Err(AppError::NotFound("Deposit not found.".to_string()));
    }
    Ok(Json(json!({ "deleted": path.deposit_id })))
}
