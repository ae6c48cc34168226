use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    domain::Contract,
    error::{AppError, AppResult},
    schemas::{validate_input, CreateContractInput, PeriodQuery, UpdateContractInput},
    services::{events::DomainEvent, indexing, inflation},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/contracts",
            axum::routing::get(list_contracts).post(create_contract),
        )
        .route(
            "/contracts/{contract_id}",
            axum::routing::get(get_contract)
                .patch(update_contract)
                .delete(delete_contract),
        )
        .route(
            "/contracts/{contract_id}/indexing-dates",
            axum::routing::get(get_indexing_dates),
        )
        .route(
            "/contracts/{contract_id}/inflation",
            axum::routing::get(get_inflation),
        )
}

#[derive(Debug, serde::Deserialize)]
struct ContractPath {
    contract_id: String,
}

async fn list_contracts(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let contracts = state.store.list_contracts().await?;
    Ok(Json(contracts))
}

async fn get_contract(
    State(state): State<AppState>,
    Path(path): Path<ContractPath>,
) -> AppResult<impl IntoResponse> {
    let contract = state
        .store
        .get_contract(&path.contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contract not found.".to_string()))?;
    Ok(Json(contract))
}

async fn create_contract(
    State(state): State<AppState>,
    Json(input): Json<CreateContractInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;
    if input.end_date < input.start_date {
        return Err(AppError::UnprocessableEntity(
            "endDate must not precede startDate.".to_string(),
        ));
    }

    let id = match &input.id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => slugify(&input.name),
    };
    if id.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "Contract name yields an empty id.".to_string(),
        ));
    }
    if state.store.get_contract(&id).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Contract '{id}' already exists."
        )));
    }

    let contract = Contract {
        id,
        name: input.name,
        asset_id: input.asset_id,
        owner_id: input.owner_id,
        owner_name: input.owner_name,
        partner_id: input.partner_id,
        partner_name: input.partner_name,
        partners: input.partners,
        signed_at: input.signed_at,
        start_date: input.start_date,
        end_date: input.end_date,
        extensions: input.extensions,
        rent_type: input.rent_type,
        monthly_invoice_day: input.monthly_invoice_day,
        invoice_month_mode: input.invoice_month_mode,
        yearly_invoices: input.yearly_invoices,
        chosen_dates: input.chosen_dates,
        amount_eur: input.amount_eur,
        rent_history: input.rent_history,
        exchange_rate_ron: input.exchange_rate_ron,
        tva_percent: input.tva_percent,
        correction_percent: input.correction_percent,
        payment_due_days: input.payment_due_days,
        indexing_day: input.indexing_day,
        indexing_month: input.indexing_month,
        indexing_every_months: input.indexing_every_months,
        manual_indexing_dates: input.manual_indexing_dates,
        scan_url: input.scan_url,
    };
    state.store.upsert_contract(&contract).await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

async fn update_contract(
    State(state): State<AppState>,
    Path(path): Path<ContractPath>,
    Json(input): Json<UpdateContractInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;
    let mut contract = state
        .store
        .get_contract(&path.contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contract not found.".to_string()))?;

    if let Some(name) = input.name {
        contract.name = name;
    }
    if input.asset_id.is_some() {
        contract.asset_id = input.asset_id;
    }
    if let Some(owner_name) = input.owner_name {
        contract.owner_name = owner_name;
    }
    if input.partner_id.is_some() {
        contract.partner_id = input.partner_id;
    }
    if input.partner_name.is_some() {
        contract.partner_name = input.partner_name;
    }
    if let Some(partners) = input.partners {
        contract.partners = partners;
    }
    if input.signed_at.is_some() {
        contract.signed_at = input.signed_at;
    }
    if let Some(start_date) = input.start_date {
        contract.start_date = start_date;
    }
    if let Some(end_date) = input.end_date {
        contract.end_date = end_date;
    }
    if let Some(extensions) = input.extensions {
        contract.extensions = extensions;
    }
    if let Some(rent_type) = input.rent_type {
        contract.rent_type = rent_type;
    }
    if input.monthly_invoice_day.is_some() {
        contract.monthly_invoice_day = input.monthly_invoice_day;
    }
    if let Some(mode) = input.invoice_month_mode {
        contract.invoice_month_mode = mode;
    }
    if let Some(yearly_invoices) = input.yearly_invoices {
        contract.yearly_invoices = yearly_invoices;
    }
    if let Some(chosen_dates) = input.chosen_dates {
        contract.chosen_dates = chosen_dates;
    }
    if input.amount_eur.is_some() {
        contract.amount_eur = input.amount_eur;
    }
    if let Some(rent_history) = input.rent_history {
        contract.rent_history = rent_history;
    }
    if let Some(rate) = input.exchange_rate_ron {
        contract.exchange_rate_ron = rate;
    }
    if let Some(tva) = input.tva_percent {
        contract.tva_percent = tva;
    }
    if let Some(correction) = input.correction_percent {
        contract.correction_percent = correction;
    }
    if let Some(due_days) = input.payment_due_days {
        contract.payment_due_days = due_days;
    }
    if input.indexing_day.is_some() {
        contract.indexing_day = input.indexing_day;
    }
    if input.indexing_month.is_some() {
        contract.indexing_month = input.indexing_month;
    }
    if let Some(every) = input.indexing_every_months {
        contract.indexing_every_months = every;
    }
    if let Some(manual) = input.manual_indexing_dates {
        contract.manual_indexing_dates = manual;
    }
    if input.scan_url.is_some() {
        contract.scan_url = input.scan_url;
    }

    if contract.end_date < contract.start_date {
        return Err(AppError::UnprocessableEntity(
            "endDate must not precede startDate.".to_string(),
        ));
    }

    state.store.upsert_contract(&contract).await?;
    state.events.publish(DomainEvent::ContractUpdated {
        contract_id: contract.id.clone(),
    });
    Ok(Json(contract))
}

async fn delete_contract(
    State(state): State<AppState>,
    Path(path): Path<ContractPath>,
) -> AppResult<impl IntoResponse> {
    if !state.store.delete_contract(&path.contract_id).await? {
        return Err(AppError::NotFound("Contract not found.".to_string()));
    }
    Ok(Json(json!({ "deleted": path.contract_id })))
}

async fn get_indexing_dates(
    State(state): State<AppState>,
    Path(path): Path<ContractPath>,
) -> AppResult<impl IntoResponse> {
    let contract = state
        .store
        .get_contract(&path.contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contract not found.".to_string()))?;
    let dates = indexing::compute_future_indexing_dates(&contract);
    Ok(Json(json!({
        "contractId": contract.id,
        "indexingDates": dates
    })))
}

/// Inflation over a `[from, to]` month window. The window defaults to the
/// contract's own indexing period ending today, so the response is directly
/// usable for the next indexation.
async fn get_inflation(
    State(state): State<AppState>,
    Path(path): Path<ContractPath>,
    Query(query): Query<PeriodQuery>,
) -> AppResult<impl IntoResponse> {
    let contract = state
        .store
        .get_contract(&path.contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contract not found.".to_string()))?;
    let to = query.to.unwrap_or_else(|| Utc::now().date_naive());
    let from = query.from.unwrap_or_else(|| {
        let months = contract.indexing_every_months.max(1);
        to.checked_sub_months(chrono::Months::new(months)).unwrap_or(to)
    });
    if from > to {
        return Err(AppError::BadRequest(
            "from must not be after to.".to_string(),
        ));
    }
    let percent = inflation::get_euro_inflation_percent(
        &state.store,
        &state.http_client,
        &state.config,
        from,
        to,
    )
    .await?;
    Ok(Json(json!({
        "contractId": contract.id,
        "from": inflation::month_key(from),
        "to": inflation::month_key(to),
        "inflationPercent": percent
    })))
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut previous_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            previous_dash = false;
        } else if !previous_dash {
            slug.push('-');
            previous_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugs_are_lowercase_dashed() {
        assert_eq!(slugify("Unit 4, Str. Lunga 10"), "unit-4-str-lunga-10");
        assert_eq!(slugify("  Hall A  "), "hall-a");
        assert_eq!(slugify("***"), "");
    }
}
