use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, Utc};
use serde_json::json;

use crate::{
    domain::Partner,
    error::{AppError, AppResult},
    schemas::{validate_input, DueQuery, InvoicesQuery, IssueInvoiceInput},
    services::{billing, due, events::DomainEvent, numbering, pdf, rent},
    state::AppState,
    store::InsertOutcome,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/invoices", axum::routing::get(list_invoices))
        .route("/invoices/due", axum::routing::get(list_due))
        .route("/invoices/issue", axum::routing::post(issue_invoice))
        .route(
            "/invoices/{number}",
            axum::routing::delete(delete_invoice),
        )
        .route("/invoices/{number}/pdf", axum::routing::get(invoice_pdf))
}

#[derive(Debug, serde::Deserialize)]
struct InvoicePath {
    number: String,
}

async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<InvoicesQuery>,
) -> AppResult<impl IntoResponse> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let invoices = state.invoices_for_year(year).await?;
    let filtered: Vec<_> = invoices
        .iter()
        .filter(|invoice| query.month.is_none_or(|m| invoice.issued_at.month() == m))
        .cloned()
        .collect();
    Ok(Json(filtered))
}

async fn list_due(
    State(state): State<AppState>,
    Query(query): Query<DueQuery>,
) -> AppResult<impl IntoResponse> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let year = query.year.unwrap_or_else(|| as_of.year());
    let month = query.month.unwrap_or_else(|| as_of.month());
    if !(1..=12).contains(&month) {
        return Err(AppError::BadRequest(
            "month must be between 1 and 12.".to_string(),
        ));
    }

    let contracts = state.store.list_contracts().await?;
    let mut occurrences = due::due_occurrences(&contracts, year, month);
    let invoices = state.invoices_for_year(year).await?;
    due::mark_issued(&mut occurrences, &invoices);
    Ok(Json(json!({
        "year": year,
        "month": month,
        "asOf": as_of,
        "due": occurrences
    })))
}

async fn issue_invoice(
    State(state): State<AppState>,
    Json(input): Json<IssueInvoiceInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;
    let contract = state
        .store
        .get_contract(&input.contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contract not found.".to_string()))?;

    let partner = resolve_partner(&contract.partners, &input)?;
    let partner_key = billing::issuance_key(&contract, partner.as_ref());

    // App-level pre-check; the storage unique key still backstops races.
    if let Some(existing) = state
        .store
        .find_invoice_by_key(&contract.id, &partner_key, input.issued_at)
        .await?
    {
        return Ok((StatusCode::OK, Json(existing)));
    }

    if input.amount_eur.is_none() && rent::rent_amount_at(&contract, input.issued_at).is_none() {
        return Err(AppError::UnprocessableEntity(
            "No rent amount resolves for this contract on the issue date.".to_string(),
        ));
    }

    let number = numbering::allocate_invoice_number(
        &state.store,
        &contract.owner_id,
        &contract.owner_name,
        input.issued_at.year(),
        state.config.invoice_series_pad_width,
    )
    .await?;
    let invoice = billing::compute_invoice_from_contract(
        &contract,
        partner.as_ref(),
        input.issued_at,
        &number,
        input.amount_eur,
    );

    match state.store.insert_invoice_unique(&invoice).await? {
        InsertOutcome::Inserted => {
            state.invalidate_invoices_year(invoice.issued_at.year()).await;
            state.events.publish(DomainEvent::InvoiceIssued {
                number: invoice.number.clone(),
                contract_id: invoice.contract_id.clone(),
                total_ron: invoice.total_ron,
            });
            Ok((StatusCode::CREATED, Json(invoice)))
        }
        InsertOutcome::Existing(existing) => Ok((StatusCode::OK, Json(existing))),
    }
}

/// Resolve the partner the request addresses. A `partnerId` that matches no
/// contract partner is rejected unless the request also carries a
/// `partnerName` to issue to; silently falling back to the default partner
/// would invoice the wrong party.
fn resolve_partner(
    partners: &[Partner],
    input: &IssueInvoiceInput,
) -> Result<Option<Partner>, AppError> {
    if input.partner_id.is_none() && input.partner_name.is_none() {
        return Ok(None);
    }
    let matched = partners
        .iter()
        .find(|p| {
            (input.partner_id.is_some() && p.id == input.partner_id)
                || (input.partner_id.is_none() && Some(&p.name) == input.partner_name.as_ref())
        })
        .cloned();
    if matched.is_some() {
        return Ok(matched);
    }
    match &input.partner_name {
        Some(name) => Ok(Some(Partner {
            id: input.partner_id.clone(),
            name: name.clone(),
            share_percent: None,
        })),
        None => Err(AppError::UnprocessableEntity(format!(
            "Partner '{}' is not a partner of this contract.",
            input.partner_id.as_deref().unwrap_or_default()
        ))),
    }
}

async fn delete_invoice(
    State(state): State<AppState>,
    Path(path): Path<InvoicePath>,
) -> AppResult<impl IntoResponse> {
    let invoice = state
        .store
        .get_invoice(&path.number)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice not found.".to_string()))?;
    state.store.delete_invoice(&path.number).await?;
    state.invalidate_invoices_year(invoice.issued_at.year()).await;
    state.events.publish(DomainEvent::InvoiceDeleted {
        number: invoice.number.clone(),
    });
    Ok(Json(json!({ "deleted": invoice.number })))
}

async fn invoice_pdf(
    State(state): State<AppState>,
    Path(path): Path<InvoicePath>,
) -> AppResult<impl IntoResponse> {
    let invoice = state
        .store
        .get_invoice(&path.number)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice not found.".to_string()))?;
    let bytes = pdf::render_invoice_pdf(&invoice)?;

    if invoice.pdf_url.is_none() {
        let url = format!(
            "{}{}/invoices/{}/pdf",
            state.config.app_public_url, state.config.api_prefix, invoice.number
        );
        state.store.set_invoice_pdf_url(&invoice.number, &url).await?;
        state.invalidate_invoices_year(invoice.issued_at.year()).await;
    }

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}.pdf\"", invoice.number),
        ),
    ];
    Ok((headers, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partners() -> Vec<Partner> {
        vec![
            Partner {
                id: Some("p1".into()),
                name: "Alpha".into(),
                share_percent: Some(60.0),
            },
            Partner {
                id: Some("p2".into()),
                name: "Beta".into(),
                share_percent: Some(40.0),
            },
        ]
    }

    fn request(partner_id: Option<&str>, partner_name: Option<&str>) -> IssueInvoiceInput {
        serde_json::from_value(serde_json::json!({
            "contractId": "c1",
            "issuedAt": "2025-05-01",
            "partnerId": partner_id,
            "partnerName": partner_name,
        }))
        .unwrap()
    }

    #[test]
    fn matching_partner_id_resolves() {
        let partner = resolve_partner(&partners(), &request(Some("p2"), None))
            .unwrap()
            .unwrap();
        assert_eq!(partner.name, "Beta");
    }

    #[test]
    fn no_partner_fields_means_default_addressing() {
        assert!(resolve_partner(&partners(), &request(None, None))
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_partner_id_without_name_is_rejected() {
        let error = resolve_partner(&partners(), &request(Some("ghost"), None)).unwrap_err();
        assert!(matches!(error, AppError::UnprocessableEntity(_)));
    }

    #[test]
    fn unknown_partner_id_with_name_issues_to_the_named_party() {
        let partner = resolve_partner(&partners(), &request(Some("ext-1"), Some("Gamma SRL")))
            .unwrap()
            .unwrap();
        assert_eq!(partner.id.as_deref(), Some("ext-1"));
        assert_eq!(partner.name, "Gamma SRL");
    }
}
