use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, Utc};
use serde::Serialize;
use serde_json::json;

use crate::{
    domain::{Contract, Invoice},
    error::{AppError, AppResult},
    schemas::MonthlyStatsQuery,
    services::due::{self, DueOccurrence},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/stats/monthly", axum::routing::get(monthly_stats))
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct AmountSums {
    #[serde(rename = "RON")]
    pub ron: f64,
    #[serde(rename = "EUR")]
    pub eur: f64,
    #[serde(rename = "NetRON")]
    pub net_ron: f64,
}

/// Prognosis comes from the due scheduler (what the month should bill),
/// actual from the invoices that were really issued.
async fn monthly_stats(
    State(state): State<AppState>,
    Query(query): Query<MonthlyStatsQuery>,
) -> AppResult<impl IntoResponse> {
    let today = Utc::now().date_naive();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());
    if !(1..=12).contains(&month) {
        return Err(AppError::BadRequest(
            "month must be between 1 and 12.".to_string(),
        ));
    }

    let contracts = state.store.list_contracts().await?;
    let by_id: HashMap<&str, &Contract> =
        contracts.iter().map(|c| (c.id.as_str(), c)).collect();
    let invoices = state.invoices_for_year(year).await?;

    let prognosis_month = prognosis_sums(&due::due_occurrences(&contracts, year, month), &by_id);
    let mut prognosis_annual = AmountSums::default();
    for m in 1..=12 {
        let sums = prognosis_sums(&due::due_occurrences(&contracts, year, m), &by_id);
        prognosis_annual.ron += sums.ron;
        prognosis_annual.eur += sums.eur;
        prognosis_annual.net_ron += sums.net_ron;
    }

    let actual_month = actual_sums(invoices.iter().filter(|i| i.issued_at.month() == month));
    let actual_annual = actual_sums(invoices.iter());

    Ok(Json(json!({
        "contractsCount": contracts.len(),
        "year": year,
        "month": month,
        "prognosisMonth": prognosis_month,
        "actualMonth": actual_month,
        "prognosisAnnual": prognosis_annual,
        "actualAnnual": actual_annual,
        "generatedAt": Utc::now().to_rfc3339()
    })))
}

fn prognosis_sums(
    occurrences: &[DueOccurrence],
    contracts: &HashMap<&str, &Contract>,
) -> AmountSums {
    let mut sums = AmountSums::default();
    for occurrence in occurrences {
        let Some(contract) = contracts.get(occurrence.contract_id.as_str()) else {
            continue;
        };
        let corrected = occurrence.amount_eur * (1.0 + contract.correction_percent / 100.0);
        let net_ron = corrected * contract.exchange_rate_ron;
        sums.eur += occurrence.amount_eur;
        sums.net_ron += net_ron;
        sums.ron += net_ron * (1.0 + contract.tva_percent / 100.0);
    }
    sums
}

fn actual_sums<'a>(invoices: impl Iterator<Item = &'a Invoice>) -> AmountSums {
    let mut sums = AmountSums::default();
    for invoice in invoices {
        sums.eur += invoice.amount_eur;
        sums.net_ron += invoice.net_ron;
        sums.ron += invoice.total_ron;
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json as j;

    #[test]
    fn prognosis_applies_correction_vat_and_rate() {
        let contract: Contract = serde_json::from_value(j!({
            "id": "c1",
            "name": "Unit 4",
            "ownerId": "o1",
            "ownerName": "Imob SRL",
            "startDate": "2025-01-01",
            "endDate": "2025-12-31",
            "rentType": "monthly",
            "amountEUR": 1000.0,
            "exchangeRateRON": 5.0,
            "tvaPercent": 19.0,
            "correctionPercent": 2.0
        }))
        .unwrap();
        let occurrences = due::due_occurrences(std::slice::from_ref(&contract), 2025, 5);
        let mut by_id = HashMap::new();
        by_id.insert("c1", &contract);
        let sums = prognosis_sums(&occurrences, &by_id);
        assert_eq!(sums.eur, 1000.0);
        assert_eq!(sums.net_ron, 1000.0 * 1.02 * 5.0);
        assert!((sums.ron - sums.net_ron * 1.19).abs() < 1e-9);
    }
}
