use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::domain::{
    ChosenDate, ContractExtension, InvoiceMonthMode, Partner, RentAmendment, RentType,
    ScheduledInvoice,
};
use crate::error::AppError;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

fn default_payment_due_days() -> u32 {
    30
}
fn default_indexing_every_months() -> u32 {
    12
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractInput {
    /// Optional explicit id; derived from the name when absent.
    pub id: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub asset_id: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub owner_id: String,
    #[validate(length(min = 1, max = 255))]
    pub owner_name: String,
    pub partner_id: Option<String>,
    pub partner_name: Option<String>,
    #[serde(default)]
    pub partners: Vec<Partner>,
    pub signed_at: Option<NaiveDate>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, alias = "contractExtensions")]
    pub extensions: Vec<ContractExtension>,
    pub rent_type: RentType,
    #[validate(range(min = 1, max = 31))]
    pub monthly_invoice_day: Option<u32>,
    #[serde(default)]
    pub invoice_month_mode: InvoiceMonthMode,
    #[serde(default, alias = "irregularInvoices")]
    pub yearly_invoices: Vec<ScheduledInvoice>,
    #[serde(default, alias = "chosenDatesInvoicesDates")]
    pub chosen_dates: Vec<ChosenDate>,
    #[serde(default, rename = "amountEUR")]
    pub amount_eur: Option<f64>,
    #[serde(default, alias = "indexingDates")]
    pub rent_history: Vec<RentAmendment>,
    #[serde(rename = "exchangeRateRON")]
    #[validate(range(min = 0.0))]
    pub exchange_rate_ron: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub tva_percent: f64,
    #[serde(default)]
    pub correction_percent: f64,
    #[serde(default = "default_payment_due_days")]
    #[validate(range(max = 120))]
    pub payment_due_days: u32,
    #[validate(range(min = 1, max = 31))]
    pub indexing_day: Option<u32>,
    #[validate(range(min = 1, max = 12))]
    pub indexing_month: Option<u32>,
    #[serde(default = "default_indexing_every_months", alias = "howOftenIsIndexing")]
    #[validate(range(min = 1, max = 60))]
    pub indexing_every_months: u32,
    #[serde(default)]
    pub manual_indexing_dates: Vec<NaiveDate>,
    pub scan_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub asset_id: Option<String>,
    pub owner_name: Option<String>,
    pub partner_id: Option<String>,
    pub partner_name: Option<String>,
    pub partners: Option<Vec<Partner>>,
    pub signed_at: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(alias = "contractExtensions")]
    pub extensions: Option<Vec<ContractExtension>>,
    pub rent_type: Option<RentType>,
    #[validate(range(min = 1, max = 31))]
    pub monthly_invoice_day: Option<u32>,
    pub invoice_month_mode: Option<InvoiceMonthMode>,
    #[serde(alias = "irregularInvoices")]
    pub yearly_invoices: Option<Vec<ScheduledInvoice>>,
    #[serde(alias = "chosenDatesInvoicesDates")]
    pub chosen_dates: Option<Vec<ChosenDate>>,
    #[serde(rename = "amountEUR")]
    pub amount_eur: Option<f64>,
    #[serde(alias = "indexingDates")]
    pub rent_history: Option<Vec<RentAmendment>>,
    #[serde(rename = "exchangeRateRON")]
    #[validate(range(min = 0.0))]
    pub exchange_rate_ron: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub tva_percent: Option<f64>,
    pub correction_percent: Option<f64>,
    #[validate(range(max = 120))]
    pub payment_due_days: Option<u32>,
    #[validate(range(min = 1, max = 31))]
    pub indexing_day: Option<u32>,
    #[validate(range(min = 1, max = 12))]
    pub indexing_month: Option<u32>,
    #[serde(alias = "howOftenIsIndexing")]
    #[validate(range(min = 1, max = 60))]
    pub indexing_every_months: Option<u32>,
    pub manual_indexing_dates: Option<Vec<NaiveDate>>,
    pub scan_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueInvoiceInput {
    #[validate(length(min = 1, max = 255))]
    pub contract_id: String,
    pub issued_at: NaiveDate,
    /// Which partner of a multi-partner contract the invoice addresses.
    pub partner_id: Option<String>,
    pub partner_name: Option<String>,
    /// Pre-split or prorated amount from the due view; overrides the
    /// amendment history.
    #[serde(rename = "amountEUR")]
    #[validate(range(min = 0.0))]
    pub amount_eur: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepositInput {
    #[validate(length(min = 1, max = 255))]
    pub contract_id: String,
    #[validate(length(min = 1, max = 64))]
    pub kind: String,
    #[serde(default)]
    pub is_deposited: bool,
    #[serde(rename = "amountEUR")]
    #[validate(range(min = 0.0))]
    pub amount_eur: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepositInput {
    #[validate(length(min = 1, max = 64))]
    pub kind: Option<String>,
    pub is_deposited: Option<bool>,
    #[serde(rename = "amountEUR")]
    #[validate(range(min = 0.0))]
    pub amount_eur: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicesQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DueQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyStatsQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDate>,
}

/// Month window for inflation lookups. `to` defaults to today; `from`
/// defaults to one indexing period before `to`.
#[derive(Debug, Clone, Deserialize)]
pub struct PeriodQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
