use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Rental contract — the central entity. Historical exports used several
/// spellings for the same concepts (`irregularInvoices` vs `yearlyInvoices`,
/// `indexingDates` vs the amendment history); both are accepted on read via
/// serde aliases, and only the canonical name is ever written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub asset_id: Option<String>,
    pub owner_id: String,
    pub owner_name: String,
    #[serde(default)]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub partner_name: Option<String>,
    #[serde(default)]
    pub partners: Vec<Partner>,
    #[serde(default)]
    pub signed_at: Option<NaiveDate>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, alias = "contractExtensions")]
    pub extensions: Vec<ContractExtension>,
    pub rent_type: RentType,
    #[serde(default)]
    pub monthly_invoice_day: Option<u32>,
    #[serde(default)]
    pub invoice_month_mode: InvoiceMonthMode,
    #[serde(default, alias = "irregularInvoices")]
    pub yearly_invoices: Vec<ScheduledInvoice>,
    #[serde(default, alias = "chosenDatesInvoicesDates")]
    pub chosen_dates: Vec<ChosenDate>,
    /// Legacy flat rent, used only before the first amendment takes effect.
    #[serde(default, rename = "amountEUR")]
    pub amount_eur: Option<f64>,
    #[serde(default, alias = "indexingDates")]
    pub rent_history: Vec<RentAmendment>,
    #[serde(rename = "exchangeRateRON")]
    pub exchange_rate_ron: f64,
    pub tva_percent: f64,
    #[serde(default)]
    pub correction_percent: f64,
    #[serde(default = "default_payment_due_days")]
    pub payment_due_days: u32,
    #[serde(default)]
    pub indexing_day: Option<u32>,
    #[serde(default)]
    pub indexing_month: Option<u32>,
    #[serde(default = "default_indexing_every_months", alias = "howOftenIsIndexing")]
    pub indexing_every_months: u32,
    #[serde(default)]
    pub manual_indexing_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub scan_url: Option<String>,
}

fn default_payment_due_days() -> u32 {
    30
}

fn default_indexing_every_months() -> u32 {
    12
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RentType {
    Monthly,
    Yearly,
    ChosenDates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvoiceMonthMode {
    /// Bill the month being evaluated.
    #[default]
    Current,
    /// Advance billing: bill in month M for occupancy in month M+1.
    Next,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub share_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractExtension {
    #[serde(default)]
    pub doc_date: Option<NaiveDate>,
    #[serde(default)]
    pub document: Option<String>,
    pub extended_until: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledInvoice {
    pub month: u32,
    pub day: u32,
    #[serde(rename = "amountEUR")]
    pub amount_eur: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChosenDate {
    pub date: NaiveDate,
}

/// One effective-dated rent change. "Indexing" entries are forecast first and
/// confirmed later; the confirmed `actual_date` wins over the forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentAmendment {
    pub forecast_date: NaiveDate,
    #[serde(default)]
    pub actual_date: Option<NaiveDate>,
    pub new_rent_amount: f64,
    #[serde(default)]
    pub done: bool,
}

impl RentAmendment {
    pub fn effective_date(&self) -> NaiveDate {
        self.actual_date.unwrap_or(self.forecast_date)
    }
}

impl Contract {
    /// The real-world expiry: contract end date pushed out by the latest
    /// extension. An extension can only extend, never shorten.
    pub fn effective_end_date(&self) -> NaiveDate {
        self.extensions
            .iter()
            .map(|extension| extension.extended_until)
            .fold(self.end_date, NaiveDate::max)
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.effective_end_date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_contract() -> Contract {
        serde_json::from_value(json!({
            "id": "c1",
            "name": "Unit 4, Str. Lunga 10",
            "ownerId": "o1",
            "ownerName": "Imob SRL",
            "startDate": "2025-01-01",
            "endDate": "2025-12-31",
            "rentType": "monthly",
            "amountEUR": 1000.0,
            "exchangeRateRON": 4.97,
            "tvaPercent": 19.0
        }))
        .expect("valid contract json")
    }

    #[test]
    fn effective_end_uses_latest_extension() {
        let mut contract = base_contract();
        assert_eq!(
            contract.effective_end_date(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );

        contract.extensions = vec![
            ContractExtension {
                doc_date: None,
                document: None,
                extended_until: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            },
            ContractExtension {
                doc_date: None,
                document: None,
                extended_until: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            },
        ];
        assert_eq!(
            contract.effective_end_date(),
            NaiveDate::from_ymd_opt(2026, 6, 30).unwrap()
        );
    }

    #[test]
    fn extension_cannot_shorten() {
        let mut contract = base_contract();
        contract.extensions = vec![ContractExtension {
            doc_date: None,
            document: None,
            extended_until: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        }];
        // An "extension" earlier than the end date leaves the end date alone.
        assert_eq!(
            contract.effective_end_date(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
    }

    #[test]
    fn active_window_is_inclusive() {
        let contract = base_contract();
        assert!(contract.is_active_on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(contract.is_active_on(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()));
        assert!(!contract.is_active_on(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(!contract.is_active_on(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    }

    #[test]
    fn reads_legacy_field_names() {
        let contract: Contract = serde_json::from_value(json!({
            "id": "c2",
            "name": "Hall A",
            "ownerId": "o1",
            "ownerName": "Imob SRL",
            "startDate": "2024-01-01",
            "endDate": "2026-12-31",
            "rentType": "yearly",
            "irregularInvoices": [{"month": 3, "day": 15, "amountEUR": 5000.0}],
            "howOftenIsIndexing": 6,
            "exchangeRateRON": 4.97,
            "tvaPercent": 19.0
        }))
        .expect("legacy aliases accepted");

        assert_eq!(contract.yearly_invoices.len(), 1);
        assert_eq!(contract.indexing_every_months, 6);

        // Canonical name on write, never the alias.
        let out = serde_json::to_value(&contract).unwrap();
        assert!(out.get("yearlyInvoices").is_some());
        assert!(out.get("irregularInvoices").is_none());
    }

    #[test]
    fn amendment_effective_date_prefers_actual() {
        let amendment = RentAmendment {
            forecast_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            actual_date: Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            new_rent_amount: 1100.0,
            done: true,
        };
        assert_eq!(
            amendment.effective_date(),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        );
    }
}
