//! Storage backends.
//!
//! Postgres is the real backend (jsonb documents, runtime-built queries).
//! When no `DATABASE_URL` is configured a local JSON-file store takes over so
//! the service stays usable in development; it is single-process only and
//! makes no atomicity guarantees.

pub mod files;
pub mod postgres;

use chrono::NaiveDate;

use crate::domain::{Contract, Deposit, Invoice};
use crate::error::AppResult;

/// Outcome of a uniqueness-guarded invoice insert.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted,
    /// An invoice with the same `(contract, partner, issued_at)` identity
    /// already exists; issuance is idempotent and returns it.
    Existing(Invoice),
}

/// A freshly allocated invoice number plus the series settings it came from.
#[derive(Debug, Clone)]
pub struct AllocatedNumber {
    pub series: String,
    pub number: i64,
    pub pad_width: usize,
    pub include_year: bool,
}

#[derive(Clone)]
pub enum Store {
    Pg(postgres::PgStore),
    Files(files::FileStore),
}

impl Store {
    pub fn is_file_backed(&self) -> bool {
        matches!(self, Store::Files(_))
    }

    pub async fn ensure_schema(&self) -> AppResult<()> {
        match self {
            Store::Pg(s) => s.ensure_schema().await,
            Store::Files(s) => s.ensure_dirs().await,
        }
    }

    pub async fn ping(&self) -> AppResult<()> {
        match self {
            Store::Pg(s) => s.ping().await,
            Store::Files(s) => s.ping().await,
        }
    }

    pub async fn list_contracts(&self) -> AppResult<Vec<Contract>> {
        match self {
            Store::Pg(s) => s.list_contracts().await,
            Store::Files(s) => s.list_contracts().await,
        }
    }

    pub async fn get_contract(&self, id: &str) -> AppResult<Option<Contract>> {
        match self {
            Store::Pg(s) => s.get_contract(id).await,
            Store::Files(s) => s.get_contract(id).await,
        }
    }

    pub async fn upsert_contract(&self, contract: &Contract) -> AppResult<()> {
        match self {
            Store::Pg(s) => s.upsert_contract(contract).await,
            Store::Files(s) => s.upsert_contract(contract).await,
        }
    }

    pub async fn delete_contract(&self, id: &str) -> AppResult<bool> {
        match self {
            Store::Pg(s) => s.delete_contract(id).await,
            Store::Files(s) => s.delete_contract(id).await,
        }
    }

    pub async fn list_invoices_for_year(&self, year: i32) -> AppResult<Vec<Invoice>> {
        match self {
            Store::Pg(s) => s.list_invoices_for_year(year).await,
            Store::Files(s) => s.list_invoices_for_year(year).await,
        }
    }

    pub async fn get_invoice(&self, number: &str) -> AppResult<Option<Invoice>> {
        match self {
            Store::Pg(s) => s.get_invoice(number).await,
            Store::Files(s) => s.get_invoice(number).await,
        }
    }

    pub async fn find_invoice_by_key(
        &self,
        contract_id: &str,
        partner_key: &str,
        issued_at: NaiveDate,
    ) -> AppResult<Option<Invoice>> {
        match self {
            Store::Pg(s) => s.find_invoice_by_key(contract_id, partner_key, issued_at).await,
            Store::Files(s) => s.find_invoice_by_key(contract_id, partner_key, issued_at).await,
        }
    }

    pub async fn insert_invoice_unique(&self, invoice: &Invoice) -> AppResult<InsertOutcome> {
        match self {
            Store::Pg(s) => s.insert_invoice_unique(invoice).await,
            Store::Files(s) => s.insert_invoice_unique(invoice).await,
        }
    }

    pub async fn set_invoice_pdf_url(&self, number: &str, pdf_url: &str) -> AppResult<()> {
        match self {
            Store::Pg(s) => s.set_invoice_pdf_url(number, pdf_url).await,
            Store::Files(s) => s.set_invoice_pdf_url(number, pdf_url).await,
        }
    }

    pub async fn delete_invoice(&self, number: &str) -> AppResult<bool> {
        match self {
            Store::Pg(s) => s.delete_invoice(number).await,
            Store::Files(s) => s.delete_invoice(number).await,
        }
    }

    pub async fn list_deposits(&self) -> AppResult<Vec<Deposit>> {
        match self {
            Store::Pg(s) => s.list_deposits().await,
            Store::Files(s) => s.list_deposits().await,
        }
    }

    pub async fn get_deposit(&self, id: &str) -> AppResult<Option<Deposit>> {
        match self {
            Store::Pg(s) => s.get_deposit(id).await,
            Store::Files(s) => s.get_deposit(id).await,
        }
    }

    pub async fn upsert_deposit(&self, deposit: &Deposit) -> AppResult<()> {
        match self {
            Store::Pg(s) => s.upsert_deposit(deposit).await,
            Store::Files(s) => s.upsert_deposit(deposit).await,
        }
    }

    pub async fn delete_deposit(&self, id: &str) -> AppResult<bool> {
        match self {
            Store::Pg(s) => s.delete_deposit(id).await,
            Store::Files(s) => s.delete_deposit(id).await,
        }
    }

    /// Allocate the next invoice number for an owner, atomically on Postgres.
    pub async fn allocate_sequence(
        &self,
        owner_key: &str,
        default_series: &str,
        default_pad_width: usize,
    ) -> AppResult<AllocatedNumber> {
        match self {
            Store::Pg(s) => s.allocate_sequence(owner_key, default_series, default_pad_width).await,
            Store::Files(s) => {
                s.allocate_sequence(owner_key, default_series, default_pad_width)
                    .await
            }
        }
    }

    pub async fn inflation_series(&self) -> AppResult<Vec<(String, f64)>> {
        match self {
            Store::Pg(s) => s.inflation_series().await,
            Store::Files(s) => s.inflation_series().await,
        }
    }

    pub async fn upsert_inflation_months(&self, months: &[(String, f64)]) -> AppResult<()> {
        match self {
            Store::Pg(s) => s.upsert_inflation_months(months).await,
            Store::Files(s) => s.upsert_inflation_months(months).await,
        }
    }

    pub async fn reminder_logged(
        &self,
        contract_id: &str,
        indexing_date: NaiveDate,
        threshold_days: i64,
    ) -> AppResult<bool> {
        match self {
            Store::Pg(s) => s.reminder_logged(contract_id, indexing_date, threshold_days).await,
            Store::Files(s) => s.reminder_logged(contract_id, indexing_date, threshold_days).await,
        }
    }

    pub async fn log_reminder(
        &self,
        contract_id: &str,
        indexing_date: NaiveDate,
        threshold_days: i64,
    ) -> AppResult<()> {
        match self {
            Store::Pg(s) => s.log_reminder(contract_id, indexing_date, threshold_days).await,
            Store::Files(s) => s.log_reminder(contract_id, indexing_date, threshold_days).await,
        }
    }
}
