//! Local JSON-file store, used when no `DATABASE_URL` is configured.
//!
//! One JSON file per collection under the data directory, guarded by a single
//! in-process mutex. Single-process only: nothing protects against a second
//! service instance writing the same files, and the sequence allocation is a
//! locked read-modify-write rather than a true atomic increment. The health
//! endpoint flags this mode.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::domain::{Contract, Deposit, Invoice};
use crate::error::AppResult;
use crate::store::{AllocatedNumber, InsertOutcome};

#[derive(Clone)]
pub struct FileStore {
    data_dir: PathBuf,
    lock: Arc<Mutex<()>>,
}

#[derive(Debug, Clone, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SequenceRecord {
    series: String,
    next_number: i64,
    pad_width: usize,
    include_year: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReminderRecord {
    contract_id: String,
    indexing_date: NaiveDate,
    threshold_days: i64,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn ensure_dirs(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        Ok(())
    }

    pub async fn ping(&self) -> AppResult<()> {
        tokio::fs::metadata(&self.data_dir).await?;
        Ok(())
    }

    fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.json"))
    }

    async fn read_vec<T: DeserializeOwned>(&self, name: &str) -> AppResult<Vec<T>> {
        read_json_or_default(&self.path(name)).await
    }

    async fn write_vec<T: Serialize>(&self, name: &str, items: &[T]) -> AppResult<()> {
        write_json(&self.path(name), items).await
    }

    pub async fn list_contracts(&self) -> AppResult<Vec<Contract>> {
        let _guard = self.lock.lock().await;
        self.read_vec("contracts").await
    }

    pub async fn get_contract(&self, id: &str) -> AppResult<Option<Contract>> {
        let _guard = self.lock.lock().await;
        let contracts: Vec<Contract> = self.read_vec("contracts").await?;
        Ok(contracts.into_iter().find(|c| c.id == id))
    }

    pub async fn upsert_contract(&self, contract: &Contract) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut contracts: Vec<Contract> = self.read_vec("contracts").await?;
        match contracts.iter_mut().find(|c| c.id == contract.id) {
            Some(slot) => *slot = contract.clone(),
            None => contracts.push(contract.clone()),
        }
        self.write_vec("contracts", &contracts).await
    }

    pub async fn delete_contract(&self, id: &str) -> AppResult<bool> {
        let _guard = self.lock.lock().await;
        let mut contracts: Vec<Contract> = self.read_vec("contracts").await?;
        let before = contracts.len();
        contracts.retain(|c| c.id != id);
        let removed = contracts.len() != before;
        if removed {
            self.write_vec("contracts", &contracts).await?;
        }
        Ok(removed)
    }

    pub async fn list_invoices_for_year(&self, year: i32) -> AppResult<Vec<Invoice>> {
        let _guard = self.lock.lock().await;
        let mut invoices: Vec<Invoice> = self.read_vec("invoices").await?;
        invoices.retain(|i| i.issued_at.year() == year);
        invoices.sort_by(|a, b| (a.issued_at, &a.number).cmp(&(b.issued_at, &b.number)));
        Ok(invoices)
    }

    pub async fn get_invoice(&self, number: &str) -> AppResult<Option<Invoice>> {
        let _guard = self.lock.lock().await;
        let invoices: Vec<Invoice> = self.read_vec("invoices").await?;
        Ok(invoices.into_iter().find(|i| i.number == number))
    }

    pub async fn find_invoice_by_key(
        &self,
        contract_id: &str,
        partner_key: &str,
        issued_at: NaiveDate,
    ) -> AppResult<Option<Invoice>> {
        let _guard = self.lock.lock().await;
        let invoices: Vec<Invoice> = self.read_vec("invoices").await?;
        Ok(invoices.into_iter().find(|i| {
            i.contract_id == contract_id
                && i.partner_key() == partner_key
                && i.issued_at == issued_at
        }))
    }

    pub async fn insert_invoice_unique(&self, invoice: &Invoice) -> AppResult<InsertOutcome> {
        let _guard = self.lock.lock().await;
        let mut invoices: Vec<Invoice> = self.read_vec("invoices").await?;
        if let Some(existing) = invoices.iter().find(|i| {
            i.contract_id == invoice.contract_id
                && i.partner_key() == invoice.partner_key()
                && i.issued_at == invoice.issued_at
        }) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        invoices.push(invoice.clone());
        self.write_vec("invoices", &invoices).await?;
        Ok(InsertOutcome::Inserted)
    }

    pub async fn set_invoice_pdf_url(&self, number: &str, pdf_url: &str) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut invoices: Vec<Invoice> = self.read_vec("invoices").await?;
        if let Some(invoice) = invoices.iter_mut().find(|i| i.number == number) {
            invoice.pdf_url = Some(pdf_url.to_string());
            self.write_vec("invoices", &invoices).await?;
        }
        Ok(())
    }

    pub async fn delete_invoice(&self, number: &str) -> AppResult<bool> {
        let _guard = self.lock.lock().await;
        let mut invoices: Vec<Invoice> = self.read_vec("invoices").await?;
        let before = invoices.len();
        invoices.retain(|i| i.number != number);
        let removed = invoices.len() != before;
        if removed {
            self.write_vec("invoices", &invoices).await?;
        }
        Ok(removed)
    }

    pub async fn list_deposits(&self) -> AppResult<Vec<Deposit>> {
        let _guard = self.lock.lock().await;
        self.read_vec("deposits").await
    }

    pub async fn get_deposit(&self, id: &str) -> AppResult<Option<Deposit>> {
        let _guard = self.lock.lock().await;
        let deposits: Vec<Deposit> = self.read_vec("deposits").await?;
        Ok(deposits.into_iter().find(|d| d.id == id))
    }

    pub async fn upsert_deposit(&self, deposit: &Deposit) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut deposits: Vec<Deposit> = self.read_vec("deposits").await?;
        match deposits.iter_mut().find(|d| d.id == deposit.id) {
            Some(slot) => *slot = deposit.clone(),
            None => deposits.push(deposit.clone()),
        }
        self.write_vec("deposits", &deposits).await
    }

    pub async fn delete_deposit(&self, id: &str) -> AppResult<bool> {
        let _guard = self.lock.lock().await;
        let mut deposits: Vec<Deposit> = self.read_vec("deposits").await?;
        let before = deposits.len();
        deposits.retain(|d| d.id != id);
        let removed = deposits.len() != before;
        if removed {
            self.write_vec("deposits", &deposits).await?;
        }
        Ok(removed)
    }

    /// Locked read-modify-write. Safe within this process, not across
    /// processes.
    pub async fn allocate_sequence(
        &self,
        owner_key: &str,
        default_series: &str,
        default_pad_width: usize,
    ) -> AppResult<AllocatedNumber> {
        let _guard = self.lock.lock().await;
        let path = self.path("sequences");
        let mut sequences: BTreeMap<String, SequenceRecord> =
            read_json_or_default(&path).await?;
        let record = sequences
            .entry(owner_key.to_string())
            .or_insert_with(|| SequenceRecord {
                series: default_series.to_string(),
                next_number: 1,
                pad_width: default_pad_width,
                include_year: true,
            });
        let allocated = AllocatedNumber {
            series: record.series.clone(),
            number: record.next_number,
            pad_width: record.pad_width,
            include_year: record.include_year,
        };
        record.next_number += 1;
        write_json(&path, &sequences).await?;
        Ok(allocated)
    }

    pub async fn inflation_series(&self) -> AppResult<Vec<(String, f64)>> {
        let _guard = self.lock.lock().await;
        let months: BTreeMap<String, f64> = read_json_or_default(&self.path("inflation")).await?;
        Ok(months.into_iter().collect())
    }

    pub async fn upsert_inflation_months(&self, months: &[(String, f64)]) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let path = self.path("inflation");
        let mut stored: BTreeMap<String, f64> = read_json_or_default(&path).await?;
        for (month, index_value) in months {
            stored.insert(month.clone(), *index_value);
        }
        write_json(&path, &stored).await
    }

    pub async fn reminder_logged(
        &self,
        contract_id: &str,
        indexing_date: NaiveDate,
        threshold_days: i64,
    ) -> AppResult<bool> {
        let _guard = self.lock.lock().await;
        let records: Vec<ReminderRecord> = self.read_vec("notifications").await?;
        Ok(records.iter().any(|r| {
            r.contract_id == contract_id
                && r.indexing_date == indexing_date
                && r.threshold_days == threshold_days
        }))
    }

    pub async fn log_reminder(
        &self,
        contract_id: &str,
        indexing_date: NaiveDate,
        threshold_days: i64,
    ) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut records: Vec<ReminderRecord> = self.read_vec("notifications").await?;
        let record = ReminderRecord {
            contract_id: contract_id.to_string(),
            indexing_date,
            threshold_days,
        };
        if !records.contains(&record) {
            records.push(record);
            self.write_vec("notifications", &records).await?;
        }
        Ok(())
    }
}

async fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> AppResult<T> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(error) => Err(error.into()),
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
