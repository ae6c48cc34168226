use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::domain::{Contract, Deposit, Invoice};
use crate::error::{AppError, AppResult};
use crate::store::{AllocatedNumber, InsertOutcome};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contracts (
    id TEXT PRIMARY KEY,
    doc JSONB NOT NULL
);
CREATE TABLE IF NOT EXISTS invoices (
    number TEXT PRIMARY KEY,
    contract_id TEXT NOT NULL,
    partner_key TEXT NOT NULL,
    issued_at DATE NOT NULL,
    doc JSONB NOT NULL,
    UNIQUE (contract_id, partner_key, issued_at)
);
CREATE TABLE IF NOT EXISTS invoice_sequences (
    owner_key TEXT PRIMARY KEY,
    series TEXT NOT NULL,
    next_number BIGINT NOT NULL,
    pad_width INT NOT NULL,
    include_year BOOLEAN NOT NULL DEFAULT TRUE
);
CREATE TABLE IF NOT EXISTS deposits (
    id TEXT PRIMARY KEY,
    doc JSONB NOT NULL
);
CREATE TABLE IF NOT EXISTS inflation_cache (
    month TEXT PRIMARY KEY,
    index_value DOUBLE PRECISION NOT NULL,
    fetched_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS notification_log (
    contract_id TEXT NOT NULL,
    indexing_date DATE NOT NULL,
    threshold_days INT NOT NULL,
    notified_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (contract_id, indexing_date, threshold_days)
);
"#;

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> AppResult<()> {
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(map_db_error)?;
        }
        Ok(())
    }

    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    pub async fn list_contracts(&self) -> AppResult<Vec<Contract>> {
        let rows = sqlx::query("SELECT doc FROM contracts ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.into_iter().map(|row| decode_doc(&row)).collect()
    }

    pub async fn get_contract(&self, id: &str) -> AppResult<Option<Contract>> {
        let row = sqlx::query("SELECT doc FROM contracts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.map(|row| decode_doc(&row)).transpose()
    }

    pub async fn upsert_contract(&self, contract: &Contract) -> AppResult<()> {
        let doc = serde_json::to_value(contract)?;
        sqlx::query(
            "INSERT INTO contracts (id, doc) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
        )
        .bind(&contract.id)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    pub async fn delete_contract(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_invoices_for_year(&self, year: i32) -> AppResult<Vec<Invoice>> {
        let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
            return Ok(Vec::new());
        };
        let Some(next) = NaiveDate::from_ymd_opt(year + 1, 1, 1) else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query(
            "SELECT doc FROM invoices WHERE issued_at >= $1 AND issued_at < $2
             ORDER BY issued_at, number",
        )
        .bind(first)
        .bind(next)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        rows.into_iter().map(|row| decode_doc(&row)).collect()
    }

    pub async fn get_invoice(&self, number: &str) -> AppResult<Option<Invoice>> {
        let row = sqlx::query("SELECT doc FROM invoices WHERE number = $1")
            .bind(number)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.map(|row| decode_doc(&row)).transpose()
    }

    pub async fn find_invoice_by_key(
        &self,
        contract_id: &str,
        partner_key: &str,
        issued_at: NaiveDate,
    ) -> AppResult<Option<Invoice>> {
        let row = sqlx::query(
            "SELECT doc FROM invoices
             WHERE contract_id = $1 AND partner_key = $2 AND issued_at = $3",
        )
        .bind(contract_id)
        .bind(partner_key)
        .bind(issued_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        row.map(|row| decode_doc(&row)).transpose()
    }

    /// Insert honoring the `(contract, partner, issued_at)` unique key.
    /// A conflicting insert returns the already-stored invoice instead of
    /// failing, which makes issuance idempotent under races.
    pub async fn insert_invoice_unique(&self, invoice: &Invoice) -> AppResult<InsertOutcome> {
        let doc = serde_json::to_value(invoice)?;
        let result = sqlx::query(
            "INSERT INTO invoices (number, contract_id, partner_key, issued_at, doc)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (contract_id, partner_key, issued_at) DO NOTHING",
        )
        .bind(&invoice.number)
        .bind(&invoice.contract_id)
        .bind(invoice.partner_key())
        .bind(invoice.issued_at)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() > 0 {
            return Ok(InsertOutcome::Inserted);
        }
        let existing = self
            .find_invoice_by_key(&invoice.contract_id, &invoice.partner_key(), invoice.issued_at)
            .await?
            .ok_or_else(|| {
                AppError::Internal("Invoice conflict without a stored counterpart.".to_string())
            })?;
        Ok(InsertOutcome::Existing(existing))
    }

    pub async fn set_invoice_pdf_url(&self, number: &str, pdf_url: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE invoices SET doc = jsonb_set(doc, '{pdfUrl}', to_jsonb($2::text))
             WHERE number = $1",
        )
        .bind(number)
        .bind(pdf_url)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    pub async fn delete_invoice(&self, number: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM invoices WHERE number = $1")
            .bind(number)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_deposits(&self) -> AppResult<Vec<Deposit>> {
        let rows = sqlx::query("SELECT doc FROM deposits ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.into_iter().map(|row| decode_doc(&row)).collect()
    }

    pub async fn get_deposit(&self, id: &str) -> AppResult<Option<Deposit>> {
        let row = sqlx::query("SELECT doc FROM deposits WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.map(|row| decode_doc(&row)).transpose()
    }

    pub async fn upsert_deposit(&self, deposit: &Deposit) -> AppResult<()> {
        let doc = serde_json::to_value(deposit)?;
        sqlx::query(
            "INSERT INTO deposits (id, doc) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
        )
        .bind(&deposit.id)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    pub async fn delete_deposit(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM deposits WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    /// Single-statement read-and-increment. Seeding inserts `next_number = 2`
    /// so the first allocation comes back as 1; the RETURNING clause always
    /// reports the number just handed out. Concurrent callers each get a
    /// distinct number because the upsert serializes on the row lock.
    pub async fn allocate_sequence(
        &self,
        owner_key: &str,
        default_series: &str,
        default_pad_width: usize,
    ) -> AppResult<AllocatedNumber> {
        let row = sqlx::query(
            "INSERT INTO invoice_sequences (owner_key, series, next_number, pad_width, include_year)
             VALUES ($1, $2, 2, $3, TRUE)
             ON CONFLICT (owner_key)
             DO UPDATE SET next_number = invoice_sequences.next_number + 1
             RETURNING series, next_number - 1 AS allocated, pad_width, include_year",
        )
        .bind(owner_key)
        .bind(default_series)
        .bind(default_pad_width as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(AllocatedNumber {
            series: row.try_get("series").map_err(map_db_error)?,
            number: row.try_get("allocated").map_err(map_db_error)?,
            pad_width: row.try_get::<i32, _>("pad_width").map_err(map_db_error)? as usize,
            include_year: row.try_get("include_year").map_err(map_db_error)?,
        })
    }

    pub async fn inflation_series(&self) -> AppResult<Vec<(String, f64)>> {
        let rows = sqlx::query("SELECT month, index_value FROM inflation_cache ORDER BY month")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.into_iter()
            .map(|row| {
                Ok((
                    row.try_get("month").map_err(map_db_error)?,
                    row.try_get("index_value").map_err(map_db_error)?,
                ))
            })
            .collect()
    }

    pub async fn upsert_inflation_months(&self, months: &[(String, f64)]) -> AppResult<()> {
        for (month, index_value) in months {
            sqlx::query(
                "INSERT INTO inflation_cache (month, index_value, fetched_at)
                 VALUES ($1, $2, now())
                 ON CONFLICT (month) DO UPDATE
                 SET index_value = EXCLUDED.index_value, fetched_at = now()",
            )
            .bind(month)
            .bind(index_value)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        }
        Ok(())
    }

    pub async fn reminder_logged(
        &self,
        contract_id: &str,
        indexing_date: NaiveDate,
        threshold_days: i64,
    ) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT 1 AS hit FROM notification_log
             WHERE contract_id = $1 AND indexing_date = $2 AND threshold_days = $3",
        )
        .bind(contract_id)
        .bind(indexing_date)
        .bind(threshold_days as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row.is_some())
    }

    pub async fn log_reminder(
        &self,
        contract_id: &str,
        indexing_date: NaiveDate,
        threshold_days: i64,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notification_log (contract_id, indexing_date, threshold_days)
             VALUES ($1, $2, $3)
             ON CONFLICT (contract_id, indexing_date, threshold_days) DO NOTHING",
        )
        .bind(contract_id)
        .bind(indexing_date)
        .bind(threshold_days as i32)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }
}

fn decode_doc<T: serde::de::DeserializeOwned>(row: &sqlx::postgres::PgRow) -> AppResult<T> {
    let doc: Value = row.try_get("doc").map_err(map_db_error)?;
    Ok(serde_json::from_value(doc)?)
}

fn map_db_error(error: sqlx::Error) -> AppError {
    let message = error.to_string();
    tracing::error!(db_error = %message, "Database query failed");

    if message.contains("23505")
        || message
            .to_ascii_lowercase()
            .contains("duplicate key value violates unique constraint")
    {
        return AppError::Conflict("Duplicate value violates a unique constraint.".to_string());
    }
    AppError::Dependency("Database operation failed.".to_string())
}
