use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;
use crate::domain::Invoice;
use crate::error::{AppError, AppResult};
use crate::services::events::EventBus;
use crate::store::{files::FileStore, postgres::PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Store,
    pub http_client: reqwest::Client,
    /// Invoices grouped by issue year; short TTL plus explicit invalidation
    /// after every issue/delete.
    pub invoices_cache: Cache<i32, Arc<Vec<Invoice>>>,
    pub events: EventBus,
}

impl AppState {
    pub fn build(config: AppConfig) -> AppResult<Self> {
        let store = match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.db_pool_max_connections)
                    .min_connections(config.db_pool_min_connections)
                    .acquire_timeout(Duration::from_secs(config.db_pool_acquire_timeout_seconds))
                    .connect_lazy(url)
                    .map_err(|e| AppError::Dependency(format!("Invalid DATABASE_URL: {e}")))?;
                Store::Pg(PgStore::new(pool))
            }
            None => {
                tracing::warn!(
                    data_dir = %config.data_dir,
                    "No DATABASE_URL configured, using the local file store"
                );
                Store::Files(FileStore::new(config.data_dir.clone()))
            }
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client init failed: {e}")))?;

        let invoices_cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(Duration::from_secs(config.invoices_cache_ttl_seconds.max(1)))
            .build();

        Ok(Self {
            config: Arc::new(config),
            store,
            http_client,
            invoices_cache,
            events: EventBus::default(),
        })
    }

    /// Invoices issued in `year`, served from the cache when warm.
    pub async fn invoices_for_year(&self, year: i32) -> AppResult<Arc<Vec<Invoice>>> {
        let store = self.store.clone();
        self.invoices_cache
            .try_get_with(year, async move {
                store.list_invoices_for_year(year).await.map(Arc::new)
            })
            .await
            .map_err(|error: Arc<AppError>| AppError::Dependency(error.to_string()))
    }

    pub async fn invalidate_invoices_year(&self, year: i32) {
        self.invoices_cache.invalidate(&year).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_config() -> AppConfig {
        AppConfig {
            app_name: "Chiria API".into(),
            environment: "test".into(),
            api_prefix: "/v1".into(),
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            rate_limit_per_second: 10,
            rate_limit_burst_size: 100,
            database_url: None,
            db_pool_max_connections: 1,
            db_pool_min_connections: 0,
            db_pool_acquire_timeout_seconds: 1,
            data_dir: std::env::temp_dir()
                .join(format!("chiria-state-{}", uuid::Uuid::new_v4()))
                .to_string_lossy()
                .into_owned(),
            internal_api_key: None,
            invoices_cache_ttl_seconds: 3600,
            hicp_primary_url: String::new(),
            hicp_fallback_url: String::new(),
            hicp_fetch_timeout_seconds: 1,
            scheduler_enabled: false,
            invoice_series_pad_width: 3,
            app_public_url: "http://localhost:3000".into(),
        }
    }

    fn invoice(number: &str, issued_at: &str) -> Invoice {
        Invoice {
            id: number.into(),
            number: number.into(),
            contract_id: "c1".into(),
            contract_name: "Unit 4".into(),
            owner_id: "o1".into(),
            owner_name: "Imob SRL".into(),
            partner_id: None,
            partner_name: "Acme SRL".into(),
            issued_at: issued_at.parse().unwrap(),
            due_days: 30,
            amount_eur: 1000.0,
            correction_percent: 0.0,
            corrected_amount_eur: 1000.0,
            exchange_rate_ron: 4.97,
            net_ron: 4970.0,
            tva_percent: 19.0,
            vat_ron: 944.3,
            total_ron: 5914.3,
            pdf_url: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn invalidation_makes_writes_visible() {
        let state = AppState::build(test_config()).unwrap();
        state.store.ensure_schema().await.unwrap();

        state
            .store
            .insert_invoice_unique(&invoice("N-1", "2025-04-01"))
            .await
            .unwrap();
        assert_eq!(state.invoices_for_year(2025).await.unwrap().len(), 1);

        // A write behind a warm cache is invisible until invalidation.
        state
            .store
            .insert_invoice_unique(&invoice("N-2", "2025-05-01"))
            .await
            .unwrap();
        assert_eq!(state.invoices_for_year(2025).await.unwrap().len(), 1);

        state.invalidate_invoices_year(2025).await;
        assert_eq!(state.invoices_for_year(2025).await.unwrap().len(), 2);
    }
}
