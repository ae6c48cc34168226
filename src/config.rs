use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub environment: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst_size: u32,
    pub database_url: Option<String>,
    pub db_pool_max_connections: u32,
    pub db_pool_min_connections: u32,
    pub db_pool_acquire_timeout_seconds: u64,
    /// Directory for the local JSON fallback store when no database is set.
    pub data_dir: String,
    pub internal_api_key: Option<String>,
    pub invoices_cache_ttl_seconds: u64,
    pub hicp_primary_url: String,
    pub hicp_fallback_url: String,
    pub hicp_fetch_timeout_seconds: u64,
    pub scheduler_enabled: bool,
    pub invoice_series_pad_width: usize,
    pub app_public_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            app_name: env_or("APP_NAME", "Chiria API"),
            environment: env_or("ENVIRONMENT", "development"),
            api_prefix: normalize_prefix(&env_or("API_PREFIX", "/v1")),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse_or("PORT", 8000),
            cors_origins: parse_csv(&env_or("CORS_ORIGINS", "http://localhost:3000")),
            rate_limit_per_second: env_parse_or("RATE_LIMIT_PER_SECOND", 10),
            rate_limit_burst_size: env_parse_or("RATE_LIMIT_BURST_SIZE", 100),
            database_url: env_opt("DATABASE_URL"),
            db_pool_max_connections: env_parse_or("DB_POOL_MAX_CONNECTIONS", 5),
            db_pool_min_connections: env_parse_or("DB_POOL_MIN_CONNECTIONS", 1),
            db_pool_acquire_timeout_seconds: env_parse_or("DB_POOL_ACQUIRE_TIMEOUT_SECONDS", 5),
            data_dir: env_or("DATA_DIR", "./data"),
            internal_api_key: env_opt("INTERNAL_API_KEY"),
            invoices_cache_ttl_seconds: env_parse_or("INVOICES_CACHE_TTL_SECONDS", 20),
            hicp_primary_url: env_or(
                "HICP_PRIMARY_URL",
                "https://ec.europa.eu/eurostat/api/dissemination/sdmx/2.1/data/prc_hicp_midx?format=JSON&unit=I15&coicop=CP00&geo=EA",
            ),
            hicp_fallback_url: env_or(
                "HICP_FALLBACK_URL",
                "https://data-api.ecb.europa.eu/service/data/ICP/M.U2.N.000000.4.INX?format=jsondata&lastNObservations=36",
            ),
            hicp_fetch_timeout_seconds: env_parse_or("HICP_FETCH_TIMEOUT_SECONDS", 5),
            scheduler_enabled: env_parse_bool_or("SCHEDULER_ENABLED", true),
            invoice_series_pad_width: env_parse_or("INVOICE_SERIES_PAD_WIDTH", 3),
            app_public_url: env_or("APP_PUBLIC_URL", "http://localhost:3000"),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_parse_bool_or(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase) {
        Some(value) if value == "1" || value == "true" || value == "yes" || value == "on" => true,
        Some(value) if value == "0" || value == "false" || value == "no" || value == "off" => false,
        Some(_) => default,
        None => default,
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn normalize_prefix(raw: &str) -> String {
    let mut prefix = raw.trim().to_string();
    if prefix.is_empty() {
        return "/v1".to_string();
    }
    if !prefix.starts_with('/') {
        prefix.insert(0, '/');
    }
    while prefix.ends_with('/') && prefix.len() > 1 {
        prefix.pop();
    }
    prefix
}
