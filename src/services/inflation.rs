//! Euro-area HICP inflation lookup with tiered fallback.
//!
//! Resolution order: the database cache, the primary remote source
//! (Eurostat), the secondary remote source (ECB), and finally a bundled
//! static table. Remote results are cached per month. Every tier can fail;
//! the caller receives `None` only after all four are exhausted.
//!
//! The percent is computed over a requested `[from, to]` month window, so a
//! historical indexing period resolves against the same series as the
//! current one. Sources disagree on what they publish: some return the HICP
//! index itself, some a pre-computed annual rate series. Values are treated
//! as rates when every entry in the window fits in [-50, 50] (no index
//! series ever dips that low), and as index levels otherwise.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::store::Store;

/// Inflation percent over the `[from, to]` month window (`"YYYY-MM"` keys).
///
/// Rate series: average of the window's entries. Index series: ratio of the
/// window's last entry against its first (year-over-year when the window
/// spans twelve months).
pub fn percent_from_series(series: &BTreeMap<String, f64>, from: &str, to: &str) -> Option<f64> {
    if to < from {
        return None;
    }
    let window: Vec<f64> = series
        .range::<str, _>((Bound::Included(from), Bound::Included(to)))
        .map(|(_, value)| *value)
        .collect();
    if window.is_empty() {
        return None;
    }
    if window.iter().all(|v| (-50.0..=50.0).contains(v)) {
        return Some(window.iter().sum::<f64>() / window.len() as f64);
    }

    let first = *window.first()?;
    let last = *window.last()?;
    if first == 0.0 {
        return None;
    }
    Some((last / first - 1.0) * 100.0)
}

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Euro-area inflation over `[from, to]`, through the fallback tiers.
pub async fn get_euro_inflation_percent(
    store: &Store,
    client: &reqwest::Client,
    config: &AppConfig,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Option<f64>> {
    let from_key = month_key(from);
    let to_key = month_key(to);

    let cached: BTreeMap<String, f64> = store.inflation_series().await?.into_iter().collect();
    if series_covers(&cached, &from_key, &to_key) {
        if let Some(percent) = percent_from_series(&cached, &from_key, &to_key) {
            return Ok(Some(percent));
        }
    }

    let timeout = Duration::from_secs(config.hicp_fetch_timeout_seconds);
    for url in [&config.hicp_primary_url, &config.hicp_fallback_url] {
        if let Some(series) = fetch_series(client, url, timeout).await {
            let months: Vec<(String, f64)> =
                series.iter().map(|(m, v)| (m.clone(), *v)).collect();
            store.upsert_inflation_months(&months).await?;
            if let Some(percent) = percent_from_series(&series, &from_key, &to_key) {
                return Ok(Some(percent));
            }
        }
    }

    let bundled: BTreeMap<String, f64> = STATIC_HICP
        .iter()
        .map(|(month, value)| (month.to_string(), *value))
        .collect();
    Ok(percent_from_series(&bundled, &from_key, &to_key))
}

/// A cached series is usable for a window when it reaches back to `from` and
/// its newest month is at most three months short of `to` (publication lag).
fn series_covers(series: &BTreeMap<String, f64>, from: &str, to: &str) -> bool {
    let (Some(first), Some(last)) = (series.keys().next(), series.keys().next_back()) else {
        return false;
    };
    let (Some(first_idx), Some(last_idx), Some(from_idx), Some(to_idx)) = (
        month_index(first),
        month_index(last),
        month_index(from),
        month_index(to),
    ) else {
        return false;
    };
    first_idx <= from_idx && last_idx + 3 >= to_idx
}

fn month_index(key: &str) -> Option<i32> {
    let (year, month) = parse_month_key(key)?;
    Some(year * 12 + month as i32 - 1)
}

fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let (year, month) = key.split_once('-')?;
    Some((year.parse().ok()?, month.parse().ok()?))
}

async fn fetch_series(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Option<BTreeMap<String, f64>> {
    let response = match client.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(%url, error = %error, "Inflation source unreachable");
            return None;
        }
    };
    if !response.status().is_success() {
        tracing::warn!(%url, status = %response.status(), "Inflation source returned an error");
        return None;
    }
    let body: Value = match response.json().await {
        Ok(body) => body,
        Err(error) => {
            tracing::warn!(%url, error = %error, "Inflation payload is not JSON");
            return None;
        }
    };
    let series = parse_jsonstat(&body)
        .or_else(|| parse_sdmx_json(&body))
        .unwrap_or_default();
    if series.is_empty() {
        tracing::warn!(%url, "Inflation payload had no usable observations");
        None
    } else {
        Some(series)
    }
}

/// Eurostat JSON-stat: `dimension.time.category.index` maps month labels to
/// positions in the flat `value` map.
fn parse_jsonstat(body: &Value) -> Option<BTreeMap<String, f64>> {
    let index = body
        .get("dimension")?
        .get("time")?
        .get("category")?
        .get("index")?
        .as_object()?;
    let values = body.get("value")?.as_object()?;
    let mut series = BTreeMap::new();
    for (label, position) in index {
        let position = position.as_u64()?;
        if let Some(value) = values.get(&position.to_string()).and_then(Value::as_f64) {
            series.insert(normalize_month_label(label)?, value);
        }
    }
    Some(series)
}

/// ECB SDMX-JSON: observation ids live under `structure.dimensions`, values
/// under the single series' `observations`.
fn parse_sdmx_json(body: &Value) -> Option<BTreeMap<String, f64>> {
    let observation_values = body
        .get("structure")?
        .get("dimensions")?
        .get("observation")?
        .get(0)?
        .get("values")?
        .as_array()?;
    let series_map = body
        .get("dataSets")?
        .get(0)?
        .get("series")?
        .as_object()?;
    let observations = series_map.values().next()?.get("observations")?.as_object()?;

    let mut series = BTreeMap::new();
    for (position, observation) in observations {
        let position: usize = position.parse().ok()?;
        let label = observation_values.get(position)?.get("id")?.as_str()?;
        let value = observation.get(0)?.as_f64()?;
        series.insert(normalize_month_label(label)?, value);
    }
    Some(series)
}

/// Accepts `2024-01` and `2024M01`, yields `2024-01`.
fn normalize_month_label(label: &str) -> Option<String> {
    let normalized = label.replace('M', "-");
    let (year, month) = parse_month_key(&normalized)?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(format!("{year:04}-{month:02}"))
}

/// Euro-area HICP (2015=100), the last-resort tier when every live source is
/// down. Stale data beats no data for an indexation estimate.
const STATIC_HICP: &[(&str, f64)] = &[
    ("2023-01", 120.2),
    ("2023-02", 121.2),
    ("2023-03", 122.3),
    ("2023-04", 123.0),
    ("2023-05", 123.1),
    ("2023-06", 123.4),
    ("2023-07", 123.3),
    ("2023-08", 123.9),
    ("2023-09", 124.3),
    ("2023-10", 124.4),
    ("2023-11", 123.7),
    ("2023-12", 123.9),
    ("2024-01", 123.5),
    ("2024-02", 124.2),
    ("2024-03", 125.2),
    ("2024-04", 126.0),
    ("2024-05", 126.3),
    ("2024-06", 126.5),
    ("2024-07", 126.5),
    ("2024-08", 126.7),
    ("2024-09", 126.6),
    ("2024-10", 127.0),
    ("2024-11", 126.7),
    ("2024-12", 127.2),
    ("2025-01", 126.9),
    ("2025-02", 127.4),
    ("2025-03", 128.2),
    ("2025-04", 128.9),
    ("2025-05", 129.2),
    ("2025-06", 129.3),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn series(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries
            .iter()
            .map(|(month, value)| (month.to_string(), *value))
            .collect()
    }

    #[test]
    fn rate_series_averages_the_window() {
        let mut entries = Vec::new();
        for month in 1..=12 {
            entries.push((format!("2024-{month:02}"), 2.0));
        }
        for month in 1..=6 {
            entries.push((format!("2025-{month:02}"), 4.0));
        }
        let series: BTreeMap<String, f64> = entries.into_iter().collect();
        // Trailing year: six entries at 4.0, six at 2.0.
        assert_eq!(
            percent_from_series(&series, "2024-07", "2025-06"),
            Some(3.0)
        );
        // A window entirely inside 2024 averages the flat 2.0.
        assert_eq!(
            percent_from_series(&series, "2024-01", "2024-12"),
            Some(2.0)
        );
    }

    #[test]
    fn index_series_ratio_uses_window_endpoints() {
        let s = series(&[
            ("2024-05", 120.0),
            ("2024-06", 121.0),
            ("2025-05", 126.0),
            ("2025-06", 127.05),
        ]);
        let percent = percent_from_series(&s, "2024-06", "2025-06").unwrap();
        assert!((percent - 5.0).abs() < 1e-9);
    }

    #[test]
    fn historical_window_selects_its_own_endpoints() {
        let s = series(&[
            ("2023-06", 110.0),
            ("2024-06", 121.0),
            ("2025-06", 127.05),
        ]);
        let older = percent_from_series(&s, "2023-06", "2024-06").unwrap();
        let newer = percent_from_series(&s, "2024-06", "2025-06").unwrap();
        assert!((older - 10.0).abs() < 1e-9);
        assert!((newer - 5.0).abs() < 1e-9);
        assert_ne!(older, newer);
    }

    #[test]
    fn window_without_data_is_none() {
        let s = series(&[("2025-05", 126.0), ("2025-06", 127.0)]);
        assert_eq!(percent_from_series(&s, "2023-01", "2023-12"), None);
        assert_eq!(percent_from_series(&BTreeMap::new(), "2024-01", "2024-12"), None);
        // Inverted window.
        assert_eq!(percent_from_series(&s, "2025-06", "2025-05"), None);
    }

    #[test]
    fn bundled_table_resolves() {
        let bundled: BTreeMap<String, f64> = STATIC_HICP
            .iter()
            .map(|(month, value)| (month.to_string(), *value))
            .collect();
        let percent = percent_from_series(&bundled, "2024-06", "2025-06").unwrap();
        assert!(percent > 0.0 && percent < 10.0);
    }

    #[test]
    fn month_labels_normalize() {
        assert_eq!(normalize_month_label("2024-03").as_deref(), Some("2024-03"));
        assert_eq!(normalize_month_label("2024M03").as_deref(), Some("2024-03"));
        assert_eq!(normalize_month_label("2024M13"), None);
    }

    #[test]
    fn coverage_requires_reach_and_recency() {
        let mut entries = Vec::new();
        for month in 1..=12 {
            entries.push((format!("2024-{month:02}"), 120.0 + month as f64));
        }
        entries.push(("2025-06".to_string(), 129.0));
        let s: BTreeMap<String, f64> = entries.clone().into_iter().collect();
        assert!(series_covers(&s, "2024-06", "2025-08"));

        // Window reaching back before the series starts.
        assert!(!series_covers(&s, "2023-06", "2025-06"));

        // Newest month more than three months short of the window end.
        assert!(!series_covers(&s, "2024-06", "2025-11"));
    }

    #[test]
    fn month_keys_format() {
        let date: NaiveDate = "2025-03-09".parse().unwrap();
        assert_eq!(month_key(date), "2025-03");
    }

    #[test]
    fn parses_eurostat_jsonstat() {
        let body = serde_json::json!({
            "dimension": {"time": {"category": {"index": {"2024-01": 0, "2024-02": 1}}}},
            "value": {"0": 123.5, "1": 124.2}
        });
        let series = parse_jsonstat(&body).unwrap();
        assert_eq!(series.get("2024-01"), Some(&123.5));
        assert_eq!(series.get("2024-02"), Some(&124.2));
    }

    #[test]
    fn parses_ecb_sdmx_json() {
        let body = serde_json::json!({
            "structure": {"dimensions": {"observation": [
                {"values": [{"id": "2024-01"}, {"id": "2024-02"}]}
            ]}},
            "dataSets": [{"series": {"0:0:0:0:0:0": {"observations": {
                "0": [123.5], "1": [124.2]
            }}}}]
        });
        let series = parse_sdmx_json(&body).unwrap();
        assert_eq!(series.get("2024-01"), Some(&123.5));
        assert_eq!(series.get("2024-02"), Some(&124.2));
    }
}
