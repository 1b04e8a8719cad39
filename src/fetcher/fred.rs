use async_trait::async_trait;
use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::DataSource;
use crate::models::{Observation, Period};

const FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

pub struct FredFetcher {
    api_key: String,
    client: Client,
}

impl FredFetcher {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self { api_key, client: super::http_client(timeout) }
    }
}

#[async_trait]
impl DataSource for FredFetcher {
    fn name(&self) -> &str {
        "fred"
    }

    async fn fetch_series(&self, series_id: &str, start: Period) -> Result<Vec<Observation>> {
        let sanitized_key = self.api_key.trim().to_lowercase();

        if sanitized_key.is_empty() {
            return Err(anyhow!("FRED API Key is empty or missing!"));
        }

        if sanitized_key.len() != 32 {
            warn!("FRED API Key length is {}, not 32! This will likely fail.", sanitized_key.len());
        }

        // Monthly frequency with averaging folds daily series (e.g. T10Y2Y)
        // into one value per month.
        let observation_start = start.first_day().format("%Y-%m-%d").to_string();
        let resp = self
            .client
            .get(FRED_BASE_URL)
            .query(&[
                ("series_id", series_id),
                ("api_key", sanitized_key.as_str()),
                ("file_type", "json"),
                ("frequency", "m"),
                ("aggregation_method", "avg"),
                ("observation_start", observation_start.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("FRED API Error: {} - Body: {}", status, error_text));
        }

        let json: Value = resp.json().await?;
        let observations = Self::parse_observations(&json)?;
        debug!("FRED {}: {} observations since {}", series_id, observations.len(), start);
        Ok(observations)
    }
}

impl FredFetcher {
    fn parse_observations(json: &Value) -> Result<Vec<Observation>> {
        let observations = json["observations"]
            .as_array()
            .ok_or_else(|| anyhow!("No observations found in FRED response"))?;

        let mut points = Vec::new();

        for obs in observations {
            // "date": "2023-01-01", "value": "123.45"
            if let (Some(date_str), Some(value_str)) = (obs["date"].as_str(), obs["value"].as_str()) {
                // Handle "." (missing data) which FRED returns sometimes
                if value_str == "." {
                    continue;
                }

                if let Ok(value) = value_str.parse::<f64>() {
                    let period: Period = date_str.parse()?;
                    points.push(Observation { period, value });
                }
            }
        }

        Ok(points)
    }
}
