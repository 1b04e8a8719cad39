use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::models::{NewsItem, Observation, Period};

pub mod fred;
pub mod rss;

/// A provider of numeric monthly series.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the raw series from `start` onwards, oldest first.
    async fn fetch_series(&self, series_id: &str, start: Period) -> Result<Vec<Observation>>;
}

/// A provider of headline records.
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn label(&self) -> &str;

    async fn fetch_items(&self, limit: usize) -> Result<Vec<NewsItem>>;
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("MarketBrief/1.0")
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
