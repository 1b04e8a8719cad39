use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::NewsSource;
use crate::config::FeedConfig;
use crate::models::NewsItem;

/// Longest summary kept from a feed description, in characters.
const SUMMARY_MAX_CHARS: usize = 280;

pub struct RssFeed {
    label: String,
    url: String,
    client: Client,
}

impl RssFeed {
    pub fn new(feed: &FeedConfig, timeout: Duration) -> Self {
        Self {
            label: feed.label.clone(),
            url: feed.url.clone(),
            client: super::http_client(timeout),
        }
    }
}

#[async_trait]
impl NewsSource for RssFeed {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch_items(&self, limit: usize) -> Result<Vec<NewsItem>> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("{} feed error: {}", self.label, resp.status()));
        }

        let body = resp.text().await?;
        let items = parse_rss_items(&body, &self.label, limit)?;
        debug!("{}: {} items", self.label, items.len());
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    #[serde(default)]
    channel: Option<RssChannel>,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}

/// Extracts up to `limit` items from an RSS document. Items without a title
/// are skipped. Text comes back with XML entities and CDATA already decoded.
pub fn parse_rss_items(xml: &str, source: &str, limit: usize) -> Result<Vec<NewsItem>> {
    let doc: RssDocument = quick_xml::de::from_str(xml)
        .map_err(|e| anyhow!("{} feed is not valid RSS: {}", source, e))?;
    let raw_items = doc.channel.map(|c| c.items).unwrap_or_default();

    let items = raw_items
        .into_iter()
        .filter_map(|item| {
            let title = item.title.as_deref().map(html_to_text).unwrap_or_default();
            if title.is_empty() {
                return None;
            }
            Some(NewsItem {
                title,
                link: item.link.map(|l| l.trim().to_string()).unwrap_or_default(),
                summary: item
                    .description
                    .as_deref()
                    .map(|d| truncate_chars(&html_to_text(d), SUMMARY_MAX_CHARS))
                    .filter(|s| !s.is_empty()),
                published: item.pub_date.map(|d| d.trim().to_string()).filter(|s| !s.is_empty()),
                source: source.to_string(),
            })
        })
        .take(limit)
        .collect();

    Ok(items)
}

/// Descriptions often carry markup once the XML layer is decoded; reduce
/// them to plain text.
fn html_to_text(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let text: Vec<&str> = fragment.root_element().text().collect();
    text.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}…", cut.trim_end())
}
