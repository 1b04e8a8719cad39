use chrono::{DateTime, FixedOffset, Timelike, Utc};
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::time::Duration;

use crate::analysis::bands::ScoringPolicy;
use crate::error::{BriefError, Result};
use crate::models::Period;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub label: String,
    pub url: String,
}

static DEFAULT_FEEDS: Lazy<Vec<FeedConfig>> = Lazy::new(|| {
    vec![
        FeedConfig {
            label: "CNBC".to_string(),
            url: "https://www.cnbc.com/id/100003114/device/rss/rss.html".to_string(),
        },
        FeedConfig {
            label: "MarketWatch".to_string(),
            url: "https://feeds.content.dowjones.io/public/rss/mw_topstories".to_string(),
        },
        FeedConfig {
            label: "Yahoo Finance".to_string(),
            url: "https://finance.yahoo.com/news/rssindex".to_string(),
        },
    ]
});

/// Runtime configuration, read once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub fred_api_key: String,
    pub index_path: PathBuf,
    pub state_url: String,
    pub refresh_hours: Vec<u32>,
    pub utc_offset: FixedOffset,
    pub http_timeout: Duration,
    pub news_feeds: Vec<FeedConfig>,
    pub policy: ScoringPolicy,
    pub force_refresh: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fred_api_key = lookup("FRED_API_KEY").unwrap_or_default().trim().to_string();

        let index_path = PathBuf::from(
            lookup("BRIEF_INDEX_PATH").unwrap_or_else(|| "index.html".to_string()),
        );

        let state_url = lookup("BRIEF_STATE_URL")
            .unwrap_or_else(|| "sqlite://data/brief.db?mode=rwc".to_string());

        let refresh_hours = match lookup("BRIEF_REFRESH_HOURS") {
            Some(raw) => parse_hours(&raw)?,
            None => vec![7],
        };

        let offset_hours: i32 = match lookup("BRIEF_UTC_OFFSET_HOURS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                BriefError::Config(format!("BRIEF_UTC_OFFSET_HOURS is not an integer: '{}'", raw))
            })?,
            None => 9,
        };
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            BriefError::Config(format!("BRIEF_UTC_OFFSET_HOURS out of range: {}", offset_hours))
        })?;

        let timeout_secs: u64 = match lookup("BRIEF_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                BriefError::Config(format!("BRIEF_HTTP_TIMEOUT_SECS is not a number: '{}'", raw))
            })?,
            None => 15,
        };

        let news_feeds = match lookup("BRIEF_NEWS_FEEDS") {
            Some(raw) => parse_feeds(&raw)?,
            None => DEFAULT_FEEDS.clone(),
        };

        let policy = match lookup("BRIEF_POLICY_PATH") {
            Some(path) => {
                let text = std::fs::read_to_string(&path)?;
                serde_json::from_str(&text)?
            }
            None => ScoringPolicy::default(),
        };
        policy.validate()?;

        Ok(Self {
            fred_api_key,
            index_path,
            state_url,
            refresh_hours,
            utc_offset,
            http_timeout: Duration::from_secs(timeout_secs),
            news_feeds,
            policy,
            force_refresh: false,
        })
    }

    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn local_now(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.utc_offset)
    }

    pub fn current_month(&self, now: DateTime<Utc>) -> Period {
        Period::from_date(self.local_now(now).date_naive())
    }

    pub fn is_refresh_hour(&self, now: DateTime<Utc>) -> bool {
        self.refresh_hours.contains(&self.local_now(now).hour())
    }
}

fn parse_hours(raw: &str) -> Result<Vec<u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u32>() {
            Ok(h) if h < 24 => Ok(h),
            _ => Err(BriefError::Config(format!("invalid refresh hour '{}'", s))),
        })
        .collect()
}

/// `Label|url,Label|url`
fn parse_feeds(raw: &str) -> Result<Vec<FeedConfig>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (label, url) = entry.split_once('|').ok_or_else(|| {
                BriefError::Config(format!("feed entry '{}' must be 'Label|url'", entry))
            })?;
            Ok(FeedConfig { label: label.trim().to_string(), url: url.trim().to_string() })
        })
        .collect()
}
