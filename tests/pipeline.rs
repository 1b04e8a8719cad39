use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use market_brief_lib::config::Config;
use market_brief_lib::core::gate::GateOutcome;
use market_brief_lib::core::orchestrator::{run, Sources};
use market_brief_lib::db;
use market_brief_lib::fetcher::{DataSource, NewsSource};
use market_brief_lib::indicators::Registry;
use market_brief_lib::models::{NewsItem, Observation, Origin, Period};
use market_brief_lib::BriefError;

const PAGE: &str = r#"<html><body>
<h1>Market Brief</h1>
<!-- MACRO_INDICATORS_START -->
<p>placeholder</p>
<!-- MACRO_INDICATORS_END -->
<!-- MACRO_NARRATIVE_START -->
<!-- MACRO_NARRATIVE_END -->
<!-- MARKET_NEWS_CARD_START -->
<!-- MARKET_NEWS_CARD_END -->
<footer>hand-written footer</footer>
</body></html>"#;

// ============================================================================
// STUBS
// ============================================================================

struct StubSource {
    series: HashMap<String, Vec<Observation>>,
}

#[async_trait]
impl DataSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch_series(&self, series_id: &str, _start: Period) -> Result<Vec<Observation>> {
        self.series.get(series_id).cloned().ok_or_else(|| anyhow!("503 for {}", series_id))
    }
}

struct StubFeed {
    calls: Arc<AtomicUsize>,
    titles: Vec<&'static str>,
}

#[async_trait]
impl NewsSource for StubFeed {
    fn label(&self) -> &str {
        "Stub Wire"
    }

    async fn fetch_items(&self, limit: usize) -> Result<Vec<NewsItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .titles
            .iter()
            .take(limit)
            .map(|t| NewsItem {
                title: t.to_string(),
                link: format!("https://wire.example/{}", t.len()),
                summary: Some(format!("{} in detail.", t)),
                published: None,
                source: "Stub Wire".to_string(),
            })
            .collect())
    }
}

fn news_feed(calls: &Arc<AtomicUsize>, titles: Vec<&'static str>) -> Vec<Box<dyn NewsSource>> {
    vec![Box::new(StubFeed { calls: calls.clone(), titles })]
}

// ============================================================================
// FIXTURES
// ============================================================================

/// `count` monthly points ending at `last`, linearly from `from` to `to`.
fn ramp(last: &str, count: usize, from: f64, to: f64) -> Vec<Observation> {
    let last: Period = last.parse().unwrap();
    (0..count)
        .map(|i| {
            let back = (count - 1 - i) as u32;
            let value = from + (to - from) * i as f64 / (count - 1) as f64;
            Observation::new(last.months_back(back), value)
        })
        .collect()
}

/// A calm economy: ~2.5% inflation, 4% unemployment, positive curve.
fn healthy_source(last: &str) -> StubSource {
    let mut series = HashMap::new();
    series.insert("CPIAUCSL".to_string(), ramp(last, 26, 300.0, 315.6));
    series.insert("CPILFESL".to_string(), ramp(last, 26, 310.0, 326.0));
    series.insert("FEDFUNDS".to_string(), ramp(last, 26, 5.3, 4.5));
    series.insert("UNRATE".to_string(), ramp(last, 26, 3.9, 4.0));
    series.insert("PAYEMS".to_string(), ramp(last, 26, 157_000.0, 159_500.0));
    series.insert("T10Y2Y".to_string(), ramp(last, 26, 0.2, 0.6));
    series.insert("RSAFS".to_string(), ramp(last, 26, 700_000.0, 740_000.0));
    series.insert("UMCSENT".to_string(), ramp(last, 26, 70.0, 78.0));
    StubSource { series }
}

fn stressed_source(last: &str) -> StubSource {
    let mut series = HashMap::new();
    series.insert("CPIAUCSL".to_string(), ramp(last, 26, 300.0, 340.0));
    series.insert("UNRATE".to_string(), ramp(last, 26, 4.0, 6.5));
    series.insert("T10Y2Y".to_string(), ramp(last, 26, -0.2, -0.9));
    StubSource { series }
}

fn failing_source() -> StubSource {
    StubSource { series: HashMap::new() }
}

fn config_for(index_path: &Path) -> Config {
    let path = index_path.to_string_lossy().to_string();
    Config::from_lookup(|key| match key {
        "BRIEF_INDEX_PATH" => Some(path.clone()),
        "BRIEF_STATE_URL" => Some("sqlite::memory:".to_string()),
        _ => None,
    })
    .unwrap()
}

/// 07:00 in UTC+9, inside the default refresh window.
fn refresh_hour(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 22, 0, 0).unwrap() - chrono::Duration::days(1)
}

/// 12:00 in UTC+9.
fn midday(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 3, 0, 0).unwrap()
}

async fn setup() -> (tempfile::TempDir, Config, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let index = dir.path().join("index.html");
    std::fs::write(&index, PAGE).unwrap();
    let config = config_for(&index);
    let pool = db::init(&config.state_url).await.unwrap();
    (dir, config, pool)
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn first_run_renders_and_persists_everything() {
    let (_dir, config, pool) = setup().await;
    let registry = Registry::standard();
    let source = healthy_source("2024-04");
    let calls = Arc::new(AtomicUsize::new(0));
    let feeds = news_feed(&calls, vec!["Fed holds rates", "Oil slides"]);

    let report = run(&config, &registry, &pool, Sources { data: &source, news: &feeds }, refresh_hour(2024, 5, 15))
        .await
        .unwrap();

    assert!(report.gate.is_generated());
    assert_eq!(report.gate.narrative().month, Period::new(2024, 5).unwrap());
    assert!(report.news_refreshed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // every key present, PMIs null without a snapshot
    assert_eq!(report.indicators.len(), registry.specs().len());
    assert_eq!(report.indicators.get("unrate").unwrap().origin, Origin::Live);
    assert_eq!(report.indicators.get("pmi_services").unwrap().origin, Origin::Missing);

    let html = std::fs::read_to_string(&config.index_path).unwrap();
    assert!(html.contains("<footer>hand-written footer</footer>"));
    assert!(!html.contains("placeholder"));
    assert!(html.contains("data-key=\"cpi\" data-origin=\"live\""));
    assert!(html.contains("class=\"narrative-card\" data-month=\"2024-05\""));
    assert!(html.contains("KEY ISSUE"));
    assert!(html.contains("Fed holds rates"));

    assert_eq!(db::load_narrative(&pool).await.unwrap().as_ref(), Some(report.gate.narrative()));
    assert_eq!(db::load_news(&pool).await.unwrap().len(), 2);
    assert_eq!(db::load_snapshot(&pool).await.unwrap(), report.indicators);
}

#[tokio::test]
async fn narrative_is_stable_within_a_month() {
    let (_dir, config, pool) = setup().await;
    let registry = Registry::standard();
    let feeds: Vec<Box<dyn NewsSource>> = Vec::new();

    let first = run(
        &config,
        &registry,
        &pool,
        Sources { data: &healthy_source("2024-04"), news: &feeds },
        midday(2024, 5, 2),
    )
    .await
    .unwrap();

    // data deteriorates later in the month
    let second = run(
        &config,
        &registry,
        &pool,
        Sources { data: &stressed_source("2024-04"), news: &feeds },
        midday(2024, 5, 28),
    )
    .await
    .unwrap();

    assert_eq!(second.gate, GateOutcome::Reused(first.gate.narrative().clone()));
    assert_ne!(second.indicators.current("unrate"), first.indicators.current("unrate"));

    // first run of the next month regenerates from current data
    let third = run(
        &config,
        &registry,
        &pool,
        Sources { data: &stressed_source("2024-05"), news: &feeds },
        midday(2024, 6, 1),
    )
    .await
    .unwrap();

    assert!(third.gate.is_generated());
    assert_eq!(third.gate.narrative().month, Period::new(2024, 6).unwrap());
    assert!(third.gate.narrative().score < first.gate.narrative().score);
    assert_eq!(db::load_narrative(&pool).await.unwrap().as_ref(), Some(third.gate.narrative()));
}

#[tokio::test]
async fn failed_fetches_fall_back_to_previous_run() {
    let (_dir, config, pool) = setup().await;
    let registry = Registry::standard();
    let feeds: Vec<Box<dyn NewsSource>> = Vec::new();

    let first = run(&config, &registry, &pool, Sources { data: &healthy_source("2024-04"), news: &feeds }, midday(2024, 5, 2))
        .await
        .unwrap();
    let second = run(&config, &registry, &pool, Sources { data: &failing_source(), news: &feeds }, midday(2024, 5, 3))
        .await
        .unwrap();

    for key in registry.keys().filter(|k| !registry.get(k).unwrap().is_preserved()) {
        let before = first.indicators.get(key).unwrap();
        let after = second.indicators.get(key).unwrap();
        assert_eq!(after.origin, Origin::Fallback, "{}", key);
        assert_eq!(after.series, before.series, "{}", key);
        assert_eq!(after.current, before.current, "{}", key);
        assert_eq!(after.change, before.change, "{}", key);
    }
}

#[tokio::test]
async fn manual_pmi_values_are_carried_forward() {
    let (_dir, config, pool) = setup().await;
    let registry = Registry::standard();
    let feeds: Vec<Box<dyn NewsSource>> = Vec::new();
    let april = Period::new(2024, 4).unwrap();

    db::record_manual_value(&pool, &registry, "pmi_manufacturing", april, 49.2).await.unwrap();

    let report = run(&config, &registry, &pool, Sources { data: &healthy_source("2024-04"), news: &feeds }, midday(2024, 5, 2))
        .await
        .unwrap();

    let pmi = report.indicators.get("pmi_manufacturing").unwrap();
    assert_eq!(pmi.origin, Origin::Preserved);
    assert_eq!(pmi.current, Some(49.2));
    assert!(report.gate.narrative().detail.to_lowercase().contains("business surveys point to contraction"));
}

#[tokio::test]
async fn news_is_only_refetched_in_refresh_window_or_when_forced() {
    let (_dir, config, pool) = setup().await;
    let registry = Registry::standard();
    let source = healthy_source("2024-04");
    let calls = Arc::new(AtomicUsize::new(0));

    let feeds = news_feed(&calls, vec!["Morning headline"]);
    run(&config, &registry, &pool, Sources { data: &source, news: &feeds }, refresh_hour(2024, 5, 15))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // outside the window: stored headlines are re-rendered without fetching
    let feeds = news_feed(&calls, vec!["Noon headline"]);
    let report = run(&config, &registry, &pool, Sources { data: &source, news: &feeds }, midday(2024, 5, 15))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!report.news_refreshed);
    assert_eq!(report.news[0].title, "Morning headline");

    // forced: news refreshes, narrative still memoized
    let forced = config.clone().with_force_refresh(true);
    let report = run(&forced, &registry, &pool, Sources { data: &source, news: &feeds }, midday(2024, 5, 15))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(report.news_refreshed);
    assert_eq!(report.news[0].title, "Noon headline");
    assert!(!report.gate.is_generated());

    let html = std::fs::read_to_string(&config.index_path).unwrap();
    assert!(html.contains("Noon headline"));
    assert!(!html.contains("Morning headline"));
}

#[tokio::test]
async fn missing_page_aborts_without_touching_state() {
    let (dir, config, pool) = setup().await;
    let registry = Registry::standard();
    let feeds: Vec<Box<dyn NewsSource>> = Vec::new();
    std::fs::remove_file(dir.path().join("index.html")).unwrap();

    let err = run(&config, &registry, &pool, Sources { data: &healthy_source("2024-04"), news: &feeds }, midday(2024, 5, 2))
        .await
        .unwrap_err();

    assert!(matches!(err, BriefError::OutputMissing(_)));
    assert!(db::load_narrative(&pool).await.unwrap().is_none());
    assert!(db::load_snapshot(&pool).await.unwrap().is_empty());
}
