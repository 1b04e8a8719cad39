use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::alerts::check_thresholds;
use super::gate::{GateOutcome, MemoGate};
use super::news::{collect_news, ITEMS_PER_FEED, MAX_ITEMS};
use super::reconciler::Reconciler;
use crate::analysis::NarrativeScorer;
use crate::config::Config;
use crate::db;
use crate::error::Result;
use crate::fetcher::{DataSource, NewsSource};
use crate::indicators::Registry;
use crate::models::{Alert, IndicatorSet, NewsItem, Snapshot};
use crate::render::{self, PageContent};

/// What a run did, for the caller to report.
#[derive(Debug)]
pub struct RunReport {
    pub indicators: IndicatorSet,
    pub gate: GateOutcome,
    pub alerts: Vec<Alert>,
    pub news: Vec<NewsItem>,
    pub news_refreshed: bool,
}

/// Sources used by one run. Injected so tests can stub the network.
pub struct Sources<'a> {
    pub data: &'a dyn DataSource,
    pub news: &'a [Box<dyn NewsSource>],
}

/// One full update: read state, reconcile, gate the narrative, render,
/// write the page, then persist. Nothing is persisted unless the page write
/// succeeded.
pub async fn run(
    config: &Config,
    registry: &Registry,
    pool: &SqlitePool,
    sources: Sources<'_>,
    now: DateTime<Utc>,
) -> Result<RunReport> {
    // Fail before any network traffic if there is nowhere to publish
    let page = render::read_page(&config.index_path)?;
    let current_month = config.current_month(now);
    info!("🚀 Starting update for {} ({})", current_month, config.local_now(now).format("%Y-%m-%d %H:%M %:z"));

    // 1. Previous state
    let snapshot = db::load_snapshot(pool).await.unwrap_or_else(|e| {
        warn!("Could not read indicator snapshot, continuing without fallback: {}", e);
        Snapshot::default()
    });
    let stored_narrative = db::load_narrative(pool).await.unwrap_or_else(|e| {
        warn!("Could not read stored narrative: {}", e);
        None
    });
    let stored_news = db::load_news(pool).await.unwrap_or_else(|e| {
        warn!("Could not read stored news: {}", e);
        Vec::new()
    });

    // 2. Indicators
    let indicators = Reconciler::new(registry, sources.data).reconcile(&snapshot, current_month).await;

    // 3. Narrative, at most once per month
    let gate = MemoGate::new(NarrativeScorer::new(&config.policy)).resolve(
        stored_narrative,
        current_month,
        &indicators,
        now,
    );

    // 4. Alerts
    let alerts = check_thresholds(registry, &indicators);

    // 5. News, only in the refresh window unless forced
    let (news, news_refreshed) = if config.force_refresh || config.is_refresh_hour(now) {
        let fresh = collect_news(sources.news, ITEMS_PER_FEED, MAX_ITEMS).await;
        if fresh.is_empty() {
            warn!("📰 News refresh produced no items, keeping previous headlines");
            (stored_news, false)
        } else {
            (fresh, true)
        }
    } else {
        info!("📰 Outside refresh window, re-rendering {} stored headlines", stored_news.len());
        (stored_news, false)
    };

    // 6. Render and publish
    let updated_at = config.local_now(now).format("%Y-%m-%d %H:%M (UTC%:z)").to_string();
    let html = render::render_page(
        &page,
        &PageContent {
            registry,
            indicators: &indicators,
            narrative: gate.narrative(),
            news: &news,
            alerts: &alerts,
            updated_at,
        },
    );
    render::write_atomic(&config.index_path, &html)?;
    info!("📝 Wrote {}", config.index_path.display());

    // 7. Persist
    db::save_run(
        pool,
        &indicators,
        gate.to_persist(),
        if news_refreshed { Some(news.as_slice()) } else { None },
    )
    .await?;

    info!(
        "✅ Update complete: narrative {}, {} alerts, {} headlines",
        if gate.is_generated() { "generated" } else { "reused" },
        alerts.len(),
        news.len()
    );

    Ok(RunReport { indicators, gate, alerts, news, news_refreshed })
}
