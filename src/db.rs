use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{BriefError, Result};
use crate::indicators::transform::trim_window;
use crate::indicators::Registry;
use crate::models::{
    Indicator, IndicatorSet, Narrative, NewsItem, Observation, Origin, Period, Regime, Snapshot,
};

/// Settings key holding the last fetched news list as JSON.
pub const NEWS_SNAPSHOT_KEY: &str = "NEWS_SNAPSHOT";

/// Opens the state store and brings its schema up to date. A single
/// connection is enough for one sequential run and keeps `sqlite::memory:`
/// databases alive for the lifetime of the pool.
pub async fn init(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to state store: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    ensure_parent_dir(&options)?;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    debug!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

fn ensure_parent_dir(options: &SqliteConnectOptions) -> Result<()> {
    let filename = options.get_filename();
    if filename.as_os_str() == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = filename.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// ============================================================================
// READS
// ============================================================================

pub async fn load_snapshot(pool: &SqlitePool) -> Result<Snapshot> {
    let rows = sqlx::query(
        "SELECT key, series, current, previous, change, origin FROM indicator_state ORDER BY key",
    )
    .fetch_all(pool)
    .await?;

    let mut snapshot = Snapshot::default();
    for row in rows {
        let series_json: String = row.try_get("series")?;
        let series: Vec<Observation> = serde_json::from_str(&series_json)?;
        let origin_str: String = row.try_get("origin")?;
        let origin: Origin = serde_json::from_value(serde_json::Value::String(origin_str))?;

        snapshot.insert(Indicator {
            key: row.try_get("key")?,
            series,
            current: row.try_get("current")?,
            previous: row.try_get("previous")?,
            change: row.try_get("change")?,
            origin,
        });
    }

    Ok(snapshot)
}

pub async fn load_narrative(pool: &SqlitePool) -> Result<Option<Narrative>> {
    let row = sqlx::query(
        "SELECT month, summary, detail, situation, score, color, generated_at
         FROM narrative_state WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let month: String = row.try_get("month")?;
    let situation: String = row.try_get("situation")?;

    Ok(Some(Narrative {
        month: month.parse::<Period>()?,
        summary: row.try_get("summary")?,
        detail: row.try_get("detail")?,
        situation: situation.parse::<Regime>()?,
        score: row.try_get("score")?,
        color: row.try_get("color")?,
        generated_at: row.try_get("generated_at")?,
    }))
}

/// The news list from the last successful refresh, or empty.
pub async fn load_news(pool: &SqlitePool) -> Result<Vec<NewsItem>> {
    let raw = get_setting(pool, NEWS_SNAPSHOT_KEY).await?;
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

// ============================================================================
// WRITES
// ============================================================================

/// Persists everything a run produced in one transaction. `narrative` and
/// `news` are only written when they changed on this run.
pub async fn save_run(
    pool: &SqlitePool,
    indicators: &IndicatorSet,
    narrative: Option<&Narrative>,
    news: Option<&[NewsItem]>,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().to_rfc3339();

    for indicator in indicators.indicators.values() {
        upsert_indicator(&mut tx, indicator, &now).await?;
    }

    if let Some(narrative) = narrative {
        sqlx::query(
            "INSERT INTO narrative_state (id, month, summary, detail, situation, score, color, generated_at)
             VALUES (1, $1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                month = EXCLUDED.month,
                summary = EXCLUDED.summary,
                detail = EXCLUDED.detail,
                situation = EXCLUDED.situation,
                score = EXCLUDED.score,
                color = EXCLUDED.color,
                generated_at = EXCLUDED.generated_at",
        )
        .bind(narrative.month.to_string())
        .bind(&narrative.summary)
        .bind(&narrative.detail)
        .bind(narrative.situation.as_str())
        .bind(narrative.score)
        .bind(&narrative.color)
        .bind(&narrative.generated_at)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(news) = news {
        let json = serde_json::to_string(news)?;
        upsert_setting(&mut tx, NEWS_SNAPSHOT_KEY, &json).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Records a hand-entered value for an externally-preserved indicator,
/// replacing any existing value for the same month.
pub async fn record_manual_value(
    pool: &SqlitePool,
    registry: &Registry,
    key: &str,
    period: Period,
    value: f64,
) -> Result<Indicator> {
    let spec = registry
        .get(key)
        .ok_or_else(|| BriefError::UnknownIndicator(key.to_string()))?;
    if !spec.is_preserved() {
        return Err(BriefError::Config(format!(
            "'{}' is fetched live and does not accept manual values",
            key
        )));
    }
    if !value.is_finite() {
        return Err(BriefError::Config(format!("value for '{}' must be finite", key)));
    }

    let snapshot = load_snapshot(pool).await?;
    let mut series = snapshot.get(key).map(|i| i.series.clone()).unwrap_or_default();
    series.retain(|o| o.period != period);
    series.push(Observation::new(period, value));
    series.sort_by_key(|o| o.period);

    let series = trim_window(series, spec.history_length);
    if !series.iter().any(|o| o.period == period) {
        return Err(BriefError::Config(format!(
            "{} is older than the {} months kept for '{}'",
            period, spec.history_length, key
        )));
    }
    let indicator = Indicator::from_series(key, series, Origin::Preserved);

    let mut conn = pool.acquire().await?;
    upsert_indicator(&mut conn, &indicator, &chrono::Utc::now().to_rfc3339()).await?;

    info!(
        "Recorded {} = {} for {} (change {})",
        key,
        value,
        period,
        indicator.change
    );
    Ok(indicator)
}

async fn upsert_indicator(conn: &mut SqliteConnection, indicator: &Indicator, updated_at: &str) -> Result<()> {
    let series = serde_json::to_string(&indicator.series)?;
    let origin = serde_json::to_value(indicator.origin)?;
    let origin = origin.as_str().unwrap_or("missing").to_string();

    sqlx::query(
        "INSERT INTO indicator_state (key, series, current, previous, change, origin, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (key) DO UPDATE SET
            series = EXCLUDED.series,
            current = EXCLUDED.current,
            previous = EXCLUDED.previous,
            change = EXCLUDED.change,
            origin = EXCLUDED.origin,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(&indicator.key)
    .bind(series)
    .bind(indicator.current)
    .bind(indicator.previous)
    .bind(indicator.change)
    .bind(origin)
    .bind(updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ============================================================================
// SETTINGS
// ============================================================================

pub async fn save_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    let mut conn = pool.acquire().await?;
    upsert_setting(&mut conn, key, value).await
}

async fn upsert_setting(conn: &mut SqliteConnection, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES ($1, $2)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<String> {
    let row = sqlx::query("SELECT value FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(record) => Ok(record.try_get("value").unwrap_or_default()),
        None => Ok(String::new()),
    }
}
