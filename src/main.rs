use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use market_brief_lib::config::Config;
use market_brief_lib::core::orchestrator::{self, Sources};
use market_brief_lib::db;
use market_brief_lib::fetcher::fred::FredFetcher;
use market_brief_lib::fetcher::rss::RssFeed;
use market_brief_lib::fetcher::NewsSource;
use market_brief_lib::indicators::Registry;
use market_brief_lib::logging::{init_logging, LoggingConfig};

/// Updates the macro indicators, monthly narrative and news card in the
/// published page.
#[derive(Parser, Debug)]
#[command(name = "market-brief")]
#[command(version)]
struct Args {
    /// Refresh the news section even outside the configured refresh hours
    #[arg(long, env = "BRIEF_FORCE_REFRESH")]
    force_refresh: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging(&LoggingConfig::from_env());

    let args = Args::parse();
    let config = Config::from_env()
        .context("Invalid configuration")?
        .with_force_refresh(args.force_refresh);

    info!("Page: {}, state: {}", config.index_path.display(), config.state_url);

    let pool = db::init(&config.state_url).await.context("Failed to open state store")?;
    let registry = Registry::standard();

    let fred = FredFetcher::new(config.fred_api_key.clone(), config.http_timeout);
    let feeds: Vec<Box<dyn NewsSource>> = config
        .news_feeds
        .iter()
        .map(|feed| Box::new(RssFeed::new(feed, config.http_timeout)) as Box<dyn NewsSource>)
        .collect();

    let report = orchestrator::run(
        &config,
        &registry,
        &pool,
        Sources { data: &fred, news: &feeds },
        chrono::Utc::now(),
    )
    .await
    .context("Update failed")?;

    info!(
        "{}: {} ({:+.2})",
        report.gate.narrative().month,
        report.gate.narrative().situation.label(),
        report.gate.narrative().score
    );

    pool.close().await;
    Ok(())
}
