use anyhow::{Context, Result};
use clap::Parser;

use market_brief_lib::config::Config;
use market_brief_lib::db;
use market_brief_lib::indicators::Registry;
use market_brief_lib::logging::{init_logging, LoggingConfig};
use market_brief_lib::models::Period;

/// Records a monthly value for an indicator that has no live feed (ISM PMIs).
#[derive(Parser, Debug)]
#[command(name = "set-indicator")]
struct Args {
    /// Indicator key, e.g. pmi_manufacturing
    key: String,
    /// Month the value belongs to, YYYY-MM
    period: Period,
    value: f64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging(&LoggingConfig::from_env());

    let args = Args::parse();
    let config = Config::from_env().context("Invalid configuration")?;
    let pool = db::init(&config.state_url).await?;
    let registry = Registry::standard();

    let indicator = db::record_manual_value(&pool, &registry, &args.key, args.period, args.value)
        .await
        .with_context(|| format!("Could not record {} for {}", args.key, args.period))?;

    println!("✅ {} now has {} months", indicator.key, indicator.series.len());
    for obs in &indicator.series {
        println!("   {}  {}", obs.period, obs.value);
    }

    pool.close().await;
    Ok(())
}
