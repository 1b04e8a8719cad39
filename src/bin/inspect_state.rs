use anyhow::Result;

use market_brief_lib::config::Config;
use market_brief_lib::db;
use market_brief_lib::indicators::Registry;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    println!("Connecting to: {}", config.state_url);
    let pool = db::init(&config.state_url).await?;
    let registry = Registry::standard();

    let snapshot = db::load_snapshot(&pool).await?;

    println!("{:<20} | {:<10} | {:>10} | {:>10} | {:>8} | {:<8}", "Key", "Origin", "Current", "Previous", "Months", "Latest");
    println!("{}", "-".repeat(80));

    for spec in registry.specs() {
        match snapshot.get(&spec.key) {
            Some(ind) => println!(
                "{:<20} | {:<10} | {:>10} | {:>10} | {:>8} | {:<8}",
                ind.key,
                format!("{:?}", ind.origin).to_lowercase(),
                ind.current.map(|v| spec.meta.unit.format(v)).unwrap_or_else(|| "N/A".to_string()),
                ind.previous.map(|v| spec.meta.unit.format(v)).unwrap_or_else(|| "N/A".to_string()),
                ind.series.len(),
                ind.latest_period().map(|p| p.to_string()).unwrap_or_else(|| "N/A".to_string()),
            ),
            None => println!("{:<20} | {:<10}", spec.key, "(none)"),
        }
    }

    println!();
    match db::load_narrative(&pool).await? {
        Some(n) => {
            println!("Narrative for {} ({}, score {:+.2}, generated {})", n.month, n.situation.label(), n.score, n.generated_at);
            println!("  {}", n.summary);
            if !n.detail.is_empty() {
                println!("  {}", n.detail);
            }
        }
        None => println!("❌ No narrative stored yet"),
    }

    let news = db::load_news(&pool).await?;
    println!();
    println!("{} stored headlines", news.len());
    for item in &news {
        println!("  [{}] {}", item.source, item.title);
    }

    pool.close().await;
    Ok(())
}
