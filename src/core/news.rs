use tracing::{info, warn};

use super::rate_limiter::RateLimiter;
use crate::fetcher::NewsSource;
use crate::models::NewsItem;

pub const ITEMS_PER_FEED: usize = 5;
pub const MAX_ITEMS: usize = 9;

/// Fetches every feed and interleaves their items round-robin, so one noisy
/// feed cannot crowd out the others. Failing feeds are skipped.
pub async fn collect_news(sources: &[Box<dyn NewsSource>], per_feed: usize, total: usize) -> Vec<NewsItem> {
    let limiter = RateLimiter::for_source("rss");
    let mut per_source: Vec<Vec<NewsItem>> = Vec::with_capacity(sources.len());

    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            limiter.wait().await;
        }
        match source.fetch_items(per_feed).await {
            Ok(mut items) => {
                items.truncate(per_feed);
                info!("📰 {}: {} items", source.label(), items.len());
                per_source.push(items);
            }
            Err(e) => warn!("📰 {}: feed failed: {}", source.label(), e),
        }
    }

    interleave(per_source, total)
}

fn interleave(lists: Vec<Vec<NewsItem>>, total: usize) -> Vec<NewsItem> {
    let mut iters: Vec<_> = lists.into_iter().map(|l| l.into_iter()).collect();
    let mut out = Vec::new();
    let mut seen_links = std::collections::HashSet::new();

    while out.len() < total {
        let mut progressed = false;
        for it in iters.iter_mut() {
            if out.len() >= total {
                break;
            }
            if let Some(item) = it.next() {
                progressed = true;
                // syndicated stories show up in several feeds
                if item.link.is_empty() || seen_links.insert(item.link.clone()) {
                    out.push(item);
                }
            }
        }
        if !progressed {
            break;
        }
    }

    out
}
