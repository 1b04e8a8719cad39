//! Splices generated fragments into the published page.
//!
//! The page is hand-maintained HTML; only the content between
//! `<!-- NAME_START -->` and `<!-- NAME_END -->` is ours to replace.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{BriefError, Result};
use crate::indicators::Registry;
use crate::models::{Alert, IndicatorSet, Narrative, NewsItem};

pub mod cards;

pub const INDICATORS_SECTION: &str = "MACRO_INDICATORS";
pub const NARRATIVE_SECTION: &str = "MACRO_NARRATIVE";
pub const NEWS_SECTION: &str = "MARKET_NEWS_CARD";

/// Everything shown on one rendering of the page.
pub struct PageContent<'a> {
    pub registry: &'a Registry,
    pub indicators: &'a IndicatorSet,
    pub narrative: &'a Narrative,
    pub news: &'a [NewsItem],
    pub alerts: &'a [Alert],
    pub updated_at: String,
}

/// Replaces the content between the named marker pair. Returns `None` when
/// either marker is absent or they are out of order.
pub fn splice_section(doc: &str, name: &str, content: &str) -> Option<String> {
    let start_marker = format!("<!-- {}_START -->", name);
    let end_marker = format!("<!-- {}_END -->", name);

    let body_start = doc.find(&start_marker)? + start_marker.len();
    let body_end = body_start + doc[body_start..].find(&end_marker)?;

    let mut out = String::with_capacity(doc.len() + content.len());
    out.push_str(&doc[..body_start]);
    out.push('\n');
    out.push_str(content.trim_matches('\n'));
    out.push('\n');
    out.push_str(&doc[body_end..]);
    Some(out)
}

pub fn render_page(doc: &str, page: &PageContent) -> String {
    let sections = [
        (
            INDICATORS_SECTION,
            cards::indicator_grid(page.registry, page.indicators, page.alerts, &page.updated_at),
        ),
        (NARRATIVE_SECTION, cards::narrative_card(page.narrative)),
        (NEWS_SECTION, cards::news_card(page.news, &page.updated_at)),
    ];

    let mut out = doc.to_string();
    for (name, fragment) in sections {
        match splice_section(&out, name, &fragment) {
            Some(updated) => {
                debug!("Rendered section {}", name);
                out = updated;
            }
            None => warn!("Markers for section {} not found, leaving it untouched", name),
        }
    }
    out
}

pub fn read_page(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(BriefError::OutputMissing(path.display().to_string()));
    }
    Ok(fs::read_to_string(path)?)
}

/// Writes through a sibling temp file and a rename so readers never see a
/// half-written page.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = temp_path(path);
    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index.html".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
