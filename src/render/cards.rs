use crate::indicators::{IndicatorSpec, Registry};
use crate::models::{Alert, Indicator, IndicatorSet, Narrative, NewsItem, Origin};

const NOT_AVAILABLE: &str = "N/A";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_value(spec: &IndicatorSpec, value: Option<f64>) -> String {
    value.map(|v| spec.meta.unit.format(v)).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Change badge text and CSS class. A rise is "good" only if the indicator
/// prefers high values.
fn change_badge(spec: &IndicatorSpec, indicator: &Indicator) -> (String, &'static str) {
    if indicator.previous.is_none() || indicator.current.is_none() {
        return (NOT_AVAILABLE.to_string(), "change-flat");
    }
    let change = indicator.change;
    let arrow = if change > 0.0 {
        "▲"
    } else if change < 0.0 {
        "▼"
    } else {
        "―"
    };
    let class = match spec.meta.is_high_good {
        _ if change == 0.0 => "change-flat",
        Some(high_good) if high_good == (change > 0.0) => "change-good",
        Some(_) => "change-bad",
        None => "change-flat",
    };
    (format!("{} {:+.2}", arrow, change), class)
}

pub fn indicator_grid(registry: &Registry, indicators: &IndicatorSet, alerts: &[Alert], updated_at: &str) -> String {
    let mut html = String::from("<div class=\"macro-grid\">\n");

    for spec in registry.specs() {
        let fallback;
        let indicator = match indicators.get(&spec.key) {
            Some(i) => i,
            None => {
                fallback = Indicator::missing(&spec.key);
                &fallback
            }
        };
        let meta = &spec.meta;
        let (change_text, change_class) = change_badge(spec, indicator);
        let as_of = indicator
            .latest_period()
            .map(|p| p.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let series: Vec<String> = indicator.series.iter().map(|o| o.value.to_string()).collect();
        let alert = alerts
            .iter()
            .find(|a| a.key == spec.key)
            .map(|a| {
                format!(
                    "\n    <div class=\"macro-alert\" title=\"{}\">⚠ {}</div>",
                    escape_html(&a.threshold_label),
                    escape_html(&a.threshold_label)
                )
            })
            .unwrap_or_default();

        html.push_str(&format!(
            "  <div class=\"macro-card\" data-key=\"{key}\" data-origin=\"{origin}\" data-series=\"{series}\" style=\"border-top-color:{color};\">\n    \
             <div class=\"macro-card-title\">{icon} {label}</div>\n    \
             <div class=\"macro-card-value\">{value}</div>\n    \
             <div class=\"macro-card-change {change_class}\">{change}</div>\n    \
             <div class=\"macro-card-meta\">{frequency} · {as_of}</div>{alert}\n  \
             </div>\n",
            key = escape_html(&spec.key),
            origin = origin_name(indicator),
            series = series.join(","),
            color = escape_html(&meta.color),
            icon = meta.icon,
            label = escape_html(&meta.label),
            value = format_value(spec, indicator.current),
            change_class = change_class,
            change = change_text,
            frequency = escape_html(&meta.frequency),
            as_of = as_of,
            alert = alert,
        ));
    }

    html.push_str(&format!(
        "</div>\n<div class=\"sources-footer\">Source: FRED, ISM · Updated {}</div>",
        escape_html(updated_at)
    ));
    html
}

fn origin_name(indicator: &Indicator) -> &'static str {
    match indicator.origin {
        Origin::Live => "live",
        Origin::Fallback => "fallback",
        Origin::Preserved => "preserved",
        Origin::Missing => "missing",
    }
}

pub fn narrative_card(narrative: &Narrative) -> String {
    format!(
        "<div class=\"narrative-card\" data-month=\"{month}\" data-score=\"{score:.2}\">\n  \
         <div class=\"header-top\">\n    \
         <span class=\"date-badge\" style=\"background:{color}26; color:{color};\">{situation}</span>\n    \
         <span class=\"narrative-month\">{month}</span>\n  \
         </div>\n  \
         <div class=\"narrative-summary\">{summary}</div>\n  \
         <div class=\"narrative-detail\">{detail}</div>\n  \
         <div class=\"narrative-footer\">Score {score:+.2} · Generated {generated_at}</div>\n\
         </div>",
        month = narrative.month,
        score = narrative.score,
        color = escape_html(&narrative.color),
        situation = escape_html(&narrative.situation.label().to_uppercase()),
        summary = escape_html(&narrative.summary),
        detail = escape_html(&narrative.detail),
        generated_at = escape_html(&narrative.generated_at),
    )
}

/// Key-issue article (first item with a summary) next to the headline list.
pub fn news_card(news: &[NewsItem], updated_at: &str) -> String {
    if news.is_empty() {
        return "<div class=\"news-card-wrapper\">\n  <div class=\"news-empty\">No headlines available.</div>\n</div>"
            .to_string();
    }

    let key_issue = news.iter().find(|n| n.summary.is_some()).unwrap_or(&news[0]);

    let headlines: String = news
        .iter()
        .map(|item| {
            format!(
                "      <div class=\"headline-item\"><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a><span class=\"news-source-tag\">Source: {}</span></div>\n",
                escape_html(&item.link),
                escape_html(&item.title),
                escape_html(&item.source)
            )
        })
        .collect();

    let mut sources: Vec<String> = Vec::new();
    for item in news {
        let source = escape_html(&item.source);
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    format!(
        "<div class=\"news-card-wrapper\">\n  \
         <div class=\"news-card-column\">\n    \
         <div class=\"news-card-header\">\n      \
         <div class=\"header-top\"><span class=\"date-badge\" style=\"background:rgba(16, 185, 129, 0.15); color:#10b981;\">KEY ISSUE</span></div>\n      \
         <div class=\"market-status-title\"><a href=\"{link}\" target=\"_blank\" rel=\"noopener noreferrer\">{title}</a></div>\n    \
         </div>\n    \
         <div class=\"news-summary\">{summary}</div>\n    \
         <div class=\"news-meta\">{source}{published}</div>\n  \
         </div>\n  \
         <div class=\"news-card-column\">\n    \
         <div class=\"news-card-header\">\n      \
         <div class=\"header-top\"><span class=\"date-badge\" style=\"background:rgba(244,63,94,0.15); color:#f43f5e;\">TOP TRENDING</span></div>\n    \
         </div>\n    \
         <div class=\"section-label\">Today's Hot News ({count})</div>\n    \
         <div style=\"margin-top:10px;\">\n{headlines}    </div>\n    \
         <div class=\"sources-footer\">Sources: {sources} · Updated {updated_at}</div>\n  \
         </div>\n\
         </div>",
        link = escape_html(&key_issue.link),
        title = escape_html(&key_issue.title),
        summary = escape_html(key_issue.summary.as_deref().unwrap_or(NOT_AVAILABLE)),
        source = escape_html(&key_issue.source),
        published = key_issue
            .published
            .as_deref()
            .map(|p| format!(" · {}", escape_html(p)))
            .unwrap_or_default(),
        count = news.len(),
        headlines = headlines,
        sources = sources.join(", "),
        updated_at = escape_html(updated_at),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Observation, Period, Regime};

    fn item(title: &str, summary: Option<&str>, source: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            link: format!("https://example.com/{}", title.len()),
            summary: summary.map(str::to_string),
            published: None,
            source: source.to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"R&D\"</b>"), "&lt;b&gt;&quot;R&amp;D&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_grid_shows_na_for_missing() {
        let registry = Registry::standard();
        let mut set = IndicatorSet::default();
        set.insert(Indicator::from_series(
            "unrate",
            vec![
                Observation::new(Period::new(2024, 4).unwrap(), 3.9),
                Observation::new(Period::new(2024, 5).unwrap(), 4.0),
            ],
            Origin::Live,
        ));

        let html = indicator_grid(&registry, &set, &[], "2024-05-02 07:00 UTC");

        assert_eq!(html.matches("class=\"macro-card\"").count(), registry.specs().len());
        assert!(html.contains("4.00%"));
        // unemployment rising is bad
        assert!(html.contains("change-bad\">▲ +0.10"));
        assert!(html.contains("data-key=\"cpi\" data-origin=\"missing\""));
        assert!(html.contains(">N/A<"));
    }

    #[test]
    fn test_grid_renders_alert_badge() {
        let registry = Registry::standard();
        let alert = Alert {
            key: "cpi".to_string(),
            label: "CPI".to_string(),
            value: 3.4,
            threshold: 3.0,
            threshold_label: "Above 3% = sticky inflation".to_string(),
        };
        let html = indicator_grid(&registry, &IndicatorSet::default(), &[alert], "now");
        assert!(html.contains("macro-alert"));
        assert!(html.contains("Above 3% = sticky inflation"));
    }

    #[test]
    fn test_narrative_card_is_escaped() {
        let narrative = Narrative {
            month: Period::new(2024, 5).unwrap(),
            summary: "Rates <up> & away".to_string(),
            detail: String::new(),
            situation: Regime::Slowing,
            score: -1.5,
            color: Regime::Slowing.color().to_string(),
            generated_at: "2024-05-02 07:00 UTC".to_string(),
        };
        let html = narrative_card(&narrative);
        assert!(html.contains("Rates &lt;up&gt; &amp; away"));
        assert!(html.contains("SLOWING"));
        assert!(html.contains("data-month=\"2024-05\""));
    }

    #[test]
    fn test_news_card_key_issue_is_first_with_summary() {
        let news = vec![
            item("No summary here", None, "CNBC"),
            item("Fed holds", Some("Policy unchanged."), "CNBC"),
            item("Oil slides", None, "MarketWatch"),
        ];
        let html = news_card(&news, "now");
        let key_issue = html.split("TOP TRENDING").next().unwrap();
        assert!(key_issue.contains("Fed holds"));
        assert!(key_issue.contains("Policy unchanged."));
        assert!(html.contains("Today's Hot News (3)"));
        assert!(html.contains("Sources: CNBC, MarketWatch"));
    }

    #[test]
    fn test_feed_link_with_query_is_escaped_once() {
        let xml = r#"<rss><channel><item>
  <title>Jobs</title>
  <link>https://ex.com/a?x=1&amp;y=2</link>
  <description>Payrolls beat.</description>
</item></channel></rss>"#;
        let news = crate::fetcher::rss::parse_rss_items(xml, "CNBC", 5).unwrap();
        let html = news_card(&news, "now");
        assert!(html.contains("href=\"https://ex.com/a?x=1&amp;y=2\""));
        assert!(!html.contains("&amp;amp;"));
    }

    #[test]
    fn test_near_zero_score_renders_without_negative_sign() {
        let narrative = Narrative {
            month: Period::new(2024, 5).unwrap(),
            summary: "Flat".to_string(),
            detail: String::new(),
            situation: Regime::Slowing,
            score: crate::models::round2(-0.001),
            color: Regime::Slowing.color().to_string(),
            generated_at: "2024-05-02 07:00 UTC".to_string(),
        };
        let html = narrative_card(&narrative);
        assert!(html.contains("Score +0.00"));
        assert!(!html.contains("-0.00"));
    }

    #[test]
    fn test_empty_news_card() {
        assert!(news_card(&[], "now").contains("No headlines available."));
    }
}
