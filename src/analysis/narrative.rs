use serde::Serialize;
use tracing::debug;

use super::bands::{find_band, Band, ScoringPolicy};
use crate::models::{round2, IndicatorSet, Narrative, Period, Regime};

const INFLATION_UNAVAILABLE: &str = "inflation data unavailable";
const EMPLOYMENT_UNAVAILABLE: &str = "employment data unavailable";

/// Current readings for each scored or described dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readings {
    pub inflation: Option<f64>,
    pub core_change: Option<f64>,
    pub unemployment: Option<f64>,
    pub fedfunds: Option<f64>,
    pub spread: Option<f64>,
    pub pmi: Option<f64>,
    pub sentiment: Option<f64>,
    pub retail_sales: Option<f64>,
}

impl Readings {
    pub fn from_indicators(set: &IndicatorSet) -> Self {
        // Core inflation stands in for headline when headline is missing
        let inflation = set.current("cpi").or_else(|| set.current("core_cpi"));

        let pmi = match (set.current("pmi_manufacturing"), set.current("pmi_services")) {
            (Some(m), Some(s)) => Some((m + s) / 2.0),
            (m, s) => m.or(s),
        };

        Self {
            inflation,
            core_change: set.change("core_cpi"),
            unemployment: set.current("unrate"),
            fedfunds: set.current("fedfunds"),
            spread: set.current("spread"),
            pmi,
            sentiment: set.current("sentiment"),
            retail_sales: set.current("retail_sales"),
        }
    }

    pub fn real_rate(&self) -> Option<f64> {
        Some(self.fedfunds? - self.inflation?)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Contribution {
    pub dimension: &'static str,
    pub value: f64,
    pub points: f64,
}

/// The scorer's output before it is tagged with a month.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub summary: String,
    pub detail: String,
    pub situation: Regime,
    pub score: f64,
    pub color: String,
    pub contributions: Vec<Contribution>,
}

impl Assessment {
    pub fn into_narrative(self, month: Period, generated_at: String) -> Narrative {
        Narrative {
            month,
            summary: self.summary,
            detail: self.detail,
            situation: self.situation,
            score: self.score,
            color: self.color,
            generated_at,
        }
    }
}

pub struct NarrativeScorer<'a> {
    policy: &'a ScoringPolicy,
}

impl<'a> NarrativeScorer<'a> {
    pub fn new(policy: &'a ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn assess(&self, indicators: &IndicatorSet) -> Assessment {
        self.assess_readings(&Readings::from_indicators(indicators))
    }

    pub fn assess_readings(&self, r: &Readings) -> Assessment {
        let p = self.policy;

        // Step 1: per-dimension bands
        let inflation = band_for(&p.inflation, r.inflation);
        let core = band_for(&p.core_trend, r.core_change);
        let unemployment = band_for(&p.unemployment, r.unemployment);
        let real_rate = band_for(&p.real_rate, r.real_rate());
        let spread = band_for(&p.spread, r.spread);
        let pmi = band_for(&p.pmi, r.pmi);
        let sentiment = band_for(&p.sentiment, r.sentiment);
        let retail = band_for(&p.retail_sales, r.retail_sales);

        // Step 2: additive composite; absent dimensions add nothing
        let scored = [
            ("inflation", r.inflation, inflation),
            ("unemployment", r.unemployment, unemployment),
            ("pmi", r.pmi, pmi),
            ("sentiment", r.sentiment, sentiment),
            ("spread", r.spread, spread),
            ("retail_sales", r.retail_sales, retail),
        ];
        let contributions: Vec<Contribution> = scored
            .iter()
            .filter_map(|(dimension, value, band)| {
                Some(Contribution {
                    dimension: *dimension,
                    value: (*value)?,
                    points: band.as_ref()?.contribution,
                })
            })
            .collect();
        let score = round2(contributions.iter().map(|c| c.points).sum());

        // Step 3: regime
        let situation = p.regimes.classify(score);
        debug!("Narrative score {:.2} -> {} ({} dimensions)", score, situation.label(), contributions.len());

        // Step 4: text
        let summary = format!(
            "{} and {}, pointing to {} overall.",
            capitalize(inflation.map_or(INFLATION_UNAVAILABLE, |b| b.phrase.as_str())),
            unemployment.map_or(EMPLOYMENT_UNAVAILABLE, |b| b.phrase.as_str()),
            situation.label()
        );

        let policy_sentence = sentence(
            &[real_rate.map(|b| b.phrase.as_str()), core.map(|b| b.phrase.as_str())],
            inflation.and_then(|b| b.clause.as_deref()),
        );
        let activity_sentence = sentence(
            &[
                pmi.map(|b| b.phrase.as_str()),
                sentiment.map(|b| b.phrase.as_str()),
                spread.map(|b| b.phrase.as_str()),
            ],
            unemployment.and_then(|b| b.clause.as_deref()),
        );
        let outlook = if contributions.is_empty() {
            String::new()
        } else {
            self.outlook(score, r.spread).to_string()
        };

        let detail = [policy_sentence, activity_sentence, outlook]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Assessment {
            summary,
            detail,
            situation,
            score,
            color: situation.color().to_string(),
            contributions,
        }
    }

    /// Five outlook tiers; the outer two branch on the sign of the curve.
    fn outlook(&self, score: f64, spread: Option<f64>) -> &'static str {
        let t = &self.policy.regimes;
        if score > t.strong_expansion {
            if spread.is_some_and(|s| s < 0.0) {
                "Growth momentum is strong, but the inverted curve suggests the cycle may be maturing; stay selective on duration and leverage."
            } else {
                "Momentum looks broad-based and durable; risk assets should stay well supported while earnings keep pace."
            }
        } else if score > t.stable_growth {
            "The expansion looks steady; a soft landing remains the base case as long as inflation keeps cooling."
        } else if score > t.elevated_uncertainty {
            "Signals are mixed; expect choppy markets until the next inflation and jobs prints settle the direction."
        } else if score > t.slowing {
            "Growth is losing steam; defensive positioning and quality balance sheets deserve more weight."
        } else if spread.is_some_and(|s| s > 0.0) {
            "Conditions point to contraction, though the re-steepening curve hints that markets are already pricing an eventual recovery."
        } else {
            "Conditions point to contraction risk; preserving capital takes priority until the data stabilize."
        }
    }
}

fn band_for(bands: &[Band], value: Option<f64>) -> Option<&Band> {
    find_band(bands, value?)
}

/// Joins the available phrases and an optional trailing clause into one
/// sentence, or returns an empty string when nothing is available.
fn sentence(phrases: &[Option<&str>], clause: Option<&str>) -> String {
    let present: Vec<&str> = phrases.iter().flatten().copied().collect();
    let body = join_phrases(&present);
    match (body.is_empty(), clause) {
        (true, None) => String::new(),
        (true, Some(clause)) => format!("{}.", capitalize(clause)),
        (false, None) => format!("{}.", capitalize(&body)),
        (false, Some(clause)) => format!("{}; {}.", capitalize(&body), clause),
    }
}

/// `a`, `a and b`, `a, b and c`
fn join_phrases(parts: &[&str]) -> String {
    match parts {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
