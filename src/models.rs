use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::BriefError;

/// A calendar month. Series are bucketed by month and the narrative is
/// memoized per month, so this doubles as the month token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, BriefError> {
        if !(1..=12).contains(&month) {
            return Err(BriefError::InvalidPeriod(format!("{}-{}", year, month)));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    /// Same calendar month, one year earlier.
    pub fn year_earlier(&self) -> Self {
        Self { year: self.year - 1, month: self.month }
    }

    pub fn months_back(&self, n: u32) -> Self {
        let total = self.year * 12 + (self.month as i32 - 1) - n as i32;
        Self { year: total.div_euclid(12), month: total.rem_euclid(12) as u32 + 1 }
    }

    pub fn first_day(&self) -> NaiveDate {
        // month is validated on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = BriefError;

    /// Accepts `YYYY-MM` and full `YYYY-MM-DD` dates (the day is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut parts = s.splitn(3, '-');
        let year = parts.next().and_then(|y| y.parse::<i32>().ok());
        let month = parts.next().and_then(|m| m.parse::<u32>().ok());
        match (year, month) {
            (Some(year), Some(month)) => Period::new(year, month),
            _ => Err(BriefError::InvalidPeriod(s.to_string())),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Observation {
    pub period: Period,
    pub value: f64,
}

impl Observation {
    pub fn new(period: Period, value: f64) -> Self {
        Self { period, value }
    }
}

/// Where an indicator's values came from on this run.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Live,
    Fallback,
    Preserved,
    Missing,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Indicator {
    pub key: String,
    pub series: Vec<Observation>,
    pub current: Option<f64>,
    pub previous: Option<f64>,
    pub change: f64,
    pub origin: Origin,
}

impl Indicator {
    /// Builds an indicator whose current/previous/change are derived from
    /// the tail of `series`.
    pub fn from_series(key: &str, series: Vec<Observation>, origin: Origin) -> Self {
        let current = series.last().map(|o| o.value);
        let previous = series.len().checked_sub(2).map(|i| series[i].value);
        Self {
            key: key.to_string(),
            change: change_between(current, previous),
            series,
            current,
            previous,
            origin,
        }
    }

    pub fn missing(key: &str) -> Self {
        Self::from_series(key, Vec::new(), Origin::Missing)
    }

    pub fn latest_period(&self) -> Option<Period> {
        self.series.last().map(|o| o.period)
    }
}

pub fn change_between(current: Option<f64>, previous: Option<f64>) -> f64 {
    match (current, previous) {
        (Some(c), Some(p)) => round2(c - p),
        _ => 0.0,
    }
}

pub fn round2(value: f64) -> f64 {
    // `+ 0.0` folds -0.0 into 0.0 so it never prints as "-0.00"
    (value * 100.0).round() / 100.0 + 0.0
}

/// Every configured key mapped to its reconciled indicator.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    pub indicators: BTreeMap<String, Indicator>,
}

impl IndicatorSet {
    pub fn insert(&mut self, indicator: Indicator) {
        self.indicators.insert(indicator.key.clone(), indicator);
    }

    pub fn get(&self, key: &str) -> Option<&Indicator> {
        self.indicators.get(key)
    }

    pub fn current(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|i| i.current)
    }

    pub fn change(&self, key: &str) -> Option<f64> {
        self.get(key).filter(|i| i.previous.is_some()).map(|i| i.change)
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }
}

/// The previous run's stored indicator state, used as the fallback store.
pub type Snapshot = IndicatorSet;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    StrongExpansion,
    StableGrowth,
    MildGrowth,
    ElevatedUncertainty,
    Slowing,
    ContractionRisk,
}

impl Regime {
    pub fn label(&self) -> &'static str {
        match self {
            Regime::StrongExpansion => "strong expansion",
            Regime::StableGrowth => "stable growth",
            Regime::MildGrowth => "mild growth",
            Regime::ElevatedUncertainty => "elevated uncertainty",
            Regime::Slowing => "slowing",
            Regime::ContractionRisk => "contraction/recession risk",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Regime::StrongExpansion => "#10b981", // Emerald
            Regime::StableGrowth => "#22c55e",
            Regime::MildGrowth => "#84cc16",
            Regime::ElevatedUncertainty => "#f59e0b", // Amber
            Regime::Slowing => "#f97316",
            Regime::ContractionRisk => "#ef4444", // Red
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::StrongExpansion => "strong_expansion",
            Regime::StableGrowth => "stable_growth",
            Regime::MildGrowth => "mild_growth",
            Regime::ElevatedUncertainty => "elevated_uncertainty",
            Regime::Slowing => "slowing",
            Regime::ContractionRisk => "contraction_risk",
        }
    }
}

impl FromStr for Regime {
    type Err = BriefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strong_expansion" => Ok(Regime::StrongExpansion),
            "stable_growth" => Ok(Regime::StableGrowth),
            "mild_growth" => Ok(Regime::MildGrowth),
            "elevated_uncertainty" => Ok(Regime::ElevatedUncertainty),
            "slowing" => Ok(Regime::Slowing),
            "contraction_risk" => Ok(Regime::ContractionRisk),
            other => Err(BriefError::Serialization(format!("unknown regime '{}'", other))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Narrative {
    pub month: Period,
    pub summary: String,
    pub detail: String,
    pub situation: Regime,
    pub score: f64,
    pub color: String,
    pub generated_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
    pub published: Option<String>,
    pub source: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Alert {
    pub key: String,
    pub label: String,
    pub value: f64,
    pub threshold: f64,
    pub threshold_label: String,
}
