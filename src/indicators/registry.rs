use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

use super::transform::Transform;

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SourceKind {
    Fred { series_id: String },
    /// No live feed; values are carried forward from the state store and
    /// entered by hand with `set-indicator`.
    Preserved,
}

/// Defines how the indicator value should be formatted/displayed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum UnitType {
    /// Percentage (e.g., 4.26 -> "4.26%")
    Percent,
    /// Percentage points, used for spreads and rate changes
    PercentPoints,
    /// Raw index level (e.g., PMI 52.3)
    Index,
    /// Already in thousands from source (payroll changes)
    Thousands,
}

impl UnitType {
    pub fn format(&self, value: f64) -> String {
        match self {
            UnitType::Percent => format!("{:.2}%", value),
            UnitType::PercentPoints => format!("{:+.2}%p", value),
            UnitType::Index => format!("{:.1}", value),
            UnitType::Thousands => format!("{:+.0}K", value),
        }
    }
}

// ============================================================================
// METADATA STRUCT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorMeta {
    pub label: String,
    pub icon: String,
    pub unit: UnitType,
    pub frequency: String,
    /// `None` when neither direction is clearly favorable.
    pub is_high_good: Option<bool>,
    pub threshold: Option<f64>,
    pub threshold_label: Option<String>,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSpec {
    pub key: String,
    pub meta: IndicatorMeta,
    pub source: SourceKind,
    pub transform: Transform,
    pub history_length: usize,
}

impl IndicatorSpec {
    pub fn is_preserved(&self) -> bool {
        self.source == SourceKind::Preserved
    }
}

const HISTORY_MONTHS: usize = 13;

// Helper macro to reduce boilerplate
macro_rules! ind {
    ($key:expr, $label:expr, $icon:expr, $source:expr, $transform:expr, $unit:expr,
     $high_good:expr, $threshold:expr, $threshold_label:expr, $color:expr) => {
        IndicatorSpec {
            key: $key.to_string(),
            meta: IndicatorMeta {
                label: $label.to_string(),
                icon: $icon.to_string(),
                unit: $unit,
                frequency: "Monthly".to_string(),
                is_high_good: $high_good,
                threshold: $threshold,
                threshold_label: $threshold_label.map(|s: &str| s.to_string()),
                color: $color.to_string(),
            },
            source: $source,
            transform: $transform,
            history_length: HISTORY_MONTHS,
        }
    };
}

fn fred(series_id: &str) -> SourceKind {
    SourceKind::Fred { series_id: series_id.to_string() }
}

// ============================================================================
// STANDARD INDICATOR TABLE
// ============================================================================

static STANDARD: Lazy<Vec<IndicatorSpec>> = Lazy::new(|| {
    vec![
        // Prices
        ind!("cpi", "Consumer Price Index (YoY)", "🛒", fred("CPIAUCSL"), Transform::YearOverYear,
             UnitType::Percent, Some(false), Some(3.0), Some("Above 3% = sticky inflation"), "#f43f5e"),
        ind!("core_cpi", "Core CPI (YoY)", "🧾", fred("CPILFESL"), Transform::YearOverYear,
             UnitType::Percent, Some(false), Some(3.0), Some("Above 3% = sticky core"), "#fb7185"),

        // Policy & rates
        ind!("fedfunds", "Fed Funds Rate", "🏦", fred("FEDFUNDS"), Transform::Identity,
             UnitType::Percent, None, None, None, "#6366f1"),
        ind!("spread", "10Y-2Y Treasury Spread", "📐", fred("T10Y2Y"), Transform::Identity,
             UnitType::PercentPoints, Some(true), Some(0.0), Some("Below 0 = inverted curve"), "#0ea5e9"),

        // Labor
        ind!("unrate", "Unemployment Rate", "👷", fred("UNRATE"), Transform::Identity,
             UnitType::Percent, Some(false), Some(4.5), Some("Above 4.5% = labor slack building"), "#f59e0b"),
        ind!("payrolls", "Nonfarm Payrolls (MoM)", "💼", fred("PAYEMS"), Transform::MonthOverMonth,
             UnitType::Thousands, Some(true), Some(100.0), Some("Below 100K = weak hiring"), "#eab308"),

        // Demand
        ind!("retail_sales", "Retail Sales (YoY)", "🛍️", fred("RSAFS"), Transform::YearOverYear,
             UnitType::Percent, Some(true), Some(0.0), Some("Below 0% = shrinking spending"), "#22c55e"),
        ind!("sentiment", "Consumer Sentiment (UMich)", "🙂", fred("UMCSENT"), Transform::Identity,
             UnitType::Index, Some(true), Some(60.0), Some("Below 60 = depressed mood"), "#14b8a6"),

        // Business surveys (not on FRED)
        ind!("pmi_manufacturing", "ISM Manufacturing PMI", "🏭", SourceKind::Preserved, Transform::Identity,
             UnitType::Index, Some(true), Some(50.0), Some("Below 50 = contraction"), "#8b5cf6"),
        ind!("pmi_services", "ISM Services PMI", "🧑‍💼", SourceKind::Preserved, Transform::Identity,
             UnitType::Index, Some(true), Some(50.0), Some("Below 50 = contraction"), "#a855f7"),
    ]
});

/// Immutable indicator configuration, built once at startup and passed to the
/// reconciler, scorer and renderer.
#[derive(Debug, Clone)]
pub struct Registry {
    specs: Vec<IndicatorSpec>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new(specs: Vec<IndicatorSpec>) -> Self {
        let index = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.key.clone(), i))
            .collect();
        Self { specs, index }
    }

    pub fn standard() -> Self {
        Self::new(STANDARD.clone())
    }

    pub fn specs(&self) -> &[IndicatorSpec] {
        &self.specs
    }

    /// O(1) lookup by key
    pub fn get(&self, key: &str) -> Option<&IndicatorSpec> {
        self.index.get(key).and_then(|&i| self.specs.get(i))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_keys_are_unique() {
        let registry = Registry::standard();
        assert_eq!(registry.index.len(), registry.specs().len());
    }

    #[test]
    fn test_pmis_are_preserved() {
        let registry = Registry::standard();
        assert!(registry.get("pmi_manufacturing").unwrap().is_preserved());
        assert!(registry.get("pmi_services").unwrap().is_preserved());
        assert!(!registry.get("cpi").unwrap().is_preserved());
    }

    #[test]
    fn test_scored_dimensions_are_configured() {
        let registry = Registry::standard();
        for key in ["cpi", "core_cpi", "fedfunds", "unrate", "spread", "sentiment", "retail_sales"] {
            assert!(registry.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_unit_formatting() {
        assert_eq!(UnitType::Percent.format(3.456), "3.46%");
        assert_eq!(UnitType::PercentPoints.format(-0.4), "-0.40%p");
        assert_eq!(UnitType::Thousands.format(143.0), "+143K");
    }
}
