use tracing::warn;

use crate::indicators::Registry;
use crate::models::{Alert, IndicatorSet};

/// Indicators whose current value sits on the unfavorable side of their
/// configured threshold. Indicators with no preferred direction never alert.
pub fn check_thresholds(registry: &Registry, indicators: &IndicatorSet) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for spec in registry.specs() {
        let meta = &spec.meta;
        let (Some(threshold), Some(high_good)) = (meta.threshold, meta.is_high_good) else {
            continue;
        };
        let Some(value) = indicators.current(&spec.key) else {
            continue;
        };

        let breached = if high_good { value < threshold } else { value > threshold };
        if breached {
            warn!("🔔 {} at {} breaches threshold {}", meta.label, meta.unit.format(value), threshold);
            alerts.push(Alert {
                key: spec.key.clone(),
                label: meta.label.clone(),
                value,
                threshold,
                threshold_label: meta.threshold_label.clone().unwrap_or_default(),
            });
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Indicator, Observation, Origin, Period};

    fn set_with(values: &[(&str, f64)]) -> IndicatorSet {
        let mut set = IndicatorSet::default();
        let period = Period::new(2024, 5).unwrap();
        for (key, value) in values {
            set.insert(Indicator::from_series(key, vec![Observation::new(period, *value)], Origin::Live));
        }
        set
    }

    #[test]
    fn test_direction_matters() {
        let registry = Registry::standard();
        // cpi: high is bad; sentiment: high is good
        let alerts = check_thresholds(&registry, &set_with(&[("cpi", 3.4), ("sentiment", 55.0)]));
        let keys: Vec<&str> = alerts.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["cpi", "sentiment"]);

        let calm = check_thresholds(&registry, &set_with(&[("cpi", 2.4), ("sentiment", 75.0)]));
        assert!(calm.is_empty());
    }

    #[test]
    fn test_at_threshold_does_not_alert() {
        let registry = Registry::standard();
        assert!(check_thresholds(&registry, &set_with(&[("unrate", 4.5), ("spread", 0.0)])).is_empty());
    }

    #[test]
    fn test_no_preferred_direction_never_alerts() {
        let registry = Registry::standard();
        assert!(check_thresholds(&registry, &set_with(&[("fedfunds", 9.0)])).is_empty());
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let registry = Registry::standard();
        let mut set = IndicatorSet::default();
        set.insert(Indicator::missing("cpi"));
        assert!(check_thresholds(&registry, &set).is_empty());
    }
}
