//! Banded classification tables used by the narrative scorer.
//!
//! Every dimension is an ordered list of bands. A value falls into the first
//! band whose `upper` bound is strictly greater than it; the last band is
//! open-ended. The cut points and contributions are policy, not correctness
//! requirements, so they live in a deserializable [`ScoringPolicy`].

use serde::{Deserialize, Serialize};

use crate::error::{BriefError, Result};
use crate::models::Regime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Exclusive upper bound; `None` for the open last band.
    pub upper: Option<f64>,
    pub phrase: String,
    #[serde(default)]
    pub contribution: f64,
    /// Forward-looking clause, an independent clause in lower case.
    #[serde(default)]
    pub clause: Option<String>,
}

impl Band {
    fn new(upper: Option<f64>, phrase: &str, contribution: f64) -> Self {
        Self { upper, phrase: phrase.to_string(), contribution, clause: None }
    }

    fn with_clause(mut self, clause: &str) -> Self {
        self.clause = Some(clause.to_string());
        self
    }
}

/// Returns the first band containing `value`.
pub fn find_band(bands: &[Band], value: f64) -> Option<&Band> {
    if value.is_nan() {
        return None;
    }
    bands.iter().find(|b| b.upper.map_or(true, |upper| value < upper))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeThresholds {
    pub strong_expansion: f64,
    pub stable_growth: f64,
    pub mild_growth: f64,
    pub elevated_uncertainty: f64,
    pub slowing: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            strong_expansion: 2.5,
            stable_growth: 1.0,
            mild_growth: 0.0,
            elevated_uncertainty: -1.0,
            slowing: -2.0,
        }
    }
}

impl RegimeThresholds {
    pub fn classify(&self, score: f64) -> Regime {
        if score > self.strong_expansion {
            Regime::StrongExpansion
        } else if score > self.stable_growth {
            Regime::StableGrowth
        } else if score > self.mild_growth {
            Regime::MildGrowth
        } else if score > self.elevated_uncertainty {
            Regime::ElevatedUncertainty
        } else if score > self.slowing {
            Regime::Slowing
        } else {
            Regime::ContractionRisk
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub inflation: Vec<Band>,
    pub core_trend: Vec<Band>,
    pub unemployment: Vec<Band>,
    pub real_rate: Vec<Band>,
    pub spread: Vec<Band>,
    pub pmi: Vec<Band>,
    pub sentiment: Vec<Band>,
    pub retail_sales: Vec<Band>,
    pub regimes: RegimeThresholds,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            inflation: vec![
                Band::new(Some(2.0), "inflation is at or below the 2% target", 1.0)
                    .with_clause("the Fed has room to ease"),
                Band::new(Some(3.0), "inflation is close to the 2% target", 0.5)
                    .with_clause("gradual rate cuts remain on the table"),
                Band::new(Some(4.0), "inflation remains above target", -0.5)
                    .with_clause("the Fed is likely to stay patient before easing"),
                Band::new(Some(6.0), "inflation is elevated", -1.0)
                    .with_clause("policy is likely to stay restrictive for longer"),
                Band::new(None, "inflation is running hot", -1.5)
                    .with_clause("further tightening is a live risk"),
            ],
            core_trend: vec![
                Band::new(Some(-0.1), "core inflation is easing", 0.0),
                Band::new(Some(0.1), "core inflation is holding steady", 0.0),
                Band::new(None, "core inflation is re-accelerating", 0.0),
            ],
            unemployment: vec![
                Band::new(Some(3.7), "the labor market is near overheating", 1.0)
                    .with_clause("tight hiring may keep wage pressure elevated"),
                Band::new(Some(4.2), "the labor market is healthy", 1.0)
                    .with_clause("steady hiring should keep consumer spending supported"),
                Band::new(Some(4.8), "the labor market is cooling", 0.0)
                    .with_clause("hiring momentum bears watching"),
                Band::new(Some(5.5), "the labor market is weakening", -1.0)
                    .with_clause("rising layoffs could weigh on spending"),
                Band::new(None, "the labor market is materially deteriorating", -1.5)
                    .with_clause("the odds of a broader downturn are rising"),
            ],
            real_rate: vec![
                Band::new(Some(0.0), "policy is accommodative in real terms", 0.0),
                Band::new(Some(1.0), "policy is roughly neutral in real terms", 0.0),
                Band::new(Some(2.0), "policy is moderately restrictive in real terms", 0.0),
                Band::new(None, "policy is firmly restrictive in real terms", 0.0),
            ],
            spread: vec![
                Band::new(Some(-0.5), "the yield curve is deeply inverted", -1.0),
                Band::new(Some(0.0), "the yield curve is inverted", -0.5),
                Band::new(Some(0.5), "the yield curve is flat", 0.0),
                Band::new(None, "the yield curve is positively sloped", 0.5),
            ],
            pmi: vec![
                Band::new(Some(45.0), "business surveys point to a sharp contraction", -1.0),
                Band::new(Some(50.0), "business surveys point to contraction", -0.5),
                Band::new(Some(52.0), "business surveys point to modest expansion", 0.5),
                Band::new(Some(55.0), "business surveys point to solid expansion", 1.0),
                Band::new(None, "business surveys point to strong expansion", 1.0),
            ],
            sentiment: vec![
                Band::new(Some(60.0), "consumer sentiment is depressed", -0.5),
                Band::new(Some(70.0), "consumer sentiment is subdued", -0.25),
                Band::new(Some(85.0), "consumer sentiment is moderate", 0.25),
                Band::new(None, "consumer sentiment is upbeat", 0.5),
            ],
            retail_sales: vec![
                Band::new(Some(0.0), "retail sales are shrinking", -0.5),
                Band::new(Some(2.0), "retail sales are flat", 0.0),
                Band::new(Some(4.0), "retail sales are growing", 0.25),
                Band::new(None, "retail sales are growing strongly", 0.5),
            ],
            regimes: RegimeThresholds::default(),
        }
    }
}

impl ScoringPolicy {
    /// Checks that every table is non-empty, strictly ordered and open-ended.
    pub fn validate(&self) -> Result<()> {
        let tables = [
            ("inflation", &self.inflation),
            ("core_trend", &self.core_trend),
            ("unemployment", &self.unemployment),
            ("real_rate", &self.real_rate),
            ("spread", &self.spread),
            ("pmi", &self.pmi),
            ("sentiment", &self.sentiment),
            ("retail_sales", &self.retail_sales),
        ];

        for (name, bands) in tables {
            let (last, bounded) = bands
                .split_last()
                .ok_or_else(|| BriefError::Config(format!("band table '{}' is empty", name)))?;
            if last.upper.is_some() {
                return Err(BriefError::Config(format!("last '{}' band must be open-ended", name)));
            }
            let mut prev = f64::NEG_INFINITY;
            for band in bounded {
                match band.upper {
                    Some(upper) if upper > prev => prev = upper,
                    _ => {
                        return Err(BriefError::Config(format!(
                            "'{}' band bounds must be present and strictly increasing",
                            name
                        )))
                    }
                }
            }
        }

        let r = &self.regimes;
        let ordered = r.strong_expansion > r.stable_growth
            && r.stable_growth > r.mild_growth
            && r.mild_growth > r.elevated_uncertainty
            && r.elevated_uncertainty > r.slowing;
        if !ordered {
            return Err(BriefError::Config("regime thresholds must be strictly decreasing".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_band_first_match_and_open_tail() {
        let policy = ScoringPolicy::default();
        assert_eq!(find_band(&policy.unemployment, 3.5).unwrap().phrase, "the labor market is near overheating");
        // bounds are exclusive
        assert_eq!(find_band(&policy.unemployment, 3.7).unwrap().phrase, "the labor market is healthy");
        assert_eq!(find_band(&policy.unemployment, 9.0).unwrap().contribution, -1.5);
        assert!(find_band(&policy.unemployment, f64::NAN).is_none());
    }

    #[test]
    fn test_regime_thresholds() {
        let t = RegimeThresholds::default();
        assert_eq!(t.classify(3.0), Regime::StrongExpansion);
        assert_eq!(t.classify(2.5), Regime::StableGrowth);
        assert_eq!(t.classify(0.5), Regime::MildGrowth);
        assert_eq!(t.classify(0.0), Regime::ElevatedUncertainty);
        assert_eq!(t.classify(-1.5), Regime::Slowing);
        assert_eq!(t.classify(-2.0), Regime::ContractionRisk);
    }

    #[test]
    fn test_default_policy_is_valid() {
        ScoringPolicy::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_unordered_bands() {
        let mut policy = ScoringPolicy::default();
        policy.spread.swap(0, 1);
        assert!(policy.validate().is_err());

        let mut policy = ScoringPolicy::default();
        policy.pmi.pop();
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_partial_policy_json_uses_defaults() {
        let json = r#"{ "regimes": { "strong_expansion": 3.0, "stable_growth": 1.5,
            "mild_growth": 0.0, "elevated_uncertainty": -1.0, "slowing": -2.5 } }"#;
        let policy: ScoringPolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.regimes.strong_expansion, 3.0);
        assert_eq!(policy.inflation, ScoringPolicy::default().inflation);
    }
}
