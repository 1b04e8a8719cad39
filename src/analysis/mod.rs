pub mod bands;
pub mod narrative;

pub use bands::{find_band, Band, RegimeThresholds, ScoringPolicy};
pub use narrative::{Assessment, NarrativeScorer, Readings};
