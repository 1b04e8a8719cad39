//! Once-per-month memoization of the narrative.
//!
//! The narrative is regenerated only when the stored one belongs to a
//! different month (or there is none). Within a month every run re-renders
//! the stored narrative unchanged, even if the indicators moved.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::analysis::NarrativeScorer;
use crate::models::{IndicatorSet, Narrative, Period};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Stale,
    Fresh,
}

impl GateState {
    pub fn of(stored: Option<&Narrative>, current_month: Period) -> Self {
        match stored {
            Some(n) if n.month == current_month => GateState::Fresh,
            _ => GateState::Stale,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Reused(Narrative),
    Generated(Narrative),
}

impl GateOutcome {
    pub fn narrative(&self) -> &Narrative {
        match self {
            GateOutcome::Reused(n) | GateOutcome::Generated(n) => n,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, GateOutcome::Generated(_))
    }

    /// The narrative that needs persisting, if any.
    pub fn to_persist(&self) -> Option<&Narrative> {
        match self {
            GateOutcome::Generated(n) => Some(n),
            GateOutcome::Reused(_) => None,
        }
    }
}

pub struct MemoGate<'a> {
    scorer: NarrativeScorer<'a>,
}

impl<'a> MemoGate<'a> {
    pub fn new(scorer: NarrativeScorer<'a>) -> Self {
        Self { scorer }
    }

    pub fn resolve(
        &self,
        stored: Option<Narrative>,
        current_month: Period,
        indicators: &IndicatorSet,
        now: DateTime<Utc>,
    ) -> GateOutcome {
        match (GateState::of(stored.as_ref(), current_month), stored) {
            (GateState::Fresh, Some(narrative)) => {
                info!("Narrative for {} already generated at {}, reusing", current_month, narrative.generated_at);
                GateOutcome::Reused(narrative)
            }
            (_, previous) => {
                let assessment = self.scorer.assess(indicators);
                info!(
                    "Generated narrative for {} (previous: {}): {} ({:.2})",
                    current_month,
                    previous.map(|n| n.month.to_string()).unwrap_or_else(|| "none".to_string()),
                    assessment.situation.label(),
                    assessment.score
                );
                let generated_at = now.format("%Y-%m-%d %H:%M UTC").to_string();
                GateOutcome::Generated(assessment.into_narrative(current_month, generated_at))
            }
        }
    }
}
