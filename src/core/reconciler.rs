//! Merges freshly fetched series with the previous run's snapshot.
//!
//! Every configured key comes out with an entry: live data when the fetch
//! produced usable values, the stored entry when it did not, and a null
//! placeholder when neither exists. Externally-preserved keys are never
//! fetched and are carried over verbatim.

use tracing::{debug, info, warn};

use super::rate_limiter::RateLimiter;
use crate::fetcher::DataSource;
use crate::indicators::transform::trim_window;
use crate::indicators::{IndicatorSpec, Registry, SourceKind};
use crate::models::{Indicator, IndicatorSet, Origin, Period, Snapshot};

/// Months requested beyond the display window so year-over-year transforms
/// have a full prior year to work from.
const FETCH_PADDING_MONTHS: u32 = 13;

pub struct Reconciler<'a> {
    registry: &'a Registry,
    source: &'a dyn DataSource,
    limiter: RateLimiter,
}

impl<'a> Reconciler<'a> {
    pub fn new(registry: &'a Registry, source: &'a dyn DataSource) -> Self {
        Self { registry, source, limiter: RateLimiter::for_source(source.name()) }
    }

    pub async fn reconcile(&self, snapshot: &Snapshot, current_month: Period) -> IndicatorSet {
        let mut out = IndicatorSet::default();
        let mut fetched_any = false;
        let (mut live, mut fallback, mut missing) = (0usize, 0usize, 0usize);

        for spec in self.registry.specs() {
            let indicator = match &spec.source {
                SourceKind::Preserved => preserved(spec, snapshot),
                SourceKind::Fred { series_id } => {
                    if fetched_any {
                        self.limiter.wait().await;
                    }
                    fetched_any = true;
                    self.fetch_live(spec, series_id, snapshot, current_month).await
                }
            };

            match indicator.origin {
                Origin::Live => live += 1,
                Origin::Fallback => fallback += 1,
                Origin::Missing => missing += 1,
                Origin::Preserved => {}
            }
            out.insert(indicator);
        }

        info!(
            "Reconciled {} indicators ({} live, {} from snapshot, {} missing)",
            out.len(),
            live,
            fallback,
            missing
        );
        out
    }

    async fn fetch_live(
        &self,
        spec: &IndicatorSpec,
        series_id: &str,
        snapshot: &Snapshot,
        current_month: Period,
    ) -> Indicator {
        let start = current_month.months_back(spec.history_length as u32 + FETCH_PADDING_MONTHS);

        match self.source.fetch_series(series_id, start).await {
            Ok(raw) => {
                let series = trim_window(spec.transform.apply(&raw), spec.history_length);
                if series.is_empty() {
                    warn!("{} ({}): no usable observations, using snapshot", spec.key, series_id);
                    return fall_back(spec, snapshot);
                }
                debug!("{} ({}): {} points", spec.key, series_id, series.len());
                Indicator::from_series(&spec.key, series, Origin::Live)
            }
            Err(e) => {
                warn!("{} ({}): fetch failed, using snapshot: {}", spec.key, series_id, e);
                fall_back(spec, snapshot)
            }
        }
    }
}

fn preserved(spec: &IndicatorSpec, snapshot: &Snapshot) -> Indicator {
    match snapshot.get(&spec.key) {
        Some(stored) if !stored.series.is_empty() || stored.current.is_some() => Indicator {
            origin: Origin::Preserved,
            ..stored.clone()
        },
        _ => Indicator::missing(&spec.key),
    }
}

fn fall_back(spec: &IndicatorSpec, snapshot: &Snapshot) -> Indicator {
    match snapshot.get(&spec.key) {
        Some(stored) if !stored.series.is_empty() || stored.current.is_some() => Indicator {
            origin: Origin::Fallback,
            ..stored.clone()
        },
        _ => Indicator::missing(&spec.key),
    }
}
