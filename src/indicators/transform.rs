use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{round2, Observation, Period};

/// Converts a raw monthly series into the convention used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Values used as published.
    Identity,
    /// `(v[p] / v[p - 1y] - 1) * 100`
    YearOverYear,
    /// `v[p] - v[previous entry]`
    MonthOverMonth,
}

impl Transform {
    pub fn apply(&self, raw: &[Observation]) -> Vec<Observation> {
        let monthly = bucket_by_month(raw);
        match self {
            Transform::Identity => monthly,
            Transform::YearOverYear => year_over_year(&monthly),
            Transform::MonthOverMonth => month_over_month(&monthly),
        }
    }
}

/// Sorts by period and keeps the last observation seen for each month.
pub fn bucket_by_month(raw: &[Observation]) -> Vec<Observation> {
    let map: BTreeMap<Period, f64> = raw.iter().map(|o| (o.period, o.value)).collect();
    map.into_iter().map(|(period, value)| Observation { period, value }).collect()
}

fn year_over_year(monthly: &[Observation]) -> Vec<Observation> {
    let by_period: BTreeMap<Period, f64> = monthly.iter().map(|o| (o.period, o.value)).collect();

    monthly
        .iter()
        .filter_map(|o| {
            let prior = *by_period.get(&o.period.year_earlier())?;
            if prior == 0.0 {
                return None;
            }
            Some(Observation::new(o.period, round2((o.value / prior - 1.0) * 100.0)))
        })
        .collect()
}

fn month_over_month(monthly: &[Observation]) -> Vec<Observation> {
    monthly
        .windows(2)
        .map(|w| Observation::new(w[1].period, round2(w[1].value - w[0].value)))
        .collect()
}

/// Keeps the most recent `len` entries, dropping the oldest first.
pub fn trim_window(mut series: Vec<Observation>, len: usize) -> Vec<Observation> {
    if series.len() > len {
        series.drain(..series.len() - len);
    }
    series
}
