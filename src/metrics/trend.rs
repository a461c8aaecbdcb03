//! Two-window trend classification.

use serde::Serialize;

use crate::metrics::utility::mean;

/// Minimum change in mean, in points, before a series counts as moving.
pub const TREND_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendSummary {
    pub first_half_mean: f64,
    pub second_half_mean: f64,
    pub delta: f64,
    pub trend: Trend,
}

/// Compares the mean of the first half of `series` with the mean of the
/// second half. With an odd length the middle value belongs to the second
/// half. Fewer than two points is always stable.
pub fn analyze_trend(series: &[f64]) -> TrendSummary {
    if series.len() < 2 {
        let only = mean(series);
        return TrendSummary {
            first_half_mean: only,
            second_half_mean: only,
            delta: 0.0,
            trend: Trend::Stable,
        };
    }

    let (first, second) = series.split_at(series.len() / 2);
    let first_half_mean = mean(first);
    let second_half_mean = mean(second);
    let delta = second_half_mean - first_half_mean;

    let trend = if delta > TREND_THRESHOLD {
        Trend::Improving
    } else if delta < -TREND_THRESHOLD {
        Trend::Declining
    } else {
        Trend::Stable
    };

    TrendSummary {
        first_half_mean,
        second_half_mean,
        delta,
        trend,
    }
}

pub fn classify_trend(series: &[f64]) -> Trend {
    analyze_trend(series).trend
}
