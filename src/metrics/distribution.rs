//! Bucketing of percentage scores into fixed bands.

use serde::Serialize;

use crate::metrics::utility::pct;

/// A score band, inclusive of `min`. Bands are listed from highest to lowest
/// and each one ends where the band above it starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBand {
    pub label: &'static str,
    pub min: f64,
}

pub const DEFAULT_BANDS: [ScoreBand; 6] = [
    ScoreBand { label: "90-100", min: 90.0 },
    ScoreBand { label: "80-89", min: 80.0 },
    ScoreBand { label: "70-79", min: 70.0 },
    ScoreBand { label: "60-69", min: 60.0 },
    ScoreBand { label: "50-59", min: 50.0 },
    ScoreBand { label: "0-49", min: f64::NEG_INFINITY },
];

/// Shown in place of a percentage when there is nothing to divide by.
pub const EMPTY_PERCENTAGE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandCount {
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub bands: Vec<BandCount>,
    pub total: usize,
}

impl Distribution {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Display form of a band's percentage, `"N/A"` for an empty distribution.
    pub fn percentage_label(&self, band: &BandCount) -> String {
        if self.is_empty() {
            EMPTY_PERCENTAGE.to_string()
        } else {
            format!("{:.1}%", band.percentage)
        }
    }

    pub fn count_for(&self, label: &str) -> usize {
        self.bands
            .iter()
            .find(|b| b.label == label)
            .map_or(0, |b| b.count)
    }
}

/// Counts how many scores fall into each band. NaN scores are ignored.
///
/// Scores above the top band's range still land in the top band; the last
/// band catches everything below the others.
pub fn distribute(scores: impl IntoIterator<Item = f64>, bands: &[ScoreBand]) -> Distribution {
    let mut counts = vec![0usize; bands.len()];
    let mut total = 0;

    for score in scores {
        if score.is_nan() {
            continue;
        }
        let slot = bands
            .iter()
            .position(|band| score >= band.min)
            .unwrap_or(bands.len().saturating_sub(1));
        if let Some(count) = counts.get_mut(slot) {
            *count += 1;
            total += 1;
        }
    }

    let bands = bands
        .iter()
        .zip(counts)
        .map(|(band, count)| BandCount {
            label: band.label.to_string(),
            count,
            percentage: pct(count, total),
        })
        .collect();

    Distribution { bands, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_score_per_band() {
        let dist = distribute([95.0, 82.0, 71.0, 58.0, 42.0], &DEFAULT_BANDS);

        assert_eq!(dist.total, 5);
        assert_eq!(dist.count_for("90-100"), 1);
        assert_eq!(dist.count_for("80-89"), 1);
        assert_eq!(dist.count_for("70-79"), 1);
        assert_eq!(dist.count_for("60-69"), 0);
        assert_eq!(dist.count_for("50-59"), 1);
        assert_eq!(dist.count_for("0-49"), 1);

        let sum: f64 = dist.bands.iter().map(|b| b.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_band_edges() {
        let dist = distribute([90.0, 89.5, 50.0, 49.99, 0.0], &DEFAULT_BANDS);
        assert_eq!(dist.count_for("90-100"), 1);
        assert_eq!(dist.count_for("80-89"), 1);
        assert_eq!(dist.count_for("50-59"), 1);
        assert_eq!(dist.count_for("0-49"), 2);
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        let dist = distribute([105.0, -3.0, f64::NAN], &DEFAULT_BANDS);
        assert_eq!(dist.total, 2);
        assert_eq!(dist.count_for("90-100"), 1);
        assert_eq!(dist.count_for("0-49"), 1);
    }

    #[test]
    fn test_empty_distribution_labels() {
        let dist = distribute(std::iter::empty(), &DEFAULT_BANDS);
        assert!(dist.is_empty());
        assert!(dist.bands.iter().all(|b| b.percentage == 0.0));
        assert_eq!(dist.percentage_label(&dist.bands[0]), "N/A");
    }

    #[test]
    fn test_percentage_label() {
        let dist = distribute([95.0, 40.0, 41.0], &DEFAULT_BANDS);
        assert_eq!(dist.percentage_label(&dist.bands[0]), "33.3%");
        assert_eq!(dist.percentage_label(&dist.bands[5]), "66.7%");
    }
}
