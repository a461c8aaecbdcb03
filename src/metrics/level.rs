//! Fixed-threshold classification of scores and rates into ordinal labels.

use serde::Serialize;
use std::fmt;

/// Performance band for a percentage score.
///
/// | Range  | Level         |
/// |--------|---------------|
/// | >= 80  | Excellent     |
/// | >= 70  | Good          |
/// | >= 60  | Average       |
/// | < 60   | Below Average |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PerformanceLevel {
    #[serde(rename = "Below Average")]
    BelowAverage,
    Average,
    Good,
    Excellent,
}

impl PerformanceLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => PerformanceLevel::Excellent,
            s if s >= 70.0 => PerformanceLevel::Good,
            s if s >= 60.0 => PerformanceLevel::Average,
            _ => PerformanceLevel::BelowAverage,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PerformanceLevel::Excellent => "Excellent",
            PerformanceLevel::Good => "Good",
            PerformanceLevel::Average => "Average",
            PerformanceLevel::BelowAverage => "Below Average",
        }
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Converts a percentage score into a letter grade.
///
/// | Range  | Grade |
/// |--------|-------|
/// | >= 90  | A     |
/// | >= 80  | B     |
/// | >= 70  | C     |
/// | >= 60  | D     |
/// | < 60   | F     |
pub fn letter_grade(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "A",
        s if s >= 80.0 => "B",
        s if s >= 70.0 => "C",
        s if s >= 60.0 => "D",
        _ => "F",
    }
}

/// Absence risk derived from an attendance rate (percent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceRisk {
    Low,
    Medium,
    High,
}

impl AttendanceRisk {
    pub fn from_rate(rate: f64) -> Self {
        match rate {
            r if r >= 90.0 => AttendanceRisk::Low,
            r if r >= 75.0 => AttendanceRisk::Medium,
            _ => AttendanceRisk::High,
        }
    }
}
