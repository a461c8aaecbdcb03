//! Aggregate shapes handed to reports and exports.

use serde::Serialize;

use crate::metrics::distribution::Distribution;
use crate::metrics::level::{AttendanceRisk, PerformanceLevel};
use crate::metrics::ranking::Ranked;
use crate::metrics::trend::Trend;

/// Class-wide view of a set of grades. Scores are percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub count: usize,
    pub average: f64,
    pub highest: f64,
    pub lowest: f64,
    pub stddev: f64,
    pub pass_rate: f64,
    pub level: PerformanceLevel,
    pub letter_grade: String,
    pub distribution: Distribution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectAverage {
    pub subject_id: String,
    pub average: f64,
    pub count: usize,
    pub level: PerformanceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentPerformance {
    pub student_id: String,
    pub average: f64,
    pub count: usize,
    pub level: PerformanceLevel,
    pub trend: Trend,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
    /// Present plus late over all records, in percent.
    pub attendance_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentAttendance {
    pub student_id: String,
    pub total: usize,
    pub attended: usize,
    pub absences: usize,
    pub rate: f64,
    pub risk: AttendanceRisk,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingCount {
    pub rating: u8,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeacherRating {
    pub teacher_id: String,
    pub average_rating: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub count: usize,
    pub average_rating: f64,
    pub ratings: Vec<RatingCount>,
    pub reply_rate: f64,
    pub teachers: Vec<Ranked<TeacherRating>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub invoiced: f64,
    pub paid: f64,
    pub outstanding: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinanceSummary {
    pub invoice_count: usize,
    pub total_invoiced: f64,
    pub total_paid: f64,
    pub total_outstanding: f64,
    /// Paid over invoiced, in percent.
    pub collection_rate: f64,
    pub overdue_count: usize,
    pub payment_count: usize,
    pub payments_received: f64,
    pub categories: Vec<CategoryTotal>,
}
