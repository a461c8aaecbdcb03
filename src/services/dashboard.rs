//! Combined dashboard built from every resource.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::api::{RecordFilter, Resource};
use crate::cache::QueryCache;
use crate::error::ApiError;
use crate::metrics::periods::{MonthlyInvoices, monthly_invoices};
use crate::metrics::summary::{summarize_attendance, summarize_finance, summarize_grades, summarize_reviews};
use crate::metrics::types::{AttendanceSummary, FinanceSummary, GradeSummary, ReviewSummary};
use crate::records::{AttendanceRecord, GradeRecord, InvoiceRecord, PaymentRecord, ReviewRecord};
use crate::services::record_source::{RecordSource, load_cached};

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub grades: GradeSummary,
    pub attendance: AttendanceSummary,
    pub finance: FinanceSummary,
    pub monthly_invoices: Vec<MonthlyInvoices>,
    pub reviews: ReviewSummary,
}

impl DashboardSnapshot {
    pub fn build(
        grades: &[GradeRecord],
        attendance: &[AttendanceRecord],
        invoices: &[InvoiceRecord],
        payments: &[PaymentRecord],
        reviews: &[ReviewRecord],
        as_of: NaiveDate,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            grades: summarize_grades(grades),
            attendance: summarize_attendance(attendance),
            finance: summarize_finance(invoices, payments, as_of),
            monthly_invoices: monthly_invoices(invoices),
            reviews: summarize_reviews(reviews),
        }
    }

    pub fn to_row(&self) -> DashboardRow {
        DashboardRow {
            timestamp: self.generated_at,
            grade_count: self.grades.count,
            average_score: self.grades.average,
            pass_rate: self.grades.pass_rate,
            attendance_records: self.attendance.total,
            attendance_rate: self.attendance.attendance_rate,
            absences: self.attendance.absent,
            total_invoiced: self.finance.total_invoiced,
            total_outstanding: self.finance.total_outstanding,
            collection_rate: self.finance.collection_rate,
            overdue_count: self.finance.overdue_count,
            review_count: self.reviews.count,
            average_rating: self.reviews.average_rating,
            error_type: None,
            error_message: None,
        }
    }
}

/// One sample of the dashboard, flattened for CSV.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRow {
    pub timestamp: DateTime<Utc>,
    pub grade_count: usize,
    pub average_score: f64,
    pub pass_rate: f64,
    pub attendance_records: usize,
    pub attendance_rate: f64,
    pub absences: usize,
    pub total_invoiced: f64,
    pub total_outstanding: f64,
    pub collection_rate: f64,
    pub overdue_count: usize,
    pub review_count: usize,
    pub average_rating: f64,

    // error tracking
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl DashboardRow {
    /// A sample that could not be taken.
    pub fn from_error(error_type: &str, error_message: &str) -> Self {
        DashboardRow {
            timestamp: Utc::now(),
            error_type: Some(error_type.to_string()),
            error_message: Some(error_message.to_string()),
            ..Default::default()
        }
    }
}

/// Fetches all resources concurrently through the query cache and builds the
/// dashboard.
#[tracing::instrument(skip_all)]
pub async fn load_dashboard(
    source: &dyn RecordSource,
    cache: &QueryCache,
    filter: &RecordFilter,
    max_age: Duration,
    as_of: NaiveDate,
) -> Result<DashboardSnapshot, ApiError> {
    let (grades, attendance, invoices, payments, reviews) = tokio::try_join!(
        load_cached::<GradeRecord>(source, cache, Resource::Grades, filter, max_age),
        load_cached::<AttendanceRecord>(source, cache, Resource::Attendance, filter, max_age),
        load_cached::<InvoiceRecord>(source, cache, Resource::Invoices, filter, max_age),
        load_cached::<PaymentRecord>(source, cache, Resource::Payments, filter, max_age),
        load_cached::<ReviewRecord>(source, cache, Resource::Reviews, filter, max_age),
    )?;

    Ok(DashboardSnapshot::build(
        &grades,
        &attendance,
        &invoices,
        &payments,
        &reviews,
        as_of,
    ))
}
