//! Client-side validated submissions: bulk attendance marking and reviews.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::api::Resource;
use crate::cache::QueryCache;
use crate::error::ApiError;
use crate::notify::{Notification, Notifier, Severity};
use crate::records::{AttendanceStatus, flexible_date};

/// Shortest review comment accepted, in characters after trimming.
pub const MIN_REVIEW_COMMENT_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    pub student_id: String,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAttendance {
    pub class_id: String,
    #[serde(with = "flexible_date")]
    pub date: NaiveDate,
    pub entries: Vec<AttendanceMark>,
}

impl BulkAttendance {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.class_id.trim().is_empty() {
            return Err(ApiError::validation("classId", "a class is required"));
        }
        if self.entries.is_empty() {
            return Err(ApiError::validation("entries", "mark at least one student"));
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            if entry.status == AttendanceStatus::Unknown {
                return Err(ApiError::validation(
                    "status",
                    format!("no status selected for student {}", entry.student_id),
                ));
            }
            if !seen.insert(entry.student_id.as_str()) {
                return Err(ApiError::validation(
                    "entries",
                    format!("student {} is marked more than once", entry.student_id),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub teacher_id: String,
    pub subject_id: String,
    pub rating: u8,
    pub comment: String,
}

impl ReviewSubmission {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.teacher_id.trim().is_empty() {
            return Err(ApiError::validation("teacherId", "a teacher is required"));
        }
        if !(1..=5).contains(&self.rating) {
            return Err(ApiError::validation("rating", "rating must be between 1 and 5"));
        }
        if self.comment.trim().chars().count() < MIN_REVIEW_COMMENT_LEN {
            return Err(ApiError::validation(
                "comment",
                format!("comment must be at least {MIN_REVIEW_COMMENT_LEN} characters"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Attendance(BulkAttendance),
    Review(ReviewSubmission),
}

impl Submission {
    pub fn path(&self) -> &'static str {
        match self {
            Submission::Attendance(_) => "attendance/bulk",
            Submission::Review(_) => "reviews",
        }
    }

    /// The resource whose cached queries this submission makes stale.
    pub fn resource(&self) -> Resource {
        match self {
            Submission::Attendance(_) => Resource::Attendance,
            Submission::Review(_) => Resource::Reviews,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Submission::Attendance(_) => "Attendance",
            Submission::Review(_) => "Review",
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        match self {
            Submission::Attendance(a) => a.validate(),
            Submission::Review(r) => r.validate(),
        }
    }

    pub fn payload(&self) -> Result<Value, ApiError> {
        let value = match self {
            Submission::Attendance(a) => serde_json::to_value(a)?,
            Submission::Review(r) => {
                let mut review = r.clone();
                review.comment = review.comment.trim().to_string();
                serde_json::to_value(review)?
            }
        };
        Ok(value)
    }
}

#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, submission: &Submission) -> Result<Value, ApiError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Accepted,
    /// Failed client-side validation; nothing was sent.
    Rejected { field: &'static str, message: String },
    Failed { message: String, retryable: bool },
}

/// Validates and sends `submission`, reporting the result through `notifier`.
///
/// On success every cached query for the affected resource is invalidated.
/// The submission is borrowed so the caller still holds it for a retry.
#[tracing::instrument(skip_all, fields(kind = submission.kind()))]
pub async fn submit_and_notify(
    submitter: &dyn Submitter,
    notifier: &dyn Notifier,
    cache: &QueryCache,
    submission: &Submission,
) -> SubmissionOutcome {
    if let Err(e) = submission.validate() {
        let (field, message) = match e {
            ApiError::Validation { field, message } => (field, message),
            other => ("", other.to_string()),
        };
        notifier.notify(Notification::new(Severity::Warning, message.clone()));
        return SubmissionOutcome::Rejected { field, message };
    }

    match submitter.submit(submission).await {
        Ok(_) => {
            let invalidated = cache.invalidate_resource(submission.resource());
            info!(invalidated, "Submission accepted");
            notifier.notify(Notification::new(
                Severity::Success,
                format!("{} saved", submission.kind()),
            ));
            SubmissionOutcome::Accepted
        }
        Err(e) => {
            let retryable = e.is_retryable();
            warn!(error = %e, retryable, "Submission failed");
            let message = format!("{} could not be saved: {e}", submission.kind());
            notifier.notify(Notification::new(Severity::Error, message.clone()));
            SubmissionOutcome::Failed { message, retryable }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RecordFilter;
    use crate::cache::QueryKey;
    use crate::notify::MemoryNotifier;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct FakeSubmitter {
        status: Option<u16>,
        sent: Mutex<Vec<Value>>,
    }

    impl FakeSubmitter {
        fn ok() -> Self {
            Self { status: None, sent: Mutex::new(Vec::new()) }
        }

        fn failing(status: u16) -> Self {
            Self { status: Some(status), sent: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Submitter for FakeSubmitter {
        async fn submit(&self, submission: &Submission) -> Result<Value, ApiError> {
            self.sent.lock().unwrap().push(submission.payload()?);
            match self.status {
                None => Ok(json!({ "ok": true })),
                Some(status) => Err(ApiError::Status { status, body: "nope".into() }),
            }
        }
    }

    fn review(rating: u8, comment: &str) -> Submission {
        Submission::Review(ReviewSubmission {
            teacher_id: "t1".into(),
            subject_id: "math".into(),
            rating,
            comment: comment.into(),
        })
    }

    fn attendance(entries: Vec<(&str, AttendanceStatus)>) -> Submission {
        Submission::Attendance(BulkAttendance {
            class_id: "7B".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            entries: entries
                .into_iter()
                .map(|(student, status)| AttendanceMark {
                    student_id: student.into(),
                    status,
                    remarks: None,
                })
                .collect(),
        })
    }

    #[test]
    fn test_review_validation() {
        assert!(review(5, "Explains things clearly").validate().is_ok());
        assert!(matches!(
            review(0, "Explains things clearly").validate(),
            Err(ApiError::Validation { field: "rating", .. })
        ));
        assert!(matches!(
            review(4, "   too short   ").validate(),
            Err(ApiError::Validation { field: "comment", .. })
        ));
    }

    #[test]
    fn test_attendance_validation() {
        assert!(attendance(vec![("s1", AttendanceStatus::Present)]).validate().is_ok());
        assert!(attendance(vec![]).validate().is_err());
        assert!(
            attendance(vec![("s1", AttendanceStatus::Present), ("s1", AttendanceStatus::Late)])
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_attendance_payload_shape() {
        let payload = attendance(vec![("s1", AttendanceStatus::Excused)]).payload().unwrap();
        assert_eq!(
            payload,
            json!({ "classId": "7B", "date": "2024-03-04",
                    "entries": [{ "studentId": "s1", "status": "excused" }] })
        );
    }

    #[tokio::test]
    async fn test_rejected_submission_is_not_sent() {
        let submitter = FakeSubmitter::ok();
        let notifier = MemoryNotifier::new();
        let cache = QueryCache::new();

        let outcome = submit_and_notify(&submitter, &notifier, &cache, &review(3, "meh")).await;

        assert!(matches!(outcome, SubmissionOutcome::Rejected { field: "comment", .. }));
        assert!(submitter.sent.lock().unwrap().is_empty());
        assert_eq!(notifier.notifications()[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_accepted_submission_invalidates_cache() {
        let submitter = FakeSubmitter::ok();
        let notifier = MemoryNotifier::new();
        let cache = QueryCache::new();
        let key = QueryKey::new(Resource::Attendance, &RecordFilter::default());
        let ticket = cache.begin_fetch(key.clone());
        cache.complete(ticket, Arc::new(json!([])));

        let submission = attendance(vec![("s1", AttendanceStatus::Present)]);
        let outcome = submit_and_notify(&submitter, &notifier, &cache, &submission).await;

        assert_eq!(outcome, SubmissionOutcome::Accepted);
        assert!(cache.get(&key, Duration::from_secs(60)).is_none());
        assert_eq!(notifier.notifications()[0].message, "Attendance saved");
    }

    #[tokio::test]
    async fn test_failed_submission_reports_retryability() {
        let notifier = MemoryNotifier::new();
        let cache = QueryCache::new();
        let submission = review(4, "Great at explaining fractions");

        let outcome =
            submit_and_notify(&FakeSubmitter::failing(503), &notifier, &cache, &submission).await;
        assert!(matches!(outcome, SubmissionOutcome::Failed { retryable: true, .. }));

        let outcome =
            submit_and_notify(&FakeSubmitter::failing(400), &notifier, &cache, &submission).await;
        assert!(matches!(outcome, SubmissionOutcome::Failed { retryable: false, .. }));

        let sent = notifier.notifications();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|n| n.severity == Severity::Error));
    }
}
