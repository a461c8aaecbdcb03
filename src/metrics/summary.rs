//! Summaries built from raw record collections.
//!
//! Every function here is total: empty input produces zeroed summaries, never
//! an error.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::metrics::distribution::{DEFAULT_BANDS, distribute};
use crate::metrics::level::{AttendanceRisk, PerformanceLevel, letter_grade};
use crate::metrics::ranking::{Ranked, TiePolicy, rank_by};
use crate::metrics::trend::classify_trend;
use crate::metrics::types::{
    AttendanceSummary, CategoryTotal, FinanceSummary, GradeSummary, RatingCount, ReviewSummary,
    StudentAttendance, StudentPerformance, SubjectAverage, TeacherRating,
};
use crate::metrics::utility::{mean, pct, ratio_pct, stddev};
use crate::records::{
    AttendanceRecord, AttendanceStatus, GradeRecord, InvoiceRecord, PaymentRecord, ReviewRecord,
};

/// Minimum percentage counted as a pass.
pub const PASS_MARK: f64 = 50.0;

/// Groups records by key, keeping groups in the order their key first appears.
fn group_by_first_seen<'a, T>(
    records: &'a [T],
    key: impl Fn(&'a T) -> &'a str,
) -> Vec<(&'a str, Vec<&'a T>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&T>)> = Vec::new();

    for record in records {
        let k = key(record);
        match index.get(k) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(k, groups.len());
                groups.push((k, vec![record]));
            }
        }
    }

    groups
}

pub fn summarize_grades(grades: &[GradeRecord]) -> GradeSummary {
    let scores: Vec<f64> = grades.iter().map(GradeRecord::percentage).collect();
    let average = mean(&scores);
    let passed = scores.iter().filter(|s| **s >= PASS_MARK).count();

    let (highest, lowest) = if scores.is_empty() {
        (0.0, 0.0)
    } else {
        scores
            .iter()
            .fold((f64::MIN, f64::MAX), |(hi, lo), s| (hi.max(*s), lo.min(*s)))
    };

    GradeSummary {
        count: scores.len(),
        average,
        highest,
        lowest,
        stddev: stddev(&scores, average),
        pass_rate: pct(passed, scores.len()),
        level: PerformanceLevel::from_score(average),
        letter_grade: letter_grade(average).to_string(),
        distribution: distribute(scores.iter().copied(), &DEFAULT_BANDS),
    }
}

/// Mean percentage per subject, in first-seen subject order.
pub fn subject_averages(grades: &[GradeRecord]) -> Vec<SubjectAverage> {
    group_by_first_seen(grades, |g| g.subject_id.as_str())
        .into_iter()
        .map(|(subject_id, group)| {
            let scores: Vec<f64> = group.iter().map(|g| g.percentage()).collect();
            let average = mean(&scores);
            SubjectAverage {
                subject_id: subject_id.to_string(),
                average,
                count: scores.len(),
                level: PerformanceLevel::from_score(average),
            }
        })
        .collect()
}

/// Per-student averages and trends, ranked by average.
///
/// The trend series for each student is their grades in date order.
pub fn student_performance(
    grades: &[GradeRecord],
    policy: TiePolicy,
) -> Vec<Ranked<StudentPerformance>> {
    let students: Vec<StudentPerformance> = group_by_first_seen(grades, |g| g.student_id.as_str())
        .into_iter()
        .map(|(student_id, mut group)| {
            group.sort_by_key(|g| g.date);
            let series: Vec<f64> = group.iter().map(|g| g.percentage()).collect();
            let average = mean(&series);
            StudentPerformance {
                student_id: student_id.to_string(),
                average,
                count: series.len(),
                level: PerformanceLevel::from_score(average),
                trend: classify_trend(&series),
            }
        })
        .collect();

    rank_by(students, |s| s.average, policy)
}

pub fn summarize_attendance(records: &[AttendanceRecord]) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        total: records.len(),
        ..Default::default()
    };

    for record in records {
        match record.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Late => summary.late += 1,
            AttendanceStatus::Excused => summary.excused += 1,
            AttendanceStatus::Unknown => {}
        }
    }

    summary.attendance_rate = pct(summary.present + summary.late, summary.total);
    summary
}

/// Attendance rate and risk per student, in first-seen order.
pub fn student_attendance(records: &[AttendanceRecord]) -> Vec<StudentAttendance> {
    group_by_first_seen(records, |r| r.student_id.as_str())
        .into_iter()
        .map(|(student_id, group)| {
            let attended = group.iter().filter(|r| r.status.is_attended()).count();
            let absences = group
                .iter()
                .filter(|r| r.status == AttendanceStatus::Absent)
                .count();
            let rate = pct(attended, group.len());
            StudentAttendance {
                student_id: student_id.to_string(),
                total: group.len(),
                attended,
                absences,
                rate,
                risk: AttendanceRisk::from_rate(rate),
            }
        })
        .collect()
}

/// Ratings outside 1..=5 are ignored.
pub fn summarize_reviews(reviews: &[ReviewRecord]) -> ReviewSummary {
    let valid: Vec<&ReviewRecord> = reviews
        .iter()
        .filter(|r| (1..=5).contains(&r.rating))
        .collect();

    let ratings: Vec<f64> = valid.iter().map(|r| r.rating as f64).collect();
    let replied = valid
        .iter()
        .filter(|r| r.reply.as_deref().is_some_and(|reply| !reply.trim().is_empty()))
        .count();

    let mut counts = [0usize; 5];
    for review in &valid {
        counts[(review.rating - 1) as usize] += 1;
    }
    let rating_counts = (1..=5u8)
        .rev()
        .map(|rating| {
            let count = counts[(rating - 1) as usize];
            RatingCount {
                rating,
                count,
                percentage: pct(count, valid.len()),
            }
        })
        .collect();

    let teachers: Vec<TeacherRating> = group_by_first_seen(&valid, |r| r.teacher_id.as_str())
        .into_iter()
        .map(|(teacher_id, group)| {
            let ratings: Vec<f64> = group.iter().map(|r| r.rating as f64).collect();
            TeacherRating {
                teacher_id: teacher_id.to_string(),
                average_rating: mean(&ratings),
                count: ratings.len(),
            }
        })
        .collect();

    ReviewSummary {
        count: valid.len(),
        average_rating: mean(&ratings),
        ratings: rating_counts,
        reply_rate: pct(replied, valid.len()),
        teachers: rank_by(teachers, |t| t.average_rating, TiePolicy::Sequential),
    }
}

/// Totals over invoices and payments. Overdue status is evaluated as of `as_of`.
pub fn summarize_finance(
    invoices: &[InvoiceRecord],
    payments: &[PaymentRecord],
    as_of: NaiveDate,
) -> FinanceSummary {
    let mut summary = FinanceSummary {
        invoice_count: invoices.len(),
        payment_count: payments.len(),
        payments_received: payments.iter().map(|p| p.amount).sum(),
        ..Default::default()
    };

    for invoice in invoices {
        summary.total_invoiced += invoice.amount;
        summary.total_paid += invoice.paid_amount;
        summary.total_outstanding += invoice.outstanding();
        if invoice.is_overdue(as_of) {
            summary.overdue_count += 1;
        }
    }
    summary.collection_rate = ratio_pct(summary.total_paid, summary.total_invoiced);

    summary.categories = group_by_first_seen(invoices, |i| i.category.as_str())
        .into_iter()
        .map(|(category, group)| CategoryTotal {
            category: category.to_string(),
            invoiced: group.iter().map(|i| i.amount).sum(),
            paid: group.iter().map(|i| i.paid_amount).sum(),
            outstanding: group.iter().map(|i| i.outstanding()).sum(),
            count: group.len(),
        })
        .collect();

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::trend::Trend;
    use crate::records::InvoiceStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn grade(student: &str, subject: &str, score: f64, day: u32) -> GradeRecord {
        GradeRecord {
            student_id: student.to_string(),
            class_id: "c1".to_string(),
            subject_id: subject.to_string(),
            score,
            max_score: 100.0,
            exam_type: "test".to_string(),
            date: date(2024, 3, day),
        }
    }

    fn attendance(student: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            student_id: student.to_string(),
            class_id: "c1".to_string(),
            date: date(2024, 3, 1),
            status,
            remarks: None,
        }
    }

    fn review(teacher: &str, rating: u8, reply: Option<&str>) -> ReviewRecord {
        ReviewRecord {
            teacher_id: teacher.to_string(),
            subject_id: "math".to_string(),
            rating,
            comment: "Clear explanations".to_string(),
            created_at: date(2024, 3, 1),
            reply: reply.map(str::to_string),
        }
    }

    #[test]
    fn test_summarize_grades() {
        let grades = vec![
            grade("s1", "math", 95.0, 1),
            grade("s2", "math", 82.0, 1),
            grade("s3", "math", 71.0, 1),
            grade("s4", "math", 58.0, 1),
            grade("s5", "math", 42.0, 1),
        ];
        let summary = summarize_grades(&grades);

        assert_eq!(summary.count, 5);
        assert!((summary.average - 69.6).abs() < 1e-9);
        assert_eq!(summary.highest, 95.0);
        assert_eq!(summary.lowest, 42.0);
        assert_eq!(summary.pass_rate, 80.0);
        assert_eq!(summary.level, PerformanceLevel::Average);
        assert_eq!(summary.letter_grade, "D");
        assert_eq!(summary.distribution.total, 5);
    }

    #[test]
    fn test_summarize_grades_empty() {
        let summary = summarize_grades(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average, 0.0);
        assert_eq!(summary.highest, 0.0);
        assert_eq!(summary.lowest, 0.0);
        assert_eq!(summary.pass_rate, 0.0);
        assert!(summary.distribution.is_empty());
    }

    #[test]
    fn test_subject_averages_first_seen_order() {
        let grades = vec![
            grade("s1", "science", 60.0, 1),
            grade("s1", "math", 90.0, 1),
            grade("s2", "science", 80.0, 1),
        ];
        let subjects = subject_averages(&grades);
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].subject_id, "science");
        assert_eq!(subjects[0].average, 70.0);
        assert_eq!(subjects[0].count, 2);
        assert_eq!(subjects[1].level, PerformanceLevel::Excellent);
    }

    #[test]
    fn test_student_performance_ranks_and_trends() {
        let grades = vec![
            grade("s1", "math", 90.0, 1),
            grade("s2", "math", 70.0, 1),
            grade("s1", "math", 90.0, 2),
            grade("s3", "math", 90.0, 1),
            // s2 improves: 70 -> 80 in date order
            grade("s2", "math", 80.0, 5),
        ];
        let ranked = student_performance(&grades, TiePolicy::Sequential);

        let order: Vec<_> = ranked
            .iter()
            .map(|r| (r.item.student_id.as_str(), r.rank))
            .collect();
        assert_eq!(order, vec![("s1", 1), ("s3", 2), ("s2", 3)]);
        assert_eq!(ranked[2].item.trend, Trend::Improving);
        assert_eq!(ranked[0].item.trend, Trend::Stable);
    }

    #[test]
    fn test_student_trend_uses_date_order() {
        let grades = vec![grade("s1", "math", 60.0, 20), grade("s1", "math", 90.0, 2)];
        let ranked = student_performance(&grades, TiePolicy::Sequential);
        assert_eq!(ranked[0].item.trend, Trend::Declining);
    }

    #[test]
    fn test_summarize_attendance() {
        let records = vec![
            attendance("s1", AttendanceStatus::Present),
            attendance("s1", AttendanceStatus::Late),
            attendance("s2", AttendanceStatus::Absent),
            attendance("s2", AttendanceStatus::Excused),
        ];
        let summary = summarize_attendance(&records);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.present, 1);
        assert_eq!(summary.late, 1);
        assert_eq!(summary.absent, 1);
        assert_eq!(summary.excused, 1);
        assert_eq!(summary.attendance_rate, 50.0);
    }

    #[test]
    fn test_summarize_attendance_empty() {
        let summary = summarize_attendance(&[]);
        assert_eq!(summary, AttendanceSummary::default());
    }

    #[test]
    fn test_student_attendance_risk() {
        let mut records = vec![attendance("s1", AttendanceStatus::Present); 9];
        records.push(attendance("s1", AttendanceStatus::Absent));
        records.push(attendance("s2", AttendanceStatus::Absent));
        records.push(attendance("s2", AttendanceStatus::Present));

        let students = student_attendance(&records);
        assert_eq!(students[0].student_id, "s1");
        assert_eq!(students[0].rate, 90.0);
        assert_eq!(students[0].risk, AttendanceRisk::Low);
        assert_eq!(students[1].absences, 1);
        assert_eq!(students[1].risk, AttendanceRisk::High);
    }

    #[test]
    fn test_summarize_reviews() {
        let reviews = vec![
            review("t1", 5, Some("Thanks!")),
            review("t1", 4, None),
            review("t2", 3, Some("   ")),
            review("t2", 9, None),
        ];
        let summary = summarize_reviews(&reviews);

        assert_eq!(summary.count, 3);
        assert_eq!(summary.average_rating, 4.0);
        assert_eq!(summary.ratings[0].rating, 5);
        assert_eq!(summary.ratings[0].count, 1);
        assert_eq!(summary.ratings.iter().map(|r| r.count).sum::<usize>(), 3);
        assert!((summary.reply_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.teachers[0].item.teacher_id, "t1");
        assert_eq!(summary.teachers[0].item.average_rating, 4.5);
        assert_eq!(summary.teachers[1].rank, 2);
    }

    #[test]
    fn test_summarize_finance() {
        let invoices = vec![
            InvoiceRecord {
                amount: 1000.0,
                paid_amount: 400.0,
                category: "tuition".to_string(),
                due_date: Some(date(2024, 1, 31)),
                created_at: date(2024, 1, 1),
                status: InvoiceStatus::Partial,
            },
            InvoiceRecord {
                amount: 200.0,
                paid_amount: 200.0,
                category: "transport".to_string(),
                due_date: Some(date(2024, 1, 31)),
                created_at: date(2024, 1, 1),
                status: InvoiceStatus::Paid,
            },
            InvoiceRecord {
                amount: 800.0,
                paid_amount: 0.0,
                category: "tuition".to_string(),
                due_date: Some(date(2024, 3, 31)),
                created_at: date(2024, 2, 1),
                status: InvoiceStatus::Unpaid,
            },
        ];
        let payments = vec![PaymentRecord {
            amount: 600.0,
            created_at: date(2024, 1, 15),
            method: "bank_transfer".to_string(),
        }];

        let summary = summarize_finance(&invoices, &payments, date(2024, 2, 15));

        assert_eq!(summary.invoice_count, 3);
        assert_eq!(summary.total_invoiced, 2000.0);
        assert_eq!(summary.total_paid, 600.0);
        assert_eq!(summary.total_outstanding, 1400.0);
        assert_eq!(summary.collection_rate, 30.0);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.payments_received, 600.0);
        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.categories[0].category, "tuition");
        assert_eq!(summary.categories[0].count, 2);
        assert_eq!(summary.categories[0].outstanding, 1400.0);
    }

    #[test]
    fn test_summarize_finance_empty() {
        let summary = summarize_finance(&[], &[], date(2024, 1, 1));
        assert_eq!(summary, FinanceSummary::default());
    }
}
