//! Calendar-month grouping of dated records.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::metrics::utility::mean;
use crate::records::{GradeRecord, InvoiceRecord, PaymentRecord};

/// Year and month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `"MMM YYYY"`, e.g. `"Mar 2024"`.
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%b %Y").to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyInvoices {
    pub month: String,
    pub invoiced: f64,
    pub paid: f64,
    pub outstanding: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPayments {
    pub month: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyScore {
    pub month: String,
    pub average: f64,
    pub count: usize,
}

/// Invoice totals per month of `created_at`, oldest month first.
pub fn monthly_invoices(invoices: &[InvoiceRecord]) -> Vec<MonthlyInvoices> {
    let mut groups: BTreeMap<MonthKey, (f64, f64, f64, usize)> = BTreeMap::new();

    for invoice in invoices {
        let entry = groups.entry(MonthKey::of(invoice.created_at)).or_default();
        entry.0 += invoice.amount;
        entry.1 += invoice.paid_amount;
        entry.2 += invoice.outstanding();
        entry.3 += 1;
    }

    groups
        .into_iter()
        .map(|(key, (invoiced, paid, outstanding, count))| MonthlyInvoices {
            month: key.label(),
            invoiced,
            paid,
            outstanding,
            count,
        })
        .collect()
}

/// Payment totals per month, oldest month first.
pub fn monthly_payments(payments: &[PaymentRecord]) -> Vec<MonthlyPayments> {
    let mut groups: BTreeMap<MonthKey, (f64, usize)> = BTreeMap::new();

    for payment in payments {
        let entry = groups.entry(MonthKey::of(payment.created_at)).or_default();
        entry.0 += payment.amount;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(key, (total, count))| MonthlyPayments {
            month: key.label(),
            total,
            count,
        })
        .collect()
}

/// Mean grade percentage per month, oldest month first.
pub fn monthly_scores(grades: &[GradeRecord]) -> Vec<MonthlyScore> {
    let mut groups: BTreeMap<MonthKey, Vec<f64>> = BTreeMap::new();

    for grade in grades {
        groups
            .entry(MonthKey::of(grade.date))
            .or_default()
            .push(grade.percentage());
    }

    groups
        .into_iter()
        .map(|(key, scores)| MonthlyScore {
            month: key.label(),
            average: mean(&scores),
            count: scores.len(),
        })
        .collect()
}
