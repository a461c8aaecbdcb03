//! HTTP access to the school API and normalization of its responses.
//!
//! The backend is inconsistent about response shapes: list endpoints return
//! either a bare array, an object wrapping the array in `data`, or `null`
//! when there is nothing to return. [`normalize_records`] is the one place
//! those shapes are reconciled; everything past it sees `Vec<T>`.

mod auth;
mod basic;
mod client;
pub mod school;

pub use auth::BearerAuth;
pub use basic::BasicClient;
pub use client::HttpClient;
pub use school::SchoolApi;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::records::flexible_date;

/// A record collection exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Grades,
    Attendance,
    Invoices,
    Payments,
    Reviews,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Grades,
        Resource::Attendance,
        Resource::Invoices,
        Resource::Payments,
        Resource::Reviews,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Resource::Grades => "grades",
            Resource::Attendance => "attendance",
            Resource::Invoices => "invoices",
            Resource::Payments => "payments",
            Resource::Reviews => "reviews",
        }
    }

    /// Path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Grades => "grades",
            Resource::Attendance => "attendance",
            Resource::Invoices => "finance/invoices",
            Resource::Payments => "finance/payments",
            Resource::Reviews => "reviews",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<_> = Resource::ALL.iter().map(|r| r.name()).collect();
                format!("unknown resource '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Query filters shared by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordFilter {
    pub class_id: Option<String>,
    pub student_id: Option<String>,
    pub subject_id: Option<String>,
    pub teacher_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

const DATE_FIELDS: [&str; 3] = ["date", "createdAt", "paidAt"];

impl RecordFilter {
    /// Query parameters in a fixed order, so equal filters produce equal keys.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = &self.class_id {
            pairs.push(("classId", v.clone()));
        }
        if let Some(d) = self.from {
            pairs.push(("from", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(v) = &self.student_id {
            pairs.push(("studentId", v.clone()));
        }
        if let Some(v) = &self.subject_id {
            pairs.push(("subjectId", v.clone()));
        }
        if let Some(v) = &self.teacher_id {
            pairs.push(("teacherId", v.clone()));
        }
        if let Some(d) = self.to {
            pairs.push(("to", d.format("%Y-%m-%d").to_string()));
        }
        pairs
    }

    /// Applies the filter to a raw JSON record. Fields the record does not
    /// carry are not filtered on.
    pub fn matches(&self, item: &Value) -> bool {
        let field_ok = |name: &str, wanted: &Option<String>| match (wanted, item.get(name)) {
            (Some(wanted), Some(Value::String(actual))) => actual == wanted,
            (Some(wanted), Some(Value::Number(actual))) => actual.to_string() == *wanted,
            _ => true,
        };

        if !(field_ok("classId", &self.class_id)
            && field_ok("studentId", &self.student_id)
            && field_ok("subjectId", &self.subject_id)
            && field_ok("teacherId", &self.teacher_id))
        {
            return false;
        }

        if self.from.is_none() && self.to.is_none() {
            return true;
        }

        let date = DATE_FIELDS
            .iter()
            .find_map(|name| item.get(*name).and_then(Value::as_str))
            .and_then(flexible_date::parse);

        match date {
            Some(date) => {
                self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
            }
            None => true,
        }
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Maps any list response shape into records.
///
/// `null` becomes an empty list, `{ "data": ... }` is unwrapped (repeatedly),
/// and a bare array is decoded item by item. Items that fail to decode are
/// dropped and logged rather than failing the whole response.
pub fn normalize_records<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        Value::Object(mut map) => {
            return match map.remove("data") {
                Some(data) => normalize_records(data),
                None => Err(ApiError::UnexpectedShape(
                    "object without a `data` field".to_string(),
                )),
            };
        }
        other => {
            return Err(ApiError::UnexpectedShape(format!(
                "expected a list, found {}",
                shape_name(&other)
            )));
        }
    };

    let total = items.len();
    let mut records = Vec::with_capacity(total);
    let mut skipped = 0usize;

    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                debug!(error = %e, "Record failed to decode");
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, total, "Dropped records that failed to decode");
    }

    Ok(records)
}
