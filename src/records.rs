//! Record types returned by the school API.
//!
//! These are read-only snapshots of backend-owned entities. Fields the backend
//! omits or sends as `null` default to zero or empty so that aggregation never
//! has to deal with missing values, and ids are accepted as strings or numbers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single assessment result for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    pub student_id: String,
    #[serde(default, deserialize_with = "lenient::id")]
    pub class_id: String,
    #[serde(default, deserialize_with = "lenient::id")]
    pub subject_id: String,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub score: f64,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub max_score: f64,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub exam_type: String,
    #[serde(with = "flexible_date")]
    pub date: NaiveDate,
}

impl GradeRecord {
    /// Score as a percentage of `max_score`.
    ///
    /// Falls back to the raw score when `max_score` is missing or zero, which
    /// is how the backend reports grades already expressed out of 100.
    pub fn percentage(&self) -> f64 {
        if self.max_score > 0.0 {
            self.score / self.max_score * 100.0
        } else {
            self.score
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
    #[default]
    #[serde(other)]
    Unknown,
}

impl AttendanceStatus {
    /// Present and late both count as attended.
    pub fn is_attended(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    pub student_id: String,
    #[serde(default, deserialize_with = "lenient::id")]
    pub class_id: String,
    #[serde(with = "flexible_date")]
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub status: AttendanceStatus,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Paid,
    Partial,
    Unpaid,
    Overdue,
    Cancelled,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub paid_amount: f64,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub category: String,
    #[serde(default, with = "flexible_date::option")]
    pub due_date: Option<NaiveDate>,
    #[serde(with = "flexible_date")]
    pub created_at: NaiveDate,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub status: InvoiceStatus,
}

impl InvoiceRecord {
    /// Amount still owed, never negative.
    pub fn outstanding(&self) -> f64 {
        (self.amount - self.paid_amount).max(0.0)
    }

    /// Whether the invoice is past due with a balance remaining on `as_of`.
    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        if self.status == InvoiceStatus::Cancelled || self.outstanding() <= 0.0 {
            return false;
        }
        self.status == InvoiceStatus::Overdue || self.due_date.is_some_and(|due| due < as_of)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub amount: f64,
    #[serde(alias = "paidAt", with = "flexible_date")]
    pub created_at: NaiveDate,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    pub teacher_id: String,
    #[serde(default, deserialize_with = "lenient::id")]
    pub subject_id: String,
    /// 1 to 5. Anything else is left out of review summaries.
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub rating: u8,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub comment: String,
    #[serde(with = "flexible_date")]
    pub created_at: NaiveDate,
    #[serde(default)]
    pub reply: Option<String>,
}

/// Decoders for values the backend sends as `null` or with loose types.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer, de::Error};
    use serde_json::Value;

    /// `null` decodes to the type's default.
    pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// Ids arrive as strings or numbers. `null` becomes an empty id.
    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(String::new()),
            Value::String(id) => Ok(id),
            Value::Number(id) => Ok(id.to_string()),
            other => Err(D::Error::custom(format!("invalid id: {other}"))),
        }
    }
}

/// Accepts either a plain `YYYY-MM-DD` date or an RFC 3339 timestamp and keeps
/// the calendar date. Serializes as `YYYY-MM-DD`.
pub(crate) mod flexible_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, FORMAT)
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
            .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, FORMAT).ok()))
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {raw}")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        /// Unparseable or empty values become `None` rather than failing the record.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            Ok(raw.as_deref().and_then(parse))
        }
    }
}
