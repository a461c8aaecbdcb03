//! Orchestration between the API boundary and the metrics layer.

pub mod dashboard;
pub mod record_source;
pub mod submission;
