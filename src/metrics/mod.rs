//! Derived metrics over school records.
//!
//! Everything in this module is a pure function of its input: averages,
//! score distributions, trend classification, rankings, level labels and
//! per-month groupings.

pub mod distribution;
pub mod level;
pub mod periods;
pub mod ranking;
pub mod summary;
pub mod trend;
pub mod types;
pub mod utility;

pub use utility::average;
