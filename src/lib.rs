pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod output;
pub mod records;
pub mod refresh;
pub mod services;
