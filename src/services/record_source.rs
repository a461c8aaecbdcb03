//! Where records come from: the live API or a local snapshot file.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::api::{RecordFilter, Resource, normalize_records};
use crate::cache::{QueryCache, QueryKey};
use crate::error::ApiError;

/// Anything that can return the raw JSON for a resource list.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_raw(&self, resource: Resource, filter: &RecordFilter) -> Result<Value, ApiError>;
}

/// Records read from a JSON file shaped like
///
/// ```json
/// { "grades": [...], "attendance": { "data": [...] }, "invoices": null }
/// ```
///
/// Each resource may use any shape the API itself returns. Filters are applied
/// locally.
pub struct SnapshotSource {
    resources: HashMap<Resource, Value>,
}

impl SnapshotSource {
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        let Value::Object(mut map) = value else {
            return Err(ApiError::UnexpectedShape(
                "snapshot must be an object keyed by resource".to_string(),
            ));
        };

        let resources = Resource::ALL
            .into_iter()
            .filter_map(|r| map.remove(r.name()).map(|v| (r, v)))
            .collect();

        Ok(Self { resources })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("snapshot {} is not valid JSON", path.display()))?;
        Ok(Self::from_value(value)?)
    }
}

fn filter_items(value: &Value, filter: &RecordFilter) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().filter(|i| filter.matches(i)).cloned().collect()),
        Value::Object(map) => match map.get("data") {
            Some(data) => filter_items(data, filter),
            None => value.clone(),
        },
        other => other.clone(),
    }
}

#[async_trait]
impl RecordSource for SnapshotSource {
    async fn fetch_raw(&self, resource: Resource, filter: &RecordFilter) -> Result<Value, ApiError> {
        Ok(self
            .resources
            .get(&resource)
            .map(|v| filter_items(v, filter))
            .unwrap_or(Value::Null))
    }
}

/// Fetches and normalizes one resource.
pub async fn load_records<T: DeserializeOwned>(
    source: &dyn RecordSource,
    resource: Resource,
    filter: &RecordFilter,
) -> Result<Vec<T>, ApiError> {
    let raw = source.fetch_raw(resource, filter).await?;
    let records = normalize_records(raw)?;
    info!(resource = %resource, count = records.len(), "Records loaded");
    Ok(records)
}

/// Like [`load_records`], answering from `cache` when it holds a value
/// younger than `max_age`.
///
/// A fetch superseded while in flight is not returned. The caller gets the
/// value stored by the newer fetch, or one refetch made after the
/// invalidation.
pub async fn load_cached<T: DeserializeOwned>(
    source: &dyn RecordSource,
    cache: &QueryCache,
    resource: Resource,
    filter: &RecordFilter,
    max_age: Duration,
) -> Result<Vec<T>, ApiError> {
    let key = QueryKey::new(resource, filter);

    if let Some(hit) = cache.get(&key, max_age) {
        debug!(key = %key, "Query cache hit");
        return normalize_records(Value::clone(&hit));
    }

    let started = Instant::now();
    let raw = match fetch_ticketed(source, cache, &key, filter).await? {
        Some(raw) => raw,
        None => match cache.get_since(&key, started) {
            Some(newer) => {
                debug!(key = %key, "Fetch superseded, using the newer result");
                newer
            }
            None => {
                debug!(key = %key, "Fetch superseded, refetching");
                let ticket = cache.begin_fetch(key.clone());
                let raw = Arc::new(source.fetch_raw(resource, filter).await?);
                cache.complete(ticket, Arc::clone(&raw));
                raw
            }
        },
    };

    let records = normalize_records(Value::clone(&raw))?;
    info!(resource = %resource, count = records.len(), "Records loaded");
    Ok(records)
}

/// Fetches under a cache ticket. `None` when the fetch was superseded.
async fn fetch_ticketed(
    source: &dyn RecordSource,
    cache: &QueryCache,
    key: &QueryKey,
    filter: &RecordFilter,
) -> Result<Option<Arc<Value>>, ApiError> {
    let ticket = cache.begin_fetch(key.clone());
    let raw = Arc::new(source.fetch_raw(key.resource, filter).await?);
    Ok(cache.complete(ticket, Arc::clone(&raw)).then_some(raw))
}
