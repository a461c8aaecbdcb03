//! Query cache keyed by resource and filter.
//!
//! Each key carries a generation counter. A fetch takes a ticket with the
//! generation current at the time it starts; when it finishes its result is
//! stored only if no newer fetch or invalidation has happened since. This is
//! how superseded responses are kept out of the cache.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::api::{RecordFilter, Resource};

const KEY_PREFIX: &str = "school_metrics";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: Resource,
    params: Vec<(&'static str, String)>,
}

impl QueryKey {
    pub fn new(resource: Resource, filter: &RecordFilter) -> Self {
        Self {
            resource,
            params: filter.query_pairs(),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", KEY_PREFIX, self.resource)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, ":{}", params.join("&"))?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
}

struct Entry {
    value: Arc<Value>,
    stored_at: Instant,
}

struct Slot {
    generation: u64,
    entry: Option<Entry>,
}

#[derive(Default)]
struct Slots {
    // Shared by every key so a removed slot can never be confused with a
    // later one for the same key.
    last_generation: u64,
    by_key: HashMap<QueryKey, Slot>,
}

#[derive(Default)]
pub struct QueryCache {
    slots: Mutex<Slots>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value for `key` if it is younger than `max_age`.
    pub fn get(&self, key: &QueryKey, max_age: Duration) -> Option<Arc<Value>> {
        let slots = self.slots();
        let entry = slots.by_key.get(key)?.entry.as_ref()?;
        (entry.stored_at.elapsed() <= max_age).then(|| Arc::clone(&entry.value))
    }

    /// Cached value for `key` if it was stored at or after `since`.
    pub fn get_since(&self, key: &QueryKey, since: Instant) -> Option<Arc<Value>> {
        let slots = self.slots();
        let entry = slots.by_key.get(key)?.entry.as_ref()?;
        (entry.stored_at >= since).then(|| Arc::clone(&entry.value))
    }

    /// Registers a new fetch for `key`, superseding any fetch still in flight.
    pub fn begin_fetch(&self, key: QueryKey) -> FetchTicket {
        let mut slots = self.slots();
        slots.last_generation += 1;
        let generation = slots.last_generation;
        slots
            .by_key
            .entry(key.clone())
            .or_insert(Slot {
                generation,
                entry: None,
            })
            .generation = generation;
        FetchTicket { key, generation }
    }

    /// Stores the result of a fetch. Returns `false` and discards `value` when
    /// the ticket has been superseded.
    pub fn complete(&self, ticket: FetchTicket, value: Arc<Value>) -> bool {
        let mut slots = self.slots();
        match slots.by_key.get_mut(&ticket.key) {
            Some(slot) if slot.generation == ticket.generation => {
                slot.entry = Some(Entry {
                    value,
                    stored_at: Instant::now(),
                });
                true
            }
            _ => false,
        }
    }

    /// Drops every key for `resource`, which also supersedes fetches in flight
    /// for it. Returns the number of entries removed.
    pub fn invalidate_resource(&self, resource: Resource) -> usize {
        let mut slots = self.slots();
        let mut removed = 0;
        slots.by_key.retain(|key, slot| {
            if key.resource != resource {
                return true;
            }
            if slot.entry.is_some() {
                removed += 1;
            }
            false
        });
        removed
    }

    /// Number of keys holding a value.
    pub fn len(&self) -> usize {
        self.slots().by_key.values().filter(|s| s.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
