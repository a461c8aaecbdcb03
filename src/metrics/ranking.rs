//! Descending ranking by a numeric key.

use serde::Serialize;
use std::cmp::Ordering;

/// How equal keys are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiePolicy {
    /// rank = position + 1; equal keys keep their input order (`90, 90, 70` -> `1, 2, 3`).
    #[default]
    Sequential,
    /// Equal keys share the better rank and the next rank is skipped (`1, 1, 3`).
    Shared,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked<T> {
    pub rank: usize,
    #[serde(flatten)]
    pub item: T,
}

/// Sorts `items` by `key` descending with a stable sort and assigns ranks.
/// NaN keys sort last.
pub fn rank_by<T>(items: Vec<T>, key: impl Fn(&T) -> f64, policy: TiePolicy) -> Vec<Ranked<T>> {
    let mut keyed: Vec<(f64, T)> = items
        .into_iter()
        .map(|item| {
            let k = key(&item);
            (if k.is_nan() { f64::NEG_INFINITY } else { k }, item)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(Ordering::Equal));

    let mut ranked = Vec::with_capacity(keyed.len());
    let mut previous: Option<(f64, usize)> = None;

    for (index, (k, item)) in keyed.into_iter().enumerate() {
        let rank = match (policy, previous) {
            (TiePolicy::Shared, Some((prev_key, prev_rank))) if prev_key == k => prev_rank,
            _ => index + 1,
        };
        previous = Some((k, rank));
        ranked.push(Ranked { rank, item });
    }

    ranked
}
