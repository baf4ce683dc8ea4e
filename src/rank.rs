//! Leaderboard ranking with minimum-rank tie sharing
//!
//! Climbers with equal values share a rank equal to one plus the number of
//! climbers strictly ahead of them, so `[10, 10, 8]` ranks as `[1, 1, 3]`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One leaderboard line
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry<V> {
    pub rank: usize,
    pub climber: String,
    pub value: V,
}

/// Sorts climbers by value, highest first, and assigns shared ranks
///
/// The sort is stable over the map's key order, so ties are listed by
/// climber name and the same input always yields the same sequence.
pub fn rank<V>(values: &BTreeMap<String, V>) -> Vec<RankedEntry<V>>
where
    V: PartialOrd + Clone,
{
    let mut sorted: Vec<(&String, &V)> = values.iter().collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(Ordering::Equal));

    let mut ranked: Vec<RankedEntry<V>> = Vec::with_capacity(sorted.len());
    for (idx, (climber, value)) in sorted.into_iter().enumerate() {
        let rank = match ranked.last() {
            Some(prev) if prev.value.partial_cmp(value) == Some(Ordering::Equal) => prev.rank,
            _ => idx + 1,
        };

        ranked.push(RankedEntry {
            rank,
            climber: climber.clone(),
            value: value.clone(),
        });
    }

    ranked
}
