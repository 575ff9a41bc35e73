//! Proportional chunk scheduling.
//!
//! Multiple loader threads writing to the same table compete for locks on
//! its indexes, so throughput is best when as many distinct tables as
//! possible are being loaded concurrently. This scheduler prefers a table
//! with no in-flight work at all (maximizing the number of
//! concurrently-loaded tables), and only falls back to a proportional
//! "most under-served relative to its remaining bytes" comparison once
//! every candidate already has a worker.

use std::collections::HashMap;

use crate::model::TableKey;

/// Pick the next table to dispatch a chunk from.
///
/// `in_flight` maps a table key to the number of bytes currently being
/// loaded for it across all dispatched-but-unfinished chunks. `candidates`
/// is the `tables_with_data` set: tables with at least one unconsumed
/// chunk. Returns `None` only when `candidates` is empty.
pub fn schedule_chunk_proportionally(
    in_flight: &HashMap<TableKey, u64>,
    candidates: &[(TableKey, u64)],
) -> Option<TableKey> {
    if candidates.is_empty() {
        return None;
    }

    let total_in_flight: u64 = in_flight.values().sum();
    let worker_weights: HashMap<TableKey, f64> = if total_in_flight > 0 {
        in_flight
            .iter()
            .map(|(&key, &bytes)| (key, bytes as f64 / total_in_flight as f64))
            .collect()
    } else {
        HashMap::new()
    };

    let total_available: u64 = candidates.iter().map(|(_, bytes)| bytes).sum();
    if total_available == 0 {
        return Some(candidates[0].0);
    }

    let mut best: Option<(TableKey, f64)> = None;
    // Candidate with no in-flight load and the largest positive share of the
    // remaining bytes. Gated on a real `0.0` threshold rather than "first one
    // seen with no in-flight load" - a table with zero bytes available (an
    // observed empty chunk, say) must never win this slot over one that
    // actually has bytes to hand out.
    let mut best_unique: Option<(TableKey, f64)> = None;
    let mut best_unique_diff = 0.0f64;

    for &(key, bytes_available) in candidates {
        let a_c = bytes_available as f64 / total_available as f64;

        match worker_weights.get(&key) {
            Some(&w) => {
                let diff = a_c - w;
                if best.map_or(true, |(_, d)| diff > d) {
                    best = Some((key, diff));
                }
            }
            None => {
                if best.map_or(true, |(_, d)| a_c > d) {
                    best = Some((key, a_c));
                }
                if a_c > best_unique_diff {
                    best_unique_diff = a_c;
                    best_unique = Some((key, a_c));
                }
            }
        }
    }

    best_unique.or(best).map(|(key, _)| key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn keys(n: usize) -> Vec<TableKey> {
        let mut map: SlotMap<TableKey, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn prefers_a_candidate_with_no_in_flight_work() {
        let ks = keys(3);
        let (a, b, c) = (ks[0], ks[1], ks[2]);

        let mut in_flight = HashMap::new();
        in_flight.insert(a, 500);

        let candidates = vec![(a, 900), (b, 100), (c, 100)];

        let picked = schedule_chunk_proportionally(&in_flight, &candidates).unwrap();
        assert_ne!(picked, a, "should spread work to an idle table, not pile onto A");
        assert!(picked == b || picked == c);
    }

    #[test]
    fn falls_back_to_weighted_pick_when_everyone_has_workers() {
        let ks = keys(2);
        let (a, b) = (ks[0], ks[1]);

        let mut in_flight = HashMap::new();
        in_flight.insert(a, 100);
        in_flight.insert(b, 100);

        let candidates = vec![(a, 900), (b, 100)];

        let picked = schedule_chunk_proportionally(&in_flight, &candidates).unwrap();
        assert_eq!(picked, a, "A is proportionally under-served relative to its remaining bytes");
    }

    #[test]
    fn ties_broken_arbitrarily_but_deterministically_return_something() {
        let ks = keys(2);
        let candidates = vec![(ks[0], 100), (ks[1], 100)];
        let picked = schedule_chunk_proportionally(&HashMap::new(), &candidates);
        assert!(picked.is_some());
    }

    #[test]
    fn returns_none_when_no_candidates() {
        assert_eq!(schedule_chunk_proportionally(&HashMap::new(), &[]), None);
    }

    #[test]
    fn zero_availability_returns_first_candidate() {
        let ks = keys(2);
        let candidates = vec![(ks[0], 0), (ks[1], 0)];
        let picked = schedule_chunk_proportionally(&HashMap::new(), &candidates);
        assert_eq!(picked, Some(ks[0]));
    }

    #[test]
    fn idle_candidate_with_zero_bytes_never_beats_a_loaded_candidate_with_bytes() {
        let ks = keys(2);
        let (x, y) = (ks[0], ks[1]);

        let mut in_flight = HashMap::new();
        in_flight.insert(y, 500);

        // X is idle but has nothing to hand out; Y has a worker already but
        // still has 500 bytes available. Picking X would violate "never
        // return a table with bytes_available = 0 when another candidate has
        // bytes_available > 0".
        let candidates = vec![(x, 0), (y, 500)];

        let picked = schedule_chunk_proportionally(&in_flight, &candidates).unwrap();
        assert_eq!(picked, y);
    }
}
