//! `PauseTracker` (spec §4.6): derives a per-second paused/active map from
//! `event` messages where `event == timer` (enum 0), used by interpolation
//! (spec §4.5 phase 5) and gap filtering.
//!
//! No direct teacher precedent (the teacher's `event` handling in
//! `process.rs` only extracts raw field values); grounded on the teacher's
//! habit of walking a sorted timestamp range with a `BTreeMap`
//! (`process::parse_record` builds its output the same way).

use std::collections::BTreeMap;

/// Minimum length, in seconds, a paused run must have to stay paused (spec
/// §4.6 "Gap-threshold filter").
pub const PAUSE_GAP_THRESHOLD: i64 = 60;

const EVENT_TIMER: i64 = 0;
const EVENT_TYPE_START: i64 = 0;
const EVENT_TYPE_STOP: i64 = 4;

/// One `event` message's relevant fields, already resolved to Unix-epoch
/// seconds.
#[derive(Debug, Clone, Copy)]
pub struct TimerEvent {
    pub timestamp: i64,
    pub event: i64,
    pub event_type: i64,
}

/// Builds the `timestamp -> paused` map for `[min_ts, max_ts]` inclusive
/// (spec §4.6).
pub fn build_pause_map(events: &[TimerEvent], min_ts: i64, max_ts: i64) -> BTreeMap<i64, bool> {
    let mut starts: Vec<i64> = events
        .iter()
        .filter(|e| e.event == EVENT_TIMER && e.event_type == EVENT_TYPE_START)
        .map(|e| e.timestamp)
        .collect();
    let mut stops: Vec<i64> = events
        .iter()
        .filter(|e| e.event == EVENT_TIMER && e.event_type == EVENT_TYPE_STOP)
        .map(|e| e.timestamp)
        .collect();
    starts.sort_unstable();
    stops.sort_unstable();

    let mut paused = false;
    let mut map = BTreeMap::new();
    if min_ts > max_ts {
        return map;
    }
    for ts in min_ts..=max_ts {
        if stops.binary_search(&ts).is_ok() {
            paused = true;
        }
        if starts.binary_search(&ts).is_ok() {
            paused = false;
        }
        map.insert(ts, paused);
    }
    filter_short_runs(map)
}

/// Relabels any contiguous paused run shorter than [`PAUSE_GAP_THRESHOLD`]
/// seconds as active (spec §4.6, testable property #8).
fn filter_short_runs(map: BTreeMap<i64, bool>) -> BTreeMap<i64, bool> {
    let entries: Vec<(i64, bool)> = map.into_iter().collect();
    let mut out: Vec<(i64, bool)> = entries.clone();

    let mut i = 0;
    while i < entries.len() {
        if !entries[i].1 {
            i += 1;
            continue;
        }
        let start = i;
        while i < entries.len() && entries[i].1 {
            i += 1;
        }
        let run_len = (entries[i - 1].0 - entries[start].0) + 1;
        if run_len < PAUSE_GAP_THRESHOLD {
            for entry in out.iter_mut().take(i).skip(start) {
                entry.1 = false;
            }
        }
    }

    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(ts: i64, event_type: i64) -> TimerEvent {
        TimerEvent {
            timestamp: ts,
            event: EVENT_TIMER,
            event_type,
        }
    }

    #[test]
    fn short_pause_is_filtered_to_active() {
        let events = vec![timer(10, EVENT_TYPE_STOP), timer(20, EVENT_TYPE_START)];
        let map = build_pause_map(&events, 0, 30);
        // run is 10 seconds long (10..=19), below the 60s threshold
        assert!(map.values().all(|paused| !paused));
    }

    #[test]
    fn long_pause_stays_paused() {
        let events = vec![timer(10, EVENT_TYPE_STOP), timer(100, EVENT_TYPE_START)];
        let map = build_pause_map(&events, 0, 150);
        assert!(map[&50]);
        assert!(!map[&5]);
        assert!(!map[&120]);
    }
}
