//! Event classification
//!
//! Converts raw timestamped events into [`ClassifiedEvent`]s carrying the
//! phase id and elapsed-time fields, after applying the begincast/cast
//! deduplication policy and (optionally) dropping melee autoattacks.
//!
//! ## Deduplication policy
//!
//! The upstream feed reports an ability use as a `begincast` (channel start)
//! optionally followed by a `cast` (resolution). Two collapsing policies
//! exist in the wild; this implementation uses the *preference* policy: for a
//! given ability within one fight/pull, `begincast` events always survive and
//! `cast` events survive only when that ability produced no `begincast` at
//! all. Either way no logical action contributes more than one event to the
//! begincast/cast category.

use crate::models::{ClassifiedEvent, EventType, RawEvent};
use crate::phases::PhaseBoundary;
use std::collections::HashSet;

/// Identity of the fight (or pull) the events belong to. `pull_id` is -1
/// for raid fights.
#[derive(Debug, Clone)]
pub struct FightMeta {
    pub code: String,
    pub id: i64,
    pub pull_id: i64,
    pub start_time: i64,
}

impl FightMeta {
    pub fn raid(code: &str, id: i64, start_time: i64) -> Self {
        Self {
            code: code.to_string(),
            id,
            pull_id: -1,
            start_time,
        }
    }

    pub fn pull(code: &str, id: i64, pull_id: i64, start_time: i64) -> Self {
        Self {
            code: code.to_string(),
            id,
            pull_id,
            start_time,
        }
    }
}

/// Classify raw events against the resolved boundaries.
///
/// Events must be timestamp-ascending (the cached artifacts are). Each event
/// is assigned the latest boundary whose start does not exceed its
/// timestamp; `phase_time` and `total_time` are derived in seconds. With
/// `exclude_melee` set, events flagged as melee autoattacks are dropped
/// before anything else.
pub fn classify(
    events: &[RawEvent],
    boundaries: &[PhaseBoundary],
    meta: &FightMeta,
    exclude_melee: bool,
) -> Vec<ClassifiedEvent> {
    // Sweep order is ascending start time; on equal starts the later entry
    // (higher id, e.g. an ability-triggered boundary) wins.
    let mut sweep: Vec<PhaseBoundary> = boundaries.to_vec();
    sweep.sort_by_key(|b| b.start_time);

    let keep_cast = abilities_without_begincast(events);

    let mut classified = Vec::with_capacity(events.len());
    let mut cursor = 0usize;

    for event in events {
        if exclude_melee && event.melee {
            continue;
        }
        match event.kind {
            EventType::Cast if !keep_cast.contains(&event.ability_id) => continue,
            _ => {}
        }

        while cursor + 1 < sweep.len() && sweep[cursor + 1].start_time <= event.timestamp {
            cursor += 1;
        }
        let boundary = &sweep[cursor];

        classified.push(ClassifiedEvent {
            timestamp: event.timestamp,
            kind: event.kind,
            source_id: event.source_id,
            target_id: event.target_id,
            ability_id: event.ability_id,
            fight_code: meta.code.clone(),
            fight_id: meta.id,
            pull_id: meta.pull_id,
            phase: boundary.id,
            phase_time: elapsed_seconds(event.timestamp, boundary.start_time),
            total_time: elapsed_seconds(event.timestamp, meta.start_time),
        });
    }

    classified
}

/// Abilities whose `cast` events survive dedup: those with no `begincast`
/// anywhere in this fight's stream.
fn abilities_without_begincast(events: &[RawEvent]) -> HashSet<i64> {
    let with_begincast: HashSet<i64> = events
        .iter()
        .filter(|e| e.kind == EventType::BeginCast)
        .map(|e| e.ability_id)
        .collect();

    events
        .iter()
        .filter(|e| e.kind == EventType::Cast && !with_begincast.contains(&e.ability_id))
        .map(|e| e.ability_id)
        .collect()
}

fn elapsed_seconds(timestamp: i64, origin: i64) -> f64 {
    // Clamped so a malformed event just ahead of its boundary cannot produce
    // a negative elapsed time.
    (timestamp - origin).max(0) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(timestamp: i64, kind: EventType, ability_id: i64) -> RawEvent {
        RawEvent {
            timestamp,
            kind,
            source_id: 1,
            target_id: 2,
            ability_id,
            melee: false,
        }
    }

    fn boundaries(starts: &[i64]) -> Vec<PhaseBoundary> {
        starts
            .iter()
            .enumerate()
            .map(|(i, &start_time)| PhaseBoundary {
                id: i as u32 + 1,
                start_time,
            })
            .collect()
    }

    #[test]
    fn assigns_latest_boundary_not_after_event() {
        // Worked example: boundaries at 0 and 10000, casts at 5000 and 15000.
        let events = vec![
            event(5_000, EventType::Cast, 100),
            event(15_000, EventType::Cast, 100),
        ];
        let meta = FightMeta::raid("abc", 1, 0);
        let classified = classify(&events, &boundaries(&[0, 10_000]), &meta, false);

        assert_eq!(classified.len(), 2);
        assert_eq!(classified[0].phase, 1);
        assert_eq!(classified[1].phase, 2);
        assert_eq!(classified[0].phase_time, 5.0);
        assert_eq!(classified[1].phase_time, 5.0);
        assert_eq!(classified[1].total_time, 15.0);
    }

    #[test]
    fn event_on_boundary_start_belongs_to_that_phase() {
        let events = vec![event(10_000, EventType::Cast, 100)];
        let meta = FightMeta::raid("abc", 1, 0);
        let classified = classify(&events, &boundaries(&[0, 10_000]), &meta, false);
        assert_eq!(classified[0].phase, 2);
        assert_eq!(classified[0].phase_time, 0.0);
    }

    #[test]
    fn begincast_preferred_over_cast() {
        let events = vec![
            event(0, EventType::BeginCast, 5),
            event(50, EventType::Cast, 5),
        ];
        let meta = FightMeta::raid("abc", 1, 0);
        let classified = classify(&events, &boundaries(&[0]), &meta, false);
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].kind, EventType::BeginCast);
    }

    #[test]
    fn cast_kept_when_ability_has_no_begincast() {
        let events = vec![
            event(0, EventType::BeginCast, 5),
            event(50, EventType::Cast, 5),
            event(70, EventType::Cast, 6),
        ];
        let meta = FightMeta::raid("abc", 1, 0);
        let classified = classify(&events, &boundaries(&[0]), &meta, false);
        let abilities: Vec<i64> = classified.iter().map(|e| e.ability_id).collect();
        assert_eq!(abilities, vec![5, 6]);
    }

    #[test]
    fn buff_events_pass_through_dedup() {
        let events = vec![
            event(0, EventType::BeginCast, 5),
            event(100, EventType::ApplyBuff, 5),
            event(200, EventType::RemoveBuff, 5),
        ];
        let meta = FightMeta::raid("abc", 1, 0);
        let classified = classify(&events, &boundaries(&[0]), &meta, false);
        assert_eq!(classified.len(), 3);
    }

    #[test]
    fn melee_events_dropped_when_excluded() {
        let mut swing = event(500, EventType::Cast, 1);
        swing.melee = true;
        let events = vec![swing, event(1_000, EventType::Cast, 7)];
        let meta = FightMeta::raid("abc", 1, 0);

        let with_melee = classify(&events, &boundaries(&[0]), &meta, false);
        let without_melee = classify(&events, &boundaries(&[0]), &meta, true);
        assert_eq!(with_melee.len(), 2);
        assert_eq!(without_melee.len(), 1);
        assert_eq!(without_melee[0].ability_id, 7);
    }

    #[test]
    fn negative_elapsed_time_clamps_to_zero() {
        let events = vec![event(400, EventType::Cast, 9)];
        let meta = FightMeta::raid("abc", 1, 500);
        let classified = classify(&events, &boundaries(&[500]), &meta, false);
        assert_eq!(classified[0].phase_time, 0.0);
        assert_eq!(classified[0].total_time, 0.0);
    }
}
