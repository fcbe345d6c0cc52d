//! Cast occurrence indexing
//!
//! Assigns each classified event a stable 1-based occurrence index within its
//! (fight, pull, ability, phase, type) bucket, ordered by elapsed phase time.
//! The composite-key map replaces the nested per-ability/per-phase
//! accumulators of the upstream scripts and makes the output order
//! deterministic.

use crate::models::{ClassifiedEvent, EventType, IndexedEvent};
use std::collections::BTreeMap;

type GroupKey = (String, i64, i64, i64, u32, EventType);

fn group_key(event: &ClassifiedEvent) -> GroupKey {
    (
        event.fight_code.clone(),
        event.fight_id,
        event.pull_id,
        event.ability_id,
        event.phase,
        event.kind,
    )
}

/// Index classified events.
///
/// Within each group events are sorted ascending by `phase_time` with a
/// stable sort, so ties keep their input order; indices are then assigned
/// 1, 2, 3, ... in that order. The operation is idempotent: re-indexing the
/// contained events yields identical indices.
pub fn index(events: Vec<ClassifiedEvent>) -> Vec<IndexedEvent> {
    let mut groups: BTreeMap<GroupKey, Vec<ClassifiedEvent>> = BTreeMap::new();
    for event in events {
        groups.entry(group_key(&event)).or_default().push(event);
    }

    let mut indexed = Vec::new();
    for (_, mut group) in groups {
        group.sort_by(|a, b| a.phase_time.total_cmp(&b.phase_time));
        for (position, event) in group.into_iter().enumerate() {
            indexed.push(IndexedEvent {
                event,
                cast_index: position as u32 + 1,
            });
        }
    }
    indexed
}
