//! Phase boundary resolution
//!
//! Builds the ordered set of phase boundaries for a fight. Three sources:
//!
//! - **Time-based** (default): the scripted `phaseTransitions` reported by
//!   the API, sorted and renumbered.
//! - **Ability-triggered**: rules of the form "the Nth occurrence of ability
//!   X's event type Y starts a new phase", scanned against the raw event
//!   stream. Triggered boundaries continue the id sequence after the
//!   time-based ones and never move a phase start backward.
//! - **Dungeon pulls**: each pull of a dungeon fight is its own
//!   single-boundary segment.
//!
//! Output invariant: ids are a dense renumbering 1..N and a boundary at the
//! fight start always exists, so every event has an active boundary.

use crate::models::{EventType, Fight, RawEvent};
use std::collections::HashMap;

/// A resolved phase start. Ids are 1-based and dense regardless of the
/// source transition ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseBoundary {
    pub id: u32,
    pub start_time: i64,
}

/// Ability-triggered phase rule: the `occurrence`-th (0-based) event of
/// `kind` for `ability_id` starts a new phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRule {
    pub ability_id: i64,
    pub kind: EventType,
    pub occurrence: usize,
}

/// One dungeon pull treated as an independent fight instance.
#[derive(Debug, Clone)]
pub struct DungeonSegment {
    /// 1-based ordinal among the pulls matching the requested encounter.
    pub pull_id: i64,
    pub boundary: PhaseBoundary,
    pub start_time: i64,
    pub end_time: i64,
}

/// Resolve boundaries from the fight's scripted transitions.
///
/// Absent or empty transition data yields a single synthetic boundary at the
/// fight start. Otherwise transitions are sorted ascending by start time and
/// renumbered densely from 1; when the earliest transition begins after the
/// fight start, a boundary at the fight start is prepended so events before
/// the first recorded transition land in phase 1.
pub fn resolve_time_based(fight: &Fight) -> Vec<PhaseBoundary> {
    let mut transitions = match &fight.phase_transitions {
        Some(transitions) if !transitions.is_empty() => transitions.clone(),
        _ => {
            return vec![PhaseBoundary {
                id: 1,
                start_time: fight.start_time,
            }]
        }
    };

    transitions.sort_by_key(|t| t.start_time);

    let mut boundaries = Vec::with_capacity(transitions.len() + 1);
    if transitions[0].start_time > fight.start_time {
        boundaries.push(PhaseBoundary {
            id: 0,
            start_time: fight.start_time,
        });
    }
    for transition in &transitions {
        boundaries.push(PhaseBoundary {
            id: 0,
            start_time: transition.start_time,
        });
    }
    renumber(&mut boundaries);
    boundaries
}

/// Resolve boundaries from transitions plus ability-triggered rules.
///
/// Events must be timestamp-ascending. A running occurrence counter is kept
/// per (ability, event type); when a rule's target occurrence is reached the
/// event's timestamp becomes a boundary, provided it would not regress the
/// phase start active at that moment. Triggered boundaries are appended after
/// the time-based ones with continuing ids.
pub fn resolve_with_rules(
    fight: &Fight,
    events: &[RawEvent],
    rules: &[PhaseRule],
) -> Vec<PhaseBoundary> {
    let mut boundaries = resolve_time_based(fight);
    if rules.is_empty() {
        return boundaries;
    }

    let time_based = boundaries.clone();
    let mut next_id = boundaries.last().map(|b| b.id).unwrap_or(0) + 1;
    let mut counters: HashMap<(i64, EventType), usize> = HashMap::new();

    for event in events {
        let seen = counters.entry((event.ability_id, event.kind)).or_insert(0);
        let occurrence = *seen;
        *seen += 1;

        let triggered = rules.iter().any(|rule| {
            rule.ability_id == event.ability_id
                && rule.kind == event.kind
                && rule.occurrence == occurrence
        });
        if !triggered {
            continue;
        }

        // Later-wins: only emit when the trigger lands after the phase start
        // that is already active at its timestamp.
        let active_start = time_based
            .iter()
            .filter(|b| b.start_time <= event.timestamp)
            .map(|b| b.start_time)
            .max()
            .unwrap_or(fight.start_time);
        if event.timestamp > active_start {
            boundaries.push(PhaseBoundary {
                id: next_id,
                start_time: event.timestamp,
            });
            next_id += 1;
        }
    }

    boundaries
}

/// Split a dungeon fight into per-pull segments for the requested encounter.
///
/// Only pulls whose `encounterID` matches are considered; each becomes an
/// independent single-boundary segment with `pull_id` set to its 1-based
/// ordinal among the matching pulls.
pub fn dungeon_segments(fight: &Fight, encounter_id: i64) -> Vec<DungeonSegment> {
    let Some(pulls) = &fight.dungeon_pulls else {
        return Vec::new();
    };

    pulls
        .iter()
        .filter(|pull| pull.encounter_id == encounter_id)
        .enumerate()
        .map(|(ordinal, pull)| DungeonSegment {
            pull_id: ordinal as i64 + 1,
            boundary: PhaseBoundary {
                id: 1,
                start_time: pull.start_time,
            },
            start_time: pull.start_time,
            end_time: pull.end_time,
        })
        .collect()
}

fn renumber(boundaries: &mut [PhaseBoundary]) {
    for (position, boundary) in boundaries.iter_mut().enumerate() {
        boundary.id = position as u32 + 1;
    }
}
