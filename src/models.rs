//! Core Data Models
//!
//! Defines the record types flowing through the analysis pipeline:
//!
//! 1. **Raw input**: [`Fight`] and [`EventLog`] - deserialized from the cached
//!    JSON artifacts fetched from the analytics API
//! 2. **Classified**: [`ClassifiedEvent`] - raw events annotated with phase id
//!    and elapsed-time fields
//! 3. **Indexed**: [`IndexedEvent`] - classified events with a per-bucket
//!    occurrence index
//! 4. **Output**: [`AggregateRow`] and [`CastIntervalRow`] - per-bucket
//!    descriptive statistics and inter-cast intervals
//!
//! All wire-facing types use the upstream API's camelCase field names via
//! serde renames. Records are plain data; nothing here mutates after
//! construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One recorded attempt at an encounter, as stored in a fight-list file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fight {
    pub code: String,
    pub id: i64,
    #[serde(rename = "startTime")]
    pub start_time: i64,
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(rename = "fightPercentage", default)]
    pub fight_percentage: Option<f64>,
    #[serde(rename = "keystoneLevel", default)]
    pub keystone_level: Option<i64>,
    #[serde(rename = "phaseTransitions", default)]
    pub phase_transitions: Option<Vec<PhaseTransition>>,
    #[serde(rename = "dungeonPulls", default)]
    pub dungeon_pulls: Option<Vec<DungeonPull>>,
}

/// Scripted phase transition reported by the API. Source ids are not trusted;
/// boundaries are renumbered after sorting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub id: u32,
    #[serde(rename = "startTime")]
    pub start_time: i64,
}

/// One pull within a dungeon fight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DungeonPull {
    #[serde(rename = "encounterID")]
    pub encounter_id: i64,
    #[serde(rename = "startTime")]
    pub start_time: i64,
    #[serde(rename = "endTime")]
    pub end_time: i64,
}

/// Cached event-log artifact for one fight (or one dungeon pull).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    #[serde(rename = "startTime")]
    pub start_time: i64,
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(rename = "pullID", default, skip_serializing_if = "Option::is_none")]
    pub pull_id: Option<i64>,
    pub events: Vec<RawEvent>,
}

/// A single timestamped combat-log event. Append-only input, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(rename = "sourceID")]
    pub source_id: i64,
    #[serde(rename = "targetID")]
    pub target_id: i64,
    #[serde(rename = "abilityGameID")]
    pub ability_id: i64,
    #[serde(default)]
    pub melee: bool,
}

/// Event categories from the upstream cast data feed. Anything the analysis
/// does not distinguish collapses into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    BeginCast,
    Cast,
    ApplyBuff,
    RemoveBuff,
    ApplyDebuff,
    RemoveDebuff,
    #[serde(other)]
    Other,
}

impl std::str::FromStr for EventType {
    type Err = String;

    /// Strict parse for user-supplied event types. Unlike deserialization,
    /// unknown names are an error here, not `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "begincast" => Ok(EventType::BeginCast),
            "cast" => Ok(EventType::Cast),
            "applybuff" => Ok(EventType::ApplyBuff),
            "removebuff" => Ok(EventType::RemoveBuff),
            "applydebuff" => Ok(EventType::ApplyDebuff),
            "removedebuff" => Ok(EventType::RemoveDebuff),
            _ => Err(format!("unknown event type: {}", s)),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::BeginCast => "begincast",
            EventType::Cast => "cast",
            EventType::ApplyBuff => "applybuff",
            EventType::RemoveBuff => "removebuff",
            EventType::ApplyDebuff => "applydebuff",
            EventType::RemoveDebuff => "removedebuff",
            EventType::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Encounter difficulty. The numeric values match the API and appear in
/// cache file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Difficulty {
    Dungeon,
    Heroic,
    Mythic,
}

impl Difficulty {
    pub fn as_id(&self) -> u32 {
        match self {
            Difficulty::Dungeon => 0,
            Difficulty::Heroic => 4,
            Difficulty::Mythic => 5,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_id())
    }
}

/// A raw event annotated with its phase and elapsed-time fields.
///
/// `phase_time` is seconds since the active phase boundary, `total_time`
/// seconds since fight start. `pull_id` is -1 for non-dungeon fights.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedEvent {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(rename = "sourceID")]
    pub source_id: i64,
    #[serde(rename = "targetID")]
    pub target_id: i64,
    #[serde(rename = "abilityID")]
    pub ability_id: i64,
    #[serde(rename = "fightCode")]
    pub fight_code: String,
    #[serde(rename = "fightID")]
    pub fight_id: i64,
    #[serde(rename = "pullID")]
    pub pull_id: i64,
    pub phase: u32,
    #[serde(rename = "phaseTime")]
    pub phase_time: f64,
    #[serde(rename = "totalTime")]
    pub total_time: f64,
}

/// A classified event with its occurrence index within the
/// (fight, pull, ability, phase, type) bucket.
#[derive(Debug, Clone, Serialize)]
pub struct IndexedEvent {
    #[serde(flatten)]
    pub event: ClassifiedEvent,
    #[serde(rename = "castIndex")]
    pub cast_index: u32,
}

/// Descriptive statistics over `phase_time` for one
/// (ability, phase, type, cast index) bucket across all fights.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateRow {
    #[serde(rename = "abilityID")]
    pub ability_id: i64,
    pub phase: u32,
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(rename = "castIndex")]
    pub cast_index: u32,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Inter-cast intervals for one (ability, phase, type) group: the mean phase
/// times ordered by cast index, first-differenced. The first entry is the
/// mean time of the first cast itself.
#[derive(Debug, Clone, Serialize)]
pub struct CastIntervalRow {
    #[serde(rename = "abilityID")]
    pub ability_id: i64,
    pub phase: u32,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub intervals: Vec<f64>,
    #[serde(rename = "meanInterval")]
    pub mean_interval: f64,
    #[serde(rename = "stdInterval")]
    pub std_interval: f64,
}
