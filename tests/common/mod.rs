use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Write a fight-list artifact into a cache directory laid out the way the
/// store expects it.
pub fn write_fight_list(data_dir: &Path, zone: i64, encounter: i64, difficulty: u32, fights: &Value) {
    let dir = data_dir.join("fights");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(format!("{}_{}_{}.json", zone, encounter, difficulty)),
        serde_json::to_string(fights).unwrap(),
    )
    .unwrap();
}

/// Write an event-log artifact under events/ with the given file name.
pub fn write_event_log(data_dir: &Path, filename: &str, log: &Value) {
    let dir = data_dir.join("events");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(filename), serde_json::to_string(log).unwrap()).unwrap();
}

pub fn event(timestamp: i64, kind: &str, ability_id: i64) -> Value {
    json!({
        "timestamp": timestamp,
        "type": kind,
        "sourceID": 10,
        "targetID": 20,
        "abilityGameID": ability_id,
    })
}

pub fn raid_fight(code: &str, id: i64, start_time: i64, transitions: Value) -> Value {
    json!({
        "code": code,
        "id": id,
        "startTime": start_time,
        "fightPercentage": 0.0,
        "phaseTransitions": transitions,
    })
}
