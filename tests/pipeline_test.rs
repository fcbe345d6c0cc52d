//! End-to-end pipeline tests over a cached dataset on disk: fight list and
//! event logs in, aggregate timing rows out.

mod common;

use cast_stats::analyzer::{AnalyzeOptions, CastStatsAnalyzer, DungeonOptions};
use cast_stats::error::AnalysisError;
use cast_stats::models::{Difficulty, EventType};
use cast_stats::store::Store;
use common::{event, raid_fight, write_event_log, write_fight_list};
use serde_json::json;
use tempfile::TempDir;

fn raid_options(zone: i64, encounter: i64) -> AnalyzeOptions {
    AnalyzeOptions {
        zone,
        encounter,
        difficulty: Difficulty::Mythic,
        min_count: 0,
        max_percentage: None,
        phase_rules: vec![],
    }
}

#[test]
fn raid_analysis_aggregates_across_fights() {
    let dir = TempDir::new().unwrap();
    let transitions = json!([
        {"id": 1, "startTime": 1000},
        {"id": 2, "startTime": 21000},
    ]);
    write_fight_list(
        dir.path(),
        44,
        3131,
        5,
        &json!([
            raid_fight("r1", 1, 1000, transitions.clone()),
            raid_fight("r2", 1, 1000, transitions),
        ]),
    );
    // First cast of ability 100 lands at 5s/7s into phase 1 and 10s/4s into
    // phase 2 across the two fights.
    write_event_log(
        dir.path(),
        "44_3131_5_r1_1.json",
        &json!({
            "startTime": 1000,
            "events": [event(6000, "cast", 100), event(31000, "cast", 100)],
        }),
    );
    write_event_log(
        dir.path(),
        "44_3131_5_r2_1.json",
        &json!({
            "startTime": 1000,
            "events": [event(8000, "cast", 100), event(25000, "cast", 100)],
        }),
    );

    let analyzer = CastStatsAnalyzer::new(Store::new(dir.path()));
    let report = analyzer.analyze_raid(&raid_options(44, 3131)).unwrap();

    assert_eq!(report.fights_processed, 2);
    assert_eq!(report.fights_skipped, 0);
    assert_eq!(report.rows.len(), 2);

    let phase1 = &report.rows[0];
    assert_eq!(
        (phase1.ability_id, phase1.phase, phase1.cast_index),
        (100, 1, 1)
    );
    assert_eq!(phase1.count, 2);
    assert!((phase1.mean - 6.0).abs() < 1e-9);

    let phase2 = &report.rows[1];
    assert_eq!(phase2.phase, 2);
    assert_eq!(phase2.count, 2);
    assert!((phase2.mean - 7.0).abs() < 1e-9);
}

#[test]
fn begincast_suppresses_cast_rows_for_same_ability() {
    let dir = TempDir::new().unwrap();
    write_fight_list(
        dir.path(),
        44,
        3131,
        5,
        &json!([raid_fight("r1", 1, 1000, json!([]))]),
    );
    write_event_log(
        dir.path(),
        "44_3131_5_r1_1.json",
        &json!({
            "startTime": 1000,
            "events": [
                event(3000, "begincast", 200),
                event(5000, "cast", 200),
                event(7000, "cast", 300),
            ],
        }),
    );

    let analyzer = CastStatsAnalyzer::new(Store::new(dir.path()));
    let report = analyzer.analyze_raid(&raid_options(44, 3131)).unwrap();

    let kinds: Vec<(i64, EventType)> = report
        .rows
        .iter()
        .map(|row| (row.ability_id, row.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![(200, EventType::BeginCast), (300, EventType::Cast)]
    );
}

#[test]
fn fight_with_missing_event_log_is_skipped() {
    let dir = TempDir::new().unwrap();
    write_fight_list(
        dir.path(),
        44,
        3131,
        5,
        &json!([
            raid_fight("r1", 1, 1000, json!([])),
            raid_fight("r2", 1, 1000, json!([])),
        ]),
    );
    write_event_log(
        dir.path(),
        "44_3131_5_r1_1.json",
        &json!({"startTime": 1000, "events": [event(6000, "cast", 100)]}),
    );

    let analyzer = CastStatsAnalyzer::new(Store::new(dir.path()));
    let report = analyzer.analyze_raid(&raid_options(44, 3131)).unwrap();

    assert_eq!(report.fights_processed, 1);
    assert_eq!(report.fights_skipped, 1);
    assert_eq!(report.rows.len(), 1);
}

#[test]
fn percentage_filter_can_empty_the_dataset() {
    let dir = TempDir::new().unwrap();
    write_fight_list(
        dir.path(),
        44,
        3131,
        5,
        &json!([{
            "code": "r1", "id": 1, "startTime": 1000,
            "fightPercentage": 55.0, "phaseTransitions": [],
        }]),
    );

    let analyzer = CastStatsAnalyzer::new(Store::new(dir.path()));
    let mut options = raid_options(44, 3131);
    options.max_percentage = Some(10.0);
    let err = analyzer.analyze_raid(&options).unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyDataset { .. }));
}

#[test]
fn missing_fight_list_aborts_the_run() {
    let dir = TempDir::new().unwrap();
    let analyzer = CastStatsAnalyzer::new(Store::new(dir.path()));
    let err = analyzer.analyze_raid(&raid_options(44, 3131)).unwrap_err();
    assert!(matches!(err, AnalysisError::NotFound { .. }));
}

#[test]
fn dungeon_pulls_are_independent_fight_instances() {
    let dir = TempDir::new().unwrap();
    write_fight_list(
        dir.path(),
        45,
        62287,
        0,
        &json!([{
            "code": "d1", "id": 3, "startTime": 0,
            "keystoneLevel": 12,
            "dungeonPulls": [
                {"encounterID": 2403, "startTime": 1000, "endTime": 5000},
                {"encounterID": 2380, "startTime": 6000, "endTime": 9000},
                {"encounterID": 2403, "startTime": 10000, "endTime": 14000},
            ],
        }]),
    );
    write_event_log(
        dir.path(),
        "45_2403_0_d1_3_1.json",
        &json!({"startTime": 1000, "events": [event(3000, "cast", 300)]}),
    );
    write_event_log(
        dir.path(),
        "45_2403_0_d1_3_2.json",
        &json!({"startTime": 10000, "events": [event(12000, "cast", 300)]}),
    );

    let analyzer = CastStatsAnalyzer::new(Store::new(dir.path()));
    let report = analyzer
        .analyze_dungeon(&DungeonOptions {
            zone: 45,
            dungeon: 62287,
            encounter: 2403,
            min_count: 0,
        })
        .unwrap();

    // Both pulls start their first cast 2 seconds in, so they land in the
    // same bucket with cast index 1 each.
    assert_eq!(report.fights_processed, 2);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].count, 2);
    assert!((report.rows[0].mean - 2.0).abs() < 1e-9);
}

#[test]
fn dungeon_analysis_discovers_pull_logs_without_pull_metadata() {
    let dir = TempDir::new().unwrap();
    write_fight_list(
        dir.path(),
        45,
        62287,
        0,
        &json!([{"code": "d2", "id": 4, "startTime": 0}]),
    );
    write_event_log(
        dir.path(),
        "45_2403_0_d2_4_1.json",
        &json!({"startTime": 1000, "pullID": 1, "events": [event(2000, "cast", 300)]}),
    );
    write_event_log(
        dir.path(),
        "45_2403_0_d2_4_2.json",
        &json!({"startTime": 8000, "pullID": 2, "events": [event(9000, "cast", 300)]}),
    );

    let analyzer = CastStatsAnalyzer::new(Store::new(dir.path()));
    let report = analyzer
        .analyze_dungeon(&DungeonOptions {
            zone: 45,
            dungeon: 62287,
            encounter: 2403,
            min_count: 0,
        })
        .unwrap();

    assert_eq!(report.fights_processed, 2);
    assert_eq!(report.rows[0].count, 2);
    assert!((report.rows[0].mean - 1.0).abs() < 1e-9);
}

#[test]
fn ability_triggered_rules_split_phases() {
    let dir = TempDir::new().unwrap();
    write_fight_list(
        dir.path(),
        44,
        3131,
        5,
        &json!([raid_fight("r1", 1, 1000, json!([]))]),
    );
    write_event_log(
        dir.path(),
        "44_3131_5_r1_1.json",
        &json!({
            "startTime": 1000,
            "events": [
                event(5000, "cast", 100),
                event(20000, "begincast", 999),
                event(26000, "cast", 100),
            ],
        }),
    );

    let analyzer = CastStatsAnalyzer::new(Store::new(dir.path()));
    let mut options = raid_options(44, 3131);
    options.phase_rules = vec![cast_stats::phases::PhaseRule {
        ability_id: 999,
        kind: EventType::BeginCast,
        occurrence: 0,
    }];
    let report = analyzer.analyze_raid(&options).unwrap();

    let phases: Vec<u32> = report
        .rows
        .iter()
        .filter(|row| row.ability_id == 100)
        .map(|row| row.phase)
        .collect();
    assert_eq!(phases, vec![1, 2]);
    let phase2 = report
        .rows
        .iter()
        .find(|row| row.ability_id == 100 && row.phase == 2)
        .unwrap();
    assert!((phase2.mean - 6.0).abs() < 1e-9);
}
