//! On-disk cache of fetched artifacts
//!
//! Fight lists and event logs are cached as JSON under the configured data
//! directory so an analysis never has to touch the network:
//!
//! ```text
//! <data_dir>/reports/<zone>.json
//! <data_dir>/fights/<zone>_<encounter>_<difficulty>.json
//! <data_dir>/events/<zone>_<encounter>_<difficulty>_<code>_<fightID>.json
//! <data_dir>/events/<zone>_<encounter>_0_<code>_<fightID>_<pullID>.json   (dungeon pulls)
//! ```
//!
//! Missing artifacts map to `AnalysisError::NotFound`, unparseable ones to
//! `AnalysisError::Schema`; the analyzer decides which of those abort a run
//! and which just skip a fight.

use crate::error::AnalysisError;
use crate::models::{Difficulty, EventLog, Fight};
use anyhow::{Context, Result};
use glob::glob;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Create the cache directory layout if it does not exist yet.
    pub fn ensure_layout(&self) -> Result<()> {
        for subdir in ["reports", "fights", "events"] {
            fs::create_dir_all(self.data_dir.join(subdir))
                .with_context(|| format!("failed to create cache directory {}", subdir))?;
        }
        Ok(())
    }

    pub fn reports_path(&self, zone: i64) -> PathBuf {
        self.data_dir.join("reports").join(format!("{}.json", zone))
    }

    pub fn fights_path(&self, zone: i64, encounter: i64, difficulty: Difficulty) -> PathBuf {
        self.data_dir
            .join("fights")
            .join(format!("{}_{}_{}.json", zone, encounter, difficulty))
    }

    pub fn events_path(
        &self,
        zone: i64,
        encounter: i64,
        difficulty: Difficulty,
        code: &str,
        fight_id: i64,
    ) -> PathBuf {
        self.data_dir.join("events").join(format!(
            "{}_{}_{}_{}_{}.json",
            zone, encounter, difficulty, code, fight_id
        ))
    }

    pub fn pull_events_path(
        &self,
        zone: i64,
        encounter: i64,
        code: &str,
        fight_id: i64,
        pull_id: i64,
    ) -> PathBuf {
        self.data_dir.join("events").join(format!(
            "{}_{}_{}_{}_{}_{}.json",
            zone,
            encounter,
            Difficulty::Dungeon,
            code,
            fight_id,
            pull_id
        ))
    }

    /// All cached pull logs for one dungeon fight, in pull order. Used when
    /// the fight list was fetched without pull metadata but the pull logs
    /// themselves are on disk.
    pub fn list_pull_logs(
        &self,
        zone: i64,
        encounter: i64,
        code: &str,
        fight_id: i64,
    ) -> Vec<PathBuf> {
        let pattern = self.data_dir.join("events").join(format!(
            "{}_{}_{}_{}_{}_*.json",
            zone,
            encounter,
            Difficulty::Dungeon,
            code,
            fight_id
        ));
        let mut paths: Vec<PathBuf> = glob(&pattern.to_string_lossy())
            .map(|entries| entries.flatten().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    pub fn load_fight_list(
        &self,
        zone: i64,
        encounter: i64,
        difficulty: Difficulty,
    ) -> Result<Vec<Fight>, AnalysisError> {
        let path = self.fights_path(zone, encounter, difficulty);
        let content = read_artifact(&path)?;
        serde_json::from_str(&content).map_err(|e| AnalysisError::Schema {
            path,
            detail: e.to_string(),
        })
    }

    pub fn load_event_log(&self, path: &Path) -> Result<EventLog, AnalysisError> {
        let content = read_artifact(path)?;
        serde_json::from_str(&content).map_err(|e| AnalysisError::Schema {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Write an artifact, creating the layout on first use.
    pub fn save_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.ensure_layout()?;
        let content =
            serde_json::to_string_pretty(value).context("failed to serialize artifact")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write artifact {}", path.display()))?;
        Ok(())
    }
}

fn read_artifact(path: &Path) -> Result<String, AnalysisError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AnalysisError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(AnalysisError::Schema {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_follow_cache_naming() {
        let store = Store::new("/tmp/data");
        assert_eq!(
            store.fights_path(44, 3131, Difficulty::Mythic),
            PathBuf::from("/tmp/data/fights/44_3131_5.json")
        );
        assert_eq!(
            store.events_path(44, 3131, Difficulty::Mythic, "abc123", 7),
            PathBuf::from("/tmp/data/events/44_3131_5_abc123_7.json")
        );
        assert_eq!(
            store.pull_events_path(45, 62287, "xyz", 3, 2),
            PathBuf::from("/tmp/data/events/45_62287_0_xyz_3_2.json")
        );
    }

    #[test]
    fn missing_fight_list_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        let err = store
            .load_fight_list(44, 3131, Difficulty::Mythic)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound { .. }));
    }

    #[test]
    fn malformed_fight_list_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        store.ensure_layout().unwrap();
        fs::write(
            store.fights_path(44, 3131, Difficulty::Mythic),
            "[{\"code\": 12}]",
        )
        .unwrap();
        let err = store
            .load_fight_list(44, 3131, Difficulty::Mythic)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Schema { .. }));
    }

    #[test]
    fn save_and_reload_event_log() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        let log = EventLog {
            start_time: 1_000,
            end_time: Some(90_000),
            pull_id: None,
            events: vec![],
        };
        let path = store.events_path(44, 3131, Difficulty::Mythic, "abc", 1);
        store.save_json(&path, &log).unwrap();
        let loaded = store.load_event_log(&path).unwrap();
        assert_eq!(loaded.start_time, 1_000);
        assert_eq!(loaded.end_time, Some(90_000));
    }

    #[test]
    fn pull_logs_listed_in_order() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        let log = EventLog {
            start_time: 0,
            end_time: None,
            pull_id: Some(1),
            events: vec![],
        };
        for pull_id in [2, 1, 3] {
            let path = store.pull_events_path(45, 62287, "xyz", 3, pull_id);
            store.save_json(&path, &log).unwrap();
        }
        let paths = store.list_pull_logs(45, 62287, "xyz", 3);
        assert_eq!(paths.len(), 3);
        assert!(paths[0].to_string_lossy().ends_with("_1.json"));
        assert!(paths[2].to_string_lossy().ends_with("_3.json"));
    }
}
