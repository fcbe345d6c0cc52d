//! Batch analysis engine
//!
//! [`CastStatsAnalyzer`] coordinates the pipeline over a cached dataset:
//!
//! 1. **Load**: read the fight list for the requested zone/encounter/difficulty
//! 2. **Filter**: drop fights past the wipe-percentage threshold
//! 3. **Classify**: per fight, load its event log, resolve phase boundaries
//!    and classify events (in parallel per fight with the `parallel` feature)
//! 4. **Index**: assign per-bucket cast indices across all fights
//! 5. **Aggregate**: reduce to per-bucket statistics and inter-cast intervals
//!
//! A fight whose event log is missing or malformed is logged and skipped;
//! the report carries the skipped count so partial results are visible as
//! such. Only dataset-level problems (missing fight list, nothing usable)
//! abort the analysis.

use crate::classify::{classify, FightMeta};
use crate::error::AnalysisError;
use crate::models::{AggregateRow, CastIntervalRow, ClassifiedEvent, Difficulty, Fight};
use crate::phases::{dungeon_segments, resolve_time_based, resolve_with_rules, PhaseBoundary, PhaseRule};
use crate::stats::{aggregate, cast_intervals};
use crate::store::Store;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub zone: i64,
    pub encounter: i64,
    pub difficulty: Difficulty,
    pub min_count: usize,
    pub max_percentage: Option<f64>,
    pub phase_rules: Vec<PhaseRule>,
}

#[derive(Debug, Clone)]
pub struct DungeonOptions {
    pub zone: i64,
    pub dungeon: i64,
    pub encounter: i64,
    pub min_count: usize,
}

/// Result of one analysis run. `fights_skipped` counts fights excluded for
/// missing or malformed event logs.
#[derive(Debug)]
pub struct AnalysisReport {
    pub rows: Vec<AggregateRow>,
    pub intervals: Vec<CastIntervalRow>,
    pub fights_processed: usize,
    pub fights_skipped: usize,
}

pub struct CastStatsAnalyzer {
    store: Store,
}

impl CastStatsAnalyzer {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Analyze a raid encounter from the cached dataset.
    pub fn analyze_raid(&self, options: &AnalyzeOptions) -> Result<AnalysisReport, AnalysisError> {
        let fights = self
            .store
            .load_fight_list(options.zone, options.encounter, options.difficulty)?;

        let usable: Vec<&Fight> = fights
            .iter()
            .filter(|fight| match (options.max_percentage, fight.fight_percentage) {
                (Some(threshold), Some(percentage)) => percentage <= threshold,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .collect();

        if usable.is_empty() {
            return Err(AnalysisError::EmptyDataset {
                dataset: format!(
                    "{}_{}_{}",
                    options.zone, options.encounter, options.difficulty
                ),
            });
        }

        #[cfg(feature = "parallel")]
        let results: Vec<_> = usable
            .par_iter()
            .map(|fight| self.classify_raid_fight(fight, options))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = usable
            .iter()
            .map(|fight| self.classify_raid_fight(fight, options))
            .collect();

        self.reduce(results, options.min_count)
    }

    /// Analyze one encounter of a dungeon, treating every matching pull as
    /// an independent fight instance.
    pub fn analyze_dungeon(
        &self,
        options: &DungeonOptions,
    ) -> Result<AnalysisReport, AnalysisError> {
        let fights =
            self.store
                .load_fight_list(options.zone, options.dungeon, Difficulty::Dungeon)?;

        if fights.is_empty() {
            return Err(AnalysisError::EmptyDataset {
                dataset: format!("{}_{}_0", options.zone, options.dungeon),
            });
        }

        let mut results = Vec::new();
        for fight in &fights {
            results.extend(self.classify_dungeon_fight(fight, options));
        }

        self.reduce(results, options.min_count)
    }

    fn classify_raid_fight(
        &self,
        fight: &Fight,
        options: &AnalyzeOptions,
    ) -> Result<Vec<ClassifiedEvent>, AnalysisError> {
        let path = self.store.events_path(
            options.zone,
            options.encounter,
            options.difficulty,
            &fight.code,
            fight.id,
        );
        let log = self.store.load_event_log(&path)?;

        // Ability-triggered mode also drops melee autoattacks; they are
        // noise for boss timeline reconstruction.
        let boundaries = if options.phase_rules.is_empty() {
            resolve_time_based(fight)
        } else {
            resolve_with_rules(fight, &log.events, &options.phase_rules)
        };
        let exclude_melee = !options.phase_rules.is_empty();

        let meta = FightMeta::raid(&fight.code, fight.id, log.start_time);
        let classified = classify(&log.events, &boundaries, &meta, exclude_melee);
        debug!(
            fight_code = %fight.code,
            fight_id = fight.id,
            events = classified.len(),
            phases = boundaries.len(),
            "Classified fight"
        );
        Ok(classified)
    }

    /// One result per pull. Pull metadata from the fight list drives the
    /// lookup; without it, cached pull logs are discovered on disk.
    fn classify_dungeon_fight(
        &self,
        fight: &Fight,
        options: &DungeonOptions,
    ) -> Vec<Result<Vec<ClassifiedEvent>, AnalysisError>> {
        let segments = dungeon_segments(fight, options.encounter);

        if !segments.is_empty() {
            return segments
                .iter()
                .map(|segment| {
                    let path = self.store.pull_events_path(
                        options.zone,
                        options.encounter,
                        &fight.code,
                        fight.id,
                        segment.pull_id,
                    );
                    let log = self.store.load_event_log(&path)?;
                    let meta =
                        FightMeta::pull(&fight.code, fight.id, segment.pull_id, log.start_time);
                    let boundary = PhaseBoundary {
                        id: 1,
                        start_time: log.start_time,
                    };
                    Ok(classify(&log.events, &[boundary], &meta, false))
                })
                .collect();
        }

        self.store
            .list_pull_logs(options.zone, options.encounter, &fight.code, fight.id)
            .iter()
            .enumerate()
            .map(|(ordinal, path)| {
                let log = self.store.load_event_log(path)?;
                let pull_id = log.pull_id.unwrap_or(ordinal as i64 + 1);
                let meta = FightMeta::pull(&fight.code, fight.id, pull_id, log.start_time);
                let boundary = PhaseBoundary {
                    id: 1,
                    start_time: log.start_time,
                };
                Ok(classify(&log.events, &[boundary], &meta, false))
            })
            .collect()
    }

    /// Sequential reduce over per-fight classification results: failed
    /// fights are logged and skipped, the rest feed one indexing and
    /// aggregation pass.
    fn reduce(
        &self,
        results: Vec<Result<Vec<ClassifiedEvent>, AnalysisError>>,
        min_count: usize,
    ) -> Result<AnalysisReport, AnalysisError> {
        let mut classified = Vec::new();
        let mut fights_processed = 0;
        let mut fights_skipped = 0;

        for result in results {
            match result {
                Ok(events) => {
                    classified.extend(events);
                    fights_processed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Skipping fight");
                    fights_skipped += 1;
                }
            }
        }

        let indexed = crate::indexer::index(classified);
        let rows = aggregate(&indexed, min_count);
        let intervals = cast_intervals(&rows);

        Ok(AnalysisReport {
            rows,
            intervals,
            fights_processed,
            fights_skipped,
        })
    }
}
