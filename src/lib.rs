//! Cast Stats Library
//!
//! Analyzes cached raid and dungeon combat-log telemetry to answer one
//! question: when does an encounter cast each of its abilities? Fights are
//! segmented into phases, every cast event is placed on a per-phase clock,
//! and matching casts are aggregated across fights into per-ability timing
//! statistics.
//!
//! ## Pipeline
//!
//! - [`store`] - On-disk cache of fight lists and event logs
//! - [`phases`] - Phase boundary resolution (scripted transitions,
//!   ability-triggered rules, dungeon pulls)
//! - [`classify`] - Per-event phase assignment, elapsed-time computation
//!   and begincast/cast deduplication
//! - [`indexer`] - Per-bucket cast index assignment
//! - [`stats`] - Descriptive statistics, interval tables and confidence
//!   intervals
//! - [`analyzer`] - Batch engine coordinating the steps above
//! - [`display`] - Terminal, JSON and CSV report rendering
//! - [`api`] - Optional GraphQL fetch client (feature `fetch`)
//!
//! ## Main Entry Point
//!
//! The primary interface is [`CastStatsAnalyzer`]:
//!
//! ```rust,no_run
//! use cast_stats::{AnalyzeOptions, CastStatsAnalyzer};
//! use cast_stats::models::Difficulty;
//! use cast_stats::store::Store;
//!
//! # fn example() -> Result<(), cast_stats::AnalysisError> {
//! let analyzer = CastStatsAnalyzer::new(Store::new("/var/cache/cast-stats"));
//! let report = analyzer.analyze_raid(&AnalyzeOptions {
//!     zone: 44,
//!     encounter: 3131,
//!     difficulty: Difficulty::Mythic,
//!     min_count: 2,
//!     max_percentage: None,
//!     phase_rules: vec![],
//! })?;
//! println!("{} fights analyzed", report.fights_processed);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod classify;
pub mod config;
pub mod display;
pub mod error;
pub mod indexer;
pub mod logging;
pub mod models;
pub mod phases;
pub mod stats;
pub mod store;

#[cfg(feature = "fetch")]
pub mod api;

pub use analyzer::{AnalysisReport, AnalyzeOptions, CastStatsAnalyzer, DungeonOptions};
pub use error::AnalysisError;
pub use models::*;
