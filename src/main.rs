use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use cast_stats::analyzer::{AnalyzeOptions, CastStatsAnalyzer, DungeonOptions};
use cast_stats::config::get_config;
use cast_stats::display::DisplayManager;
use cast_stats::logging::init_logging;
use cast_stats::models::{Difficulty, EventType};
use cast_stats::phases::PhaseRule;
use cast_stats::stats::Confidence;
use cast_stats::store::Store;

#[derive(Parser)]
#[command(name = "cast-stats")]
#[command(about = "Cast timing statistics for raid and dungeon combat logs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze cast timings for a raid encounter
    Analyze {
        /// Zone id containing the encounter
        zone: i64,
        /// Encounter id to analyze
        encounter: i64,
        /// Encounter difficulty
        #[arg(long, value_enum, default_value = "mythic")]
        difficulty: Difficulty,
        /// Drop stat buckets with fewer samples than this
        #[arg(long)]
        min_count: Option<usize>,
        /// Keep only fights at or below this wipe percentage
        #[arg(long)]
        max_percentage: Option<f64>,
        /// Ability-triggered phase rule as ABILITY:TYPE:OCCURRENCE,
        /// e.g. 450920:begincast:2 (occurrence is 0-based); repeatable
        #[arg(long = "phase-rule", value_parser = parse_phase_rule)]
        phase_rule: Vec<PhaseRule>,
        /// Show estimated inter-cast intervals
        #[arg(long)]
        intervals: bool,
        /// Confidence level for interval estimates
        #[arg(long, value_enum)]
        confidence: Option<Confidence>,
        /// Write aggregate rows to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Analyze one encounter of a dungeon, pull by pull
    Dungeon {
        /// Zone id containing the dungeon
        zone: i64,
        /// Dungeon encounter id (the fight-list key)
        dungeon: i64,
        /// Boss encounter id whose pulls to analyze
        encounter: i64,
        /// Drop stat buckets with fewer samples than this
        #[arg(long)]
        min_count: Option<usize>,
        /// Show estimated inter-cast intervals
        #[arg(long)]
        intervals: bool,
        /// Confidence level for interval estimates
        #[arg(long, value_enum)]
        confidence: Option<Confidence>,
        /// Write aggregate rows to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Fetch and cache report codes for a zone
    #[cfg(feature = "fetch")]
    FetchReports {
        /// Zone id to list reports for
        zone: i64,
        /// Maximum number of report pages to fetch
        #[arg(long, default_value_t = 10)]
        max_pages: usize,
    },
    /// Fetch and cache fight lists for previously fetched reports
    #[cfg(feature = "fetch")]
    FetchFights {
        /// Zone id containing the encounter
        zone: i64,
        /// Encounter id to filter fights by
        encounter: i64,
        /// Encounter difficulty
        #[arg(long, value_enum, default_value = "mythic")]
        difficulty: Difficulty,
        /// Which fights to include
        #[arg(long, value_enum, default_value = "encounters")]
        kill_type: cast_stats::api::KillType,
    },
    /// Fetch and cache event logs for a cached fight list
    #[cfg(feature = "fetch")]
    FetchEvents {
        /// Zone id containing the encounter
        zone: i64,
        /// Encounter id whose fights to fetch events for
        encounter: i64,
        /// Encounter difficulty
        #[arg(long, value_enum, default_value = "mythic")]
        difficulty: Difficulty,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Held until exit so the file writer flushes its buffer.
    let _guard = init_logging();

    let config = get_config();
    let store = Store::new(config.paths.data_dir.clone());

    match cli.command {
        Commands::Analyze {
            zone,
            encounter,
            difficulty,
            min_count,
            max_percentage,
            phase_rule,
            intervals,
            confidence,
            csv,
            json,
        } => {
            let options = AnalyzeOptions {
                zone,
                encounter,
                difficulty,
                min_count: min_count.unwrap_or(config.analysis.min_count),
                max_percentage: max_percentage.or(config.analysis.max_percentage),
                phase_rules: phase_rule,
            };
            let analyzer = CastStatsAnalyzer::new(store);
            match analyzer.analyze_raid(&options) {
                Ok(report) => {
                    let display = DisplayManager::new();
                    if let Some(path) = csv {
                        display.write_csv(&path, &report.rows)?;
                    }
                    display.display_report(&report, intervals, confidence, json);
                    Ok(())
                }
                Err(e) => handle_error(e.into(), json),
            }
        }
        Commands::Dungeon {
            zone,
            dungeon,
            encounter,
            min_count,
            intervals,
            confidence,
            csv,
            json,
        } => {
            let options = DungeonOptions {
                zone,
                dungeon,
                encounter,
                min_count: min_count.unwrap_or(config.analysis.min_count),
            };
            let analyzer = CastStatsAnalyzer::new(store);
            match analyzer.analyze_dungeon(&options) {
                Ok(report) => {
                    let display = DisplayManager::new();
                    if let Some(path) = csv {
                        display.write_csv(&path, &report.rows)?;
                    }
                    display.display_report(&report, intervals, confidence, json);
                    Ok(())
                }
                Err(e) => handle_error(e.into(), json),
            }
        }
        #[cfg(feature = "fetch")]
        Commands::FetchReports { zone, max_pages } => {
            match cast_stats::api::fetch_and_save_reports(
                &store,
                &config.paths.data_dir,
                zone,
                max_pages,
            )
            .await
            {
                Ok(()) => Ok(()),
                Err(e) => handle_error(e, false),
            }
        }
        #[cfg(feature = "fetch")]
        Commands::FetchFights {
            zone,
            encounter,
            difficulty,
            kill_type,
        } => {
            match cast_stats::api::fetch_and_save_fights(
                &store,
                &config.paths.data_dir,
                zone,
                encounter,
                difficulty,
                kill_type,
            )
            .await
            {
                Ok(()) => Ok(()),
                Err(e) => handle_error(e, false),
            }
        }
        #[cfg(feature = "fetch")]
        Commands::FetchEvents {
            zone,
            encounter,
            difficulty,
        } => {
            match cast_stats::api::fetch_and_save_events(
                &store,
                &config.paths.data_dir,
                zone,
                encounter,
                difficulty,
            )
            .await
            {
                Ok(()) => Ok(()),
                Err(e) => handle_error(e, false),
            }
        }
    }
}

fn parse_phase_rule(value: &str) -> Result<PhaseRule, String> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return Err(format!(
            "expected ABILITY:TYPE:OCCURRENCE, got '{}'",
            value
        ));
    }
    let ability_id = parts[0]
        .parse()
        .map_err(|_| format!("invalid ability id: {}", parts[0]))?;
    let kind: EventType = parts[1].parse()?;
    let occurrence = parts[2]
        .parse()
        .map_err(|_| format!("invalid occurrence: {}", parts[2]))?;
    Ok(PhaseRule {
        ability_id,
        kind,
        occurrence,
    })
}

fn handle_error(e: anyhow::Error, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "error": e.to_string() }));
    } else {
        eprintln!("Error: {}", e);
    }
    process::exit(1);
}
