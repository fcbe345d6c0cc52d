//! Output formatting
//!
//! Renders analysis reports as colored terminal tables, structured JSON, or
//! a delimited file. Rows arrive sorted by (ability, phase, type, cast
//! index), so the terminal view just walks them and emits a heading whenever
//! the ability or phase changes.

use crate::analyzer::AnalysisReport;
use crate::models::{AggregateRow, EventType};
use crate::stats::{margin_of_error, Confidence};
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub struct DisplayManager;

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    pub fn new() -> Self {
        Self
    }

    pub fn display_report(
        &self,
        report: &AnalysisReport,
        show_intervals: bool,
        confidence: Option<Confidence>,
        json_output: bool,
    ) {
        if json_output {
            let rows: Vec<Value> = report
                .rows
                .iter()
                .map(|row| {
                    let mut value = serde_json::to_value(row).unwrap_or(Value::Null);
                    if let (Some(level), Value::Object(fields)) = (confidence, &mut value) {
                        if let Ok(margin) = margin_of_error(row.std, row.count, level) {
                            fields.insert("ciLower".to_string(), (row.mean - margin).into());
                            fields.insert("ciUpper".to_string(), (row.mean + margin).into());
                        }
                    }
                    value
                })
                .collect();
            let output = serde_json::json!({
                "fightsProcessed": report.fights_processed,
                "fightsSkipped": report.fights_skipped,
                "confidenceLevel": confidence.map(|level| level.label()),
                "rows": rows,
                "intervals": show_intervals.then_some(&report.intervals),
            });
            match serde_json::to_string_pretty(&output) {
                Ok(json_str) => println!("{}", json_str),
                Err(e) => eprintln!("Error serializing report to JSON: {}", e),
            }
            return;
        }

        println!("\n{}", "=".repeat(80).bright_cyan());
        println!("{}", "Cast Timing Report".bright_white().bold());
        println!("{}", "=".repeat(80).bright_cyan());
        println!(
            "\n{} {} fights analyzed • {} skipped • {} stat buckets\n",
            "📊".bright_yellow(),
            report.fights_processed.to_string().bright_white().bold(),
            report.fights_skipped.to_string().bright_white(),
            report.rows.len().to_string().bright_white().bold()
        );

        let mut current: Option<(i64, u32, EventType)> = None;
        for row in &report.rows {
            let heading = (row.ability_id, row.phase, row.kind);
            if current != Some(heading) {
                if current.map(|(ability, _, _)| ability) != Some(row.ability_id) {
                    println!(
                        "{} Ability {}",
                        "⚔️".bright_blue(),
                        row.ability_id.to_string().bright_white().bold()
                    );
                }
                println!(
                    "   Phase {} ({})",
                    row.phase.to_string().bright_cyan(),
                    row.kind.to_string().bright_yellow()
                );
                current = Some(heading);
            }
            let ci = confidence
                .and_then(|level| {
                    margin_of_error(row.std, row.count, level)
                        .ok()
                        .map(|margin| (level, margin))
                })
                .map(|(level, margin)| {
                    format!(
                        ", ci{}=[{:.2}, {:.2}]",
                        level.label(),
                        row.mean - margin,
                        row.mean + margin
                    )
                })
                .unwrap_or_default();
            println!(
                "      Cast #{}: count={}, avg={}, std={}, min={:.2}, max={:.2}{}",
                row.cast_index.to_string().bright_white(),
                row.count.to_string().bright_white(),
                format!("{:.2}s", row.mean).bright_green(),
                format!("{:.2}", row.std).bright_yellow(),
                row.min,
                row.max,
                ci
            );
        }

        if show_intervals && !report.intervals.is_empty() {
            println!("\n{}", "-".repeat(80).bright_cyan());
            println!("{}", "Estimated Cast Intervals".bright_white().bold());
            for interval in &report.intervals {
                if interval.intervals.len() < 2 {
                    continue;
                }
                println!(
                    "   Ability {} phase {} ({}): ≈ {} between casts ({} std)",
                    interval.ability_id.to_string().bright_white().bold(),
                    interval.phase.to_string().bright_cyan(),
                    interval.kind.to_string().bright_yellow(),
                    format!("{:.2}s", interval.mean_interval).bright_green().bold(),
                    format!("{:.2}s", interval.std_interval).bright_yellow()
                );
            }
        }
    }

    /// Export aggregate rows as a comma-delimited table.
    pub fn write_csv(&self, path: &Path, rows: &[AggregateRow]) -> Result<()> {
        let mut content =
            String::from("abilityID,phase,type,castIndex,count,mean,std,min,max\n");
        for row in rows {
            content.push_str(&format!(
                "{},{},{},{},{},{:.4},{:.4},{:.4},{:.4}\n",
                row.ability_id,
                row.phase,
                row.kind,
                row.cast_index,
                row.count,
                row.mean,
                row.std,
                row.min,
                row.max
            ));
        }
        fs::write(path, content)
            .with_context(|| format!("failed to write table to {}", path.display()))?;
        Ok(())
    }
}
