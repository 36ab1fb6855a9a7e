//! Run reports: per-track statistics rendered as console tables, JSON,
//! markdown or CSV, optionally saved to a file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

use crate::optimize::OptimizeStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
    Csv,
}

/// Statistics for one optimized track plus where it came from and went.
#[derive(Debug, Clone, Serialize)]
pub struct TrackReport {
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub stats: OptimizeStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub tracks: Vec<TrackReport>,
    pub failed_inputs: Vec<FailedInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedInput {
    pub source: PathBuf,
    pub error: String,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            tracks: Vec::new(),
            failed_inputs: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.failed_inputs.is_empty()
    }

    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Console => self.render_console(),
            ReportFormat::Json => self.render_json(),
            ReportFormat::Markdown => self.render_markdown(),
            ReportFormat::Csv => self.render_csv(),
        }
    }

    pub fn save(&self, format: ReportFormat, path: &Path) -> Result<()> {
        fs::write(path, self.render(format))
            .with_context(|| format!("writing report to {}", path.display()))
    }

    fn render_console(&self) -> String {
        let mut out = String::new();

        for report in &self.tracks {
            out.push_str(&format!("{}\n", report.describe_source()));

            let stats = &report.stats;
            let mut table = Table::new();
            table.load_preset(UTF8_FULL_CONDENSED);
            table.set_header(vec!["Metric", "Value"]);
            table.add_row(vec!["Cues in".to_string(), stats.original_count.to_string()]);
            table.add_row(vec!["Cues out".to_string(), stats.final_count.to_string()]);
            table.add_row(vec![
                "Duration adjustments".to_string(),
                format!(
                    "{} ({:+.3}s avg)",
                    stats.duration_adjustments,
                    stats.avg_duration_change()
                ),
            ]);
            table.add_row(vec![
                "Rebalanced pairs".to_string(),
                format!(
                    "{} ({:.3}s moved)",
                    stats.rebalanced_pairs, stats.total_time_transferred
                ),
            ]);
            table.add_row(vec![
                "Anticipated cues".to_string(),
                format!(
                    "{} ({:.3}s avg)",
                    stats.anticipated_cues,
                    stats.avg_anticipation()
                ),
            ]);
            table.add_row(vec![
                "Repairs (duration/gap/order)".to_string(),
                format!(
                    "{}/{}/{}",
                    stats.min_duration_repairs, stats.gap_repairs, stats.chronology_fixes
                ),
            ]);
            table.add_row(vec!["Removed".to_string(), stats.removed_invalid.to_string()]);
            if stats.merged_cues > 0 {
                table.add_row(vec!["Merged".to_string(), stats.merged_cues.to_string()]);
            }
            table.add_row(vec![
                "Modified".to_string(),
                format!(
                    "{} ({:.1}%)",
                    stats.total_modifications(),
                    stats.modification_percentage()
                ),
            ]);
            table.add_row(vec![
                "Processing time".to_string(),
                format!("{:.3}s", stats.processing_secs),
            ]);
            out.push_str(&table.to_string());
            out.push('\n');
        }

        if self.tracks.len() > 1 {
            let totals = self.totals();
            out.push_str(&format!(
                "Total: {} tracks, {} cues in, {} cues out, {} modifications, {:.3}s\n",
                self.tracks.len(),
                totals.original_count,
                totals.final_count,
                totals.modifications,
                totals.processing_secs,
            ));
        }

        for failure in &self.failed_inputs {
            out.push_str(&format!(
                "failed: {} ({})\n",
                failure.source.display(),
                failure.error
            ));
        }

        out
    }

    /// JSON form with the derived per-track aggregates folded in.
    pub fn to_value(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(tracks) = value.get_mut("tracks").and_then(|t| t.as_array_mut()) {
            for (track_value, report) in tracks.iter_mut().zip(&self.tracks) {
                if let Some(stats) = track_value.get_mut("stats") {
                    stats["avg_duration_change"] = report.stats.avg_duration_change().into();
                    stats["avg_anticipation"] = report.stats.avg_anticipation().into();
                    stats["total_modifications"] = report.stats.total_modifications().into();
                    stats["modification_percentage"] =
                        report.stats.modification_percentage().into();
                }
            }
        }
        value
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_else(|_| "{}".to_string())
    }

    fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Subtitle optimization report\n\n");
        out.push_str(&format!(
            "Generated: {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        out.push_str(
            "| Source | Track | Cues in | Cues out | Duration adj. | Rebalanced | Anticipated | Repairs | Removed |\n",
        );
        out.push_str("|---|---|---|---|---|---|---|---|---|\n");
        for report in &self.tracks {
            let stats = &report.stats;
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                report.source.display(),
                report
                    .track
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                stats.original_count,
                stats.final_count,
                stats.duration_adjustments,
                stats.rebalanced_pairs,
                stats.anticipated_cues,
                stats.min_duration_repairs + stats.gap_repairs + stats.chronology_fixes,
                stats.removed_invalid,
            ));
        }

        if !self.failed_inputs.is_empty() {
            out.push_str("\n## Failures\n\n");
            for failure in &self.failed_inputs {
                out.push_str(&format!(
                    "- {}: {}\n",
                    failure.source.display(),
                    failure.error
                ));
            }
        }

        out
    }

    fn render_csv(&self) -> String {
        let mut out = String::from(
            "source,track,language,cues_in,cues_out,duration_adjustments,total_duration_change,rebalanced_pairs,total_time_transferred,anticipated_cues,total_anticipation,min_duration_repairs,gap_repairs,chronology_fixes,removed_invalid,merged_cues,processing_secs\n",
        );
        for report in &self.tracks {
            let stats = &report.stats;
            out.push_str(&format!(
                "{},{},{},{},{},{},{:.3},{},{:.3},{},{:.3},{},{},{},{},{},{:.3}\n",
                csv_field(&report.source.display().to_string()),
                report
                    .track
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                report.language.clone().unwrap_or_default(),
                stats.original_count,
                stats.final_count,
                stats.duration_adjustments,
                stats.total_duration_change,
                stats.rebalanced_pairs,
                stats.total_time_transferred,
                stats.anticipated_cues,
                stats.total_anticipation,
                stats.min_duration_repairs,
                stats.gap_repairs,
                stats.chronology_fixes,
                stats.removed_invalid,
                stats.merged_cues,
                stats.processing_secs,
            ));
        }
        out
    }

    fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for report in &self.tracks {
            totals.original_count += report.stats.original_count;
            totals.final_count += report.stats.final_count;
            totals.modifications += report.stats.total_modifications();
            totals.processing_secs += report.stats.processing_secs;
        }
        totals
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackReport {
    fn describe_source(&self) -> String {
        let mut parts = vec![self.source.display().to_string()];
        if let Some(track) = self.track {
            parts.push(format!("track {track}"));
        }
        if let Some(language) = &self.language {
            parts.push(language.clone());
        }
        if let Some(output) = &self.output {
            parts.push(format!("-> {}", output.display()));
        }
        parts.join(" ")
    }
}

#[derive(Default)]
struct Totals {
    original_count: usize,
    final_count: usize,
    modifications: usize,
    processing_secs: f64,
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
