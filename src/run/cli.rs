use clap::{Args, ValueHint};
use std::path::PathBuf;

use anyhow::Result;

use crate::optimize::{Defaults, OptimizeConfig};
use crate::report::ReportFormat;

/// Optimization knobs shared by `run` and `check`. Unset flags fall back
/// to the defaults file, then to built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct OptimizeFlags {
    /// Target reading speed in characters per second (10-40)
    #[arg(long, value_name = "CPS")]
    pub chars_per_sec: Option<f64>,

    /// Minimum display duration in seconds (0.5-2)
    #[arg(long, value_name = "SECONDS")]
    pub min_duration: Option<f64>,

    /// Maximum ideal display duration in seconds (3-15)
    #[arg(long, value_name = "SECONDS")]
    pub max_duration: Option<f64>,

    /// Minimum gap between consecutive cues in seconds (0.01-0.2)
    #[arg(long, value_name = "SECONDS")]
    pub min_gap: Option<f64>,

    /// Duration below which a cue may receive rebalanced time (0.5-1.5)
    #[arg(long, value_name = "SECONDS")]
    pub short_threshold: Option<f64>,

    /// Duration above which a cue may donate rebalanced time (2-6)
    #[arg(long, value_name = "SECONDS")]
    pub long_threshold: Option<f64>,

    /// Maximum lead-in shift in seconds (0-1)
    #[arg(long, value_name = "SECONDS")]
    pub max_anticipation: Option<f64>,
}

impl OptimizeFlags {
    /// Layer defaults file and CLI flags into a validated config.
    pub fn build_config(&self, defaults: &Defaults, merge: bool) -> Result<OptimizeConfig> {
        let mut config = OptimizeConfig::default();
        defaults.apply(&mut config);

        if let Some(value) = self.chars_per_sec {
            config.chars_per_sec = value;
        }
        if let Some(value) = self.min_duration {
            config.min_duration = value;
        }
        if let Some(value) = self.max_duration {
            config.max_duration = value;
        }
        if let Some(value) = self.min_gap {
            config.min_gap = value;
        }
        if let Some(value) = self.short_threshold {
            config.short_threshold = value;
        }
        if let Some(value) = self.long_threshold {
            config.long_threshold = value;
        }
        if let Some(value) = self.max_anticipation {
            config.max_anticipation = value;
        }
        config.merge_duplicates = merge;

        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Video files, subtitle files, or directories to process
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub flags: OptimizeFlags,

    /// Merge duplicate/continuation cues before optimizing
    #[arg(long)]
    pub merge: bool,

    /// Output directory for optimized files (default: next to the input)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Label inserted into output filenames (default: "fixed")
    #[arg(long)]
    pub label: Option<String>,

    /// Analyze without writing any files
    #[arg(long)]
    pub dry_run: bool,

    /// Process directories without asking for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Report output format
    #[arg(long, value_enum, default_value = "console")]
    pub report_format: ReportFormat,

    /// Save the rendered report to a file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub save_report: Option<PathBuf>,

    /// Custom path to the ffmpeg binary
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Custom path to the ffprobe binary
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub ffprobe_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Video file to inspect
    #[arg(value_hint = ValueHint::FilePath)]
    pub video: PathBuf,

    /// Custom path to the ffprobe binary
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub ffprobe_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Subtitle file to check
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    #[command(flatten)]
    pub flags: OptimizeFlags,
}
