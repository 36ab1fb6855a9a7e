use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use dialoguer::Confirm;
use walkdir::WalkDir;

use crate::common::progress::{create_batch_bar, create_spinner, finish_spinner_with_success};
use crate::extract;
use crate::formats::{self, Format, SubtitleFile};
use crate::optimize::{self, Defaults, OptimizeConfig, OverlapRegistry};
use crate::probe::{self, SubtitleTrack};
use crate::report::{FailedInput, ReportFormat, RunReport, TrackReport};
use crate::ui::prelude::*;

use super::cli::{CheckArgs, ProbeArgs, RunArgs};

const VIDEO_EXTENSIONS: [&str; 8] = ["mkv", "mp4", "avi", "mov", "wmv", "flv", "webm", "m4v"];

enum InputKind {
    Video,
    Subtitle,
}

pub fn handle_run(args: RunArgs) -> Result<()> {
    let defaults = Defaults::load()?;
    let config = args.flags.build_config(&defaults, args.merge)?;
    let label = args
        .label
        .clone()
        .or_else(|| defaults.label.clone())
        .unwrap_or_else(|| "fixed".to_string());

    if is_debug_enabled() {
        debug("run.config", &format!("{config:?}"));
    }

    let inputs = expand_paths(&args.paths, args.yes)?;
    if inputs.is_empty() {
        bail!("no video or subtitle files to process");
    }

    let mut report = RunReport::new();
    let bar = (inputs.len() > 1).then(|| create_batch_bar(inputs.len() as u64));

    for input in &inputs {
        if let Some(bar) = &bar {
            bar.set_message(
                input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
        }

        let outcome = match classify(input) {
            Ok(InputKind::Subtitle) => process_subtitle_file(input, &config, &args, &label)
                .map(|track| vec![track]),
            Ok(InputKind::Video) => process_video(input, &config, &args, &label),
            Err(error) => Err(error),
        };

        match outcome {
            Ok(tracks) => report.tracks.extend(tracks),
            Err(error) => {
                error_with_data(
                    "run.input.failed",
                    &format!("{}: {error:#}", input.display()),
                    serde_json::json!({ "input": input.display().to_string() }),
                );
                report.failed_inputs.push(FailedInput {
                    source: input.clone(),
                    error: format!("{error:#}"),
                });
            }
        }

        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    emit_report(&report, args.report_format);

    if let Some(path) = &args.save_report {
        report.save(args.report_format, path)?;
        success("run.report.saved", &format!("Report saved: {}", path.display()));
    }

    if report.tracks.is_empty() {
        bail!("no subtitle tracks were processed successfully");
    }

    Ok(())
}

pub fn handle_probe(args: ProbeArgs) -> Result<()> {
    let ffprobe = probe::find_ffprobe(args.ffprobe_path.as_deref())?;
    let tracks = probe::probe_subtitle_tracks(&ffprobe, &args.video)?;

    if tracks.is_empty() {
        warn(
            "probe.empty",
            &format!("No subtitle tracks in {}", args.video.display()),
        );
        return Ok(());
    }

    info(
        "probe.count",
        &format!(
            "{} subtitle track(s) in {}",
            tracks.len(),
            args.video.display()
        ),
    );
    for track in &tracks {
        let line = if track.is_text_based() {
            track.describe()
        } else {
            format!("{} (image-based, not optimizable)", track.describe())
        };
        emit(
            Level::Info,
            "probe.track",
            &line,
            Some(serde_json::json!({
                "index": track.index,
                "codec": track.codec,
                "language": track.language,
                "title": track.title,
                "default": track.default,
                "forced": track.forced,
                "text_based": track.is_text_based(),
            })),
        );
    }

    Ok(())
}

pub fn handle_check(args: CheckArgs) -> Result<()> {
    let defaults = Defaults::load()?;
    let config = args.flags.build_config(&defaults, false)?;

    let file = formats::parse_file(&args.file)?;
    let summary = sequence_summary(&file, &config);

    let registry = OverlapRegistry::detect(&file.cues);
    if !registry.is_empty() {
        debug(
            "check.overlaps",
            &format!(
                "{} adjacent pair(s) overlap in the source timing",
                registry.len()
            ),
        );
    }

    info(
        "check.file",
        &format!(
            "{}: {} cues ({})",
            args.file.display(),
            file.cues.len(),
            file.format.name()
        ),
    );
    data("check.summary", serde_json::to_value(&summary)?);

    if summary.clean() {
        success("check.clean", "No constraint violations found");
    } else {
        warn(
            "check.violations",
            &format!(
                "{} below min duration, {} gaps below minimum, {} overlaps, {} out of order, reading speed avg {:.1} cps",
                summary.below_min_duration,
                summary.below_min_gap,
                summary.overlaps,
                summary.chronology_violations,
                summary.avg_reading_speed,
            ),
        );
    }

    Ok(())
}

#[derive(Debug, serde::Serialize)]
struct SequenceSummary {
    total: usize,
    below_min_duration: usize,
    below_min_gap: usize,
    overlaps: usize,
    chronology_violations: usize,
    above_target_speed: usize,
    avg_reading_speed: f64,
}

impl SequenceSummary {
    fn clean(&self) -> bool {
        self.below_min_duration == 0
            && self.below_min_gap == 0
            && self.overlaps == 0
            && self.chronology_violations == 0
    }
}

fn sequence_summary(file: &SubtitleFile, config: &OptimizeConfig) -> SequenceSummary {
    let cues = &file.cues;
    let mut summary = SequenceSummary {
        total: cues.len(),
        below_min_duration: 0,
        below_min_gap: 0,
        overlaps: 0,
        chronology_violations: 0,
        above_target_speed: 0,
        avg_reading_speed: 0.0,
    };

    let mut speed_sum = 0.0;
    let mut speed_count = 0usize;

    for (i, cue) in cues.iter().enumerate() {
        if cue.duration() < config.min_duration {
            summary.below_min_duration += 1;
        }
        if cue.duration() > 0.0 {
            let speed = cue.char_count() as f64 / cue.duration();
            speed_sum += speed;
            speed_count += 1;
            if speed > config.chars_per_sec {
                summary.above_target_speed += 1;
            }
        }
        if i > 0 {
            let prev = &cues[i - 1];
            if cue.start < prev.start {
                summary.chronology_violations += 1;
            }
            let gap = cue.start - prev.end;
            if gap < 0.0 {
                summary.overlaps += 1;
            } else if gap < config.min_gap {
                summary.below_min_gap += 1;
            }
        }
    }

    if speed_count > 0 {
        summary.avg_reading_speed = speed_sum / speed_count as f64;
    }

    summary
}

fn classify(path: &Path) -> Result<InputKind> {
    if Format::from_extension(path).is_some() {
        return Ok(InputKind::Subtitle);
    }
    if has_video_extension(path) {
        return Ok(InputKind::Video);
    }
    bail!("not a recognized video or subtitle file");
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand directories (non-recursively) into video files, asking before
/// committing to a batch unless `--yes` was given.
fn expand_paths(paths: &[PathBuf], assume_yes: bool) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();

    for path in paths {
        if path.is_file() {
            expanded.push(path.clone());
            continue;
        }

        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .max_depth(1)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| has_video_extension(p))
                .collect();
            found.sort();

            if found.is_empty() {
                warn(
                    "run.dir.empty",
                    &format!("No video files in {}", path.display()),
                );
                continue;
            }

            info(
                "run.dir.found",
                &format!("Found {} video file(s) in {}", found.len(), path.display()),
            );

            let confirmed = assume_yes
                || !std::io::stdin().is_terminal()
                || Confirm::new()
                    .with_prompt(format!("Process all {} video(s)?", found.len()))
                    .default(true)
                    .interact()
                    .unwrap_or(false);

            if confirmed {
                expanded.extend(found);
            } else {
                info("run.dir.skipped", &format!("Skipping {}", path.display()));
            }
            continue;
        }

        warn("run.path.missing", &format!("Path not found: {}", path.display()));
    }

    Ok(expanded)
}

fn process_subtitle_file(
    path: &Path,
    config: &OptimizeConfig,
    args: &RunArgs,
    label: &str,
) -> Result<TrackReport> {
    debug("run.subtitle.parse", &format!("Parsing {}", path.display()));
    let file = formats::parse_file(path)?;
    let outcome = optimize::optimize(&file.cues, config, 0)?;

    let output = subtitle_output_path(path, args.output_dir.as_deref(), label, file.format);
    if !args.dry_run {
        formats::write_file(&file, &outcome.cues, &output)?;
        success(
            "run.saved",
            &format!("Saved {}", output.display()),
        );
    }

    Ok(TrackReport {
        source: path.to_path_buf(),
        track: None,
        language: None,
        output: (!args.dry_run).then_some(output),
        stats: outcome.stats,
    })
}

fn process_video(
    path: &Path,
    config: &OptimizeConfig,
    args: &RunArgs,
    label: &str,
) -> Result<Vec<TrackReport>> {
    let ffprobe = probe::find_ffprobe(args.ffprobe_path.as_deref())?;
    let ffmpeg = extract::find_ffmpeg(args.ffmpeg_path.as_deref())?;

    let spinner = create_spinner(format!("Probing {}", path.display()));
    let tracks = probe::probe_subtitle_tracks(&ffprobe, path)?;
    let text_tracks: Vec<SubtitleTrack> =
        tracks.iter().filter(|t| t.is_text_based()).cloned().collect();
    let skipped = tracks.len() - text_tracks.len();
    finish_spinner_with_success(
        spinner,
        format!(
            "{}: {} text subtitle track(s)",
            path.display(),
            text_tracks.len()
        ),
    );

    if skipped > 0 {
        warn(
            "run.video.image_tracks",
            &format!("Skipping {skipped} image-based subtitle track(s)"),
        );
    }
    if text_tracks.is_empty() {
        bail!("no text-based subtitle tracks");
    }

    let mut reports = Vec::new();
    for track in &text_tracks {
        match process_video_track(path, &ffmpeg, track, config, args, label) {
            Ok(report) => reports.push(report),
            Err(cause) => {
                error(
                    "run.track.failed",
                    &format!("{} track {}: {cause:#}", path.display(), track.index),
                );
            }
        }
    }

    if reports.is_empty() {
        bail!("every subtitle track failed");
    }

    Ok(reports)
}

fn process_video_track(
    video: &Path,
    ffmpeg: &Path,
    track: &SubtitleTrack,
    config: &OptimizeConfig,
    args: &RunArgs,
    label: &str,
) -> Result<TrackReport> {
    debug(
        "run.track.extract",
        &format!("Extracting {}", track.describe()),
    );
    let scratch = extract::extract_track(ffmpeg, video, track)?;

    let file = formats::parse_file(&scratch)
        .with_context(|| format!("parsing extracted track {}", track.index))?;
    let outcome = optimize::optimize(&file.cues, config, track.index)?;

    let output = track_output_path(
        video,
        args.output_dir.as_deref(),
        track,
        label,
        file.format,
    );
    if !args.dry_run {
        formats::write_file(&file, &outcome.cues, &output)?;
        success("run.saved", &format!("Saved {}", output.display()));
    }

    Ok(TrackReport {
        source: video.to_path_buf(),
        track: Some(track.index),
        language: track.language.clone(),
        output: (!args.dry_run).then_some(output),
        stats: outcome.stats,
    })
}

/// `<stem>.<label>.<ext>` next to the input or under `--output-dir`.
fn subtitle_output_path(
    input: &Path,
    output_dir: Option<&Path>,
    label: &str,
    format: Format,
) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subtitles".to_string());
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(format!("{stem}.{label}.{}", format.extension()))
}

/// `<stem>.<track>.<lang>.<label>.<ext>` for container tracks.
fn track_output_path(
    video: &Path,
    output_dir: Option<&Path>,
    track: &SubtitleTrack,
    label: &str,
    format: Format,
) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| video.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let mut parts = vec![stem, track.index.to_string()];
    if let Some(language) = &track.language {
        parts.push(language.clone());
    }
    parts.push(label.to_string());
    dir.join(format!("{}.{}", parts.join("."), format.extension()))
}

fn emit_report(report: &RunReport, format: ReportFormat) {
    if report.is_empty() {
        return;
    }

    match get_output_format() {
        OutputFormat::Json => {
            // Keep stdout machine-readable regardless of the report style.
            data("run.report", report.to_value());
        }
        OutputFormat::Text => {
            separator();
            print!("{}", report.render(format));
        }
    }
}
