mod common;

use anyhow::Result;
use common::{TestEnvironment, run_subpace};

const SHORT_CUE_SRT: &str = "1\n00:00:10,000 --> 00:00:10,300\nHi\n\n";

const BLOCKED_PAIR_SRT: &str =
    "1\n00:00:10,000 --> 00:00:10,300\nHi\n\n2\n00:00:10,800 --> 00:00:12,000\nNext\n\n";

const VTT_WITH_HEADER: &str = "WEBVTT\n\nNOTE keep me\n\n00:01.000 --> 00:02.000 align:start\n<i>Hello</i> there\n\n00:05.000 --> 00:05.400\nShort\n";

#[test]
fn run_extends_a_short_cue_to_the_duration_floor() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file("single.srt", SHORT_CUE_SRT)?;

    let output = run_subpace(&["run", input.to_str().unwrap(), "--yes"])?;
    assert_eq!(output.exit_code, 0, "run failed: {}", output.stderr);

    let result = env.read_file(&env.path().join("single.fixed.srt"))?;
    assert!(
        result.contains("00:00:10,000 --> 00:00:11,000"),
        "unexpected timing in:\n{result}"
    );
    assert!(result.contains("Hi"));
    Ok(())
}

#[test]
fn run_respects_the_following_cue_and_anticipates() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file("pair.srt", BLOCKED_PAIR_SRT)?;

    let output = run_subpace(&["run", input.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "run failed: {}", output.stderr);

    let result = env.read_file(&env.path().join("pair.fixed.srt"))?;
    // The first cue is capped min_gap short of its neighbour, then starts
    // earlier to make up the shortfall.
    assert!(
        result.contains("00:00:09,500 --> 00:00:10,750"),
        "unexpected timing in:\n{result}"
    );
    assert!(result.contains("00:00:10,800 --> 00:00:12,000"));
    Ok(())
}

#[test]
fn run_preserves_vtt_header_and_markup() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file("captions.vtt", VTT_WITH_HEADER)?;

    let output = run_subpace(&["run", input.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "run failed: {}", output.stderr);

    let result = env.read_file(&env.path().join("captions.fixed.vtt"))?;
    assert!(result.starts_with("WEBVTT"));
    assert!(result.contains("NOTE keep me"));
    assert!(result.contains("00:01.000 --> 00:02.000 align:start"));
    assert!(result.contains("<i>Hello</i> there"));
    // The tail cue grows to the duration floor.
    assert!(
        result.contains("00:05.000 --> 00:06.000"),
        "unexpected timing in:\n{result}"
    );
    Ok(())
}

#[test]
fn dry_run_writes_nothing() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file("single.srt", SHORT_CUE_SRT)?;

    let output = run_subpace(&["run", input.to_str().unwrap(), "--dry-run"])?;
    assert_eq!(output.exit_code, 0, "run failed: {}", output.stderr);
    assert!(!env.path().join("single.fixed.srt").exists());
    Ok(())
}

#[test]
fn json_report_is_saved_and_parses() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file("pair.srt", BLOCKED_PAIR_SRT)?;
    let report_path = env.path().join("report.json");

    let output = run_subpace(&[
        "run",
        input.to_str().unwrap(),
        "--report-format",
        "json",
        "--save-report",
        report_path.to_str().unwrap(),
    ])?;
    assert_eq!(output.exit_code, 0, "run failed: {}", output.stderr);

    let report: serde_json::Value = serde_json::from_str(&env.read_file(&report_path)?)?;
    assert_eq!(report["tracks"][0]["stats"]["original_count"], 2);
    assert_eq!(report["tracks"][0]["stats"]["final_count"], 2);
    Ok(())
}

#[test]
fn check_reports_violations_without_modifying() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file("single.srt", SHORT_CUE_SRT)?;
    let before = env.read_file(&input)?;

    let output = run_subpace(&["check", input.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "check failed: {}", output.stderr);
    assert!(
        output.stderr.contains("below min duration"),
        "expected violation summary, got:\n{}\n{}",
        output.stdout,
        output.stderr
    );
    assert_eq!(env.read_file(&input)?, before);
    Ok(())
}

#[test]
fn out_of_range_flag_fails_fast() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file("single.srt", SHORT_CUE_SRT)?;

    let output = run_subpace(&["run", input.to_str().unwrap(), "--chars-per-sec", "99"])?;
    assert_eq!(output.exit_code, 1);
    assert!(
        output.stderr.contains("chars_per_sec"),
        "unexpected stderr: {}",
        output.stderr
    );
    assert!(!env.path().join("single.fixed.srt").exists());
    Ok(())
}

#[test]
fn probing_a_missing_video_fails() -> Result<()> {
    let output = run_subpace(&["probe", "/nonexistent/movie.mkv"])?;
    assert_eq!(output.exit_code, 1);
    Ok(())
}

#[test]
fn completions_cover_the_binary_name() -> Result<()> {
    let output = run_subpace(&["completions", "bash"])?;
    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.contains("subpace"));
    Ok(())
}

#[test]
fn json_mode_emits_parseable_events() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file("single.srt", SHORT_CUE_SRT)?;

    let output = run_subpace(&["--json", "run", input.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "run failed: {}", output.stderr);

    let mut saw_report = false;
    for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
        let event: serde_json::Value = serde_json::from_str(line)
            .unwrap_or_else(|_| panic!("stdout line is not JSON: {line}"));
        if event["code"] == "run.report" {
            saw_report = true;
            assert_eq!(event["data"]["tracks"][0]["stats"]["original_count"], 1);
        }
    }
    assert!(saw_report, "no run.report event in:\n{}", output.stdout);
    Ok(())
}

#[test]
fn unknown_input_kind_is_reported_and_fails() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file("notes.txt", "not a subtitle file")?;

    let output = run_subpace(&["run", input.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 1);
    assert!(
        output.stderr.contains("not a recognized"),
        "unexpected stderr: {}",
        output.stderr
    );
    Ok(())
}
