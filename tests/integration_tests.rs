use std::path::Path;
use std::process::Command as StdCommand;
use std::sync::Arc;

use assert_cmd::Command;
use clipcut::adapters::memory_runtime::{simulated_clip_duration, simulated_source, InMemoryLoader};
use clipcut::adapters::{ClipcutConfig, FFprobeAdapter};
use clipcut::app::{AppContainer, ClipFailure, ClipJob, DefaultAppContainer};
use clipcut::{ClipError, TimeSpec};
use predicates::prelude::*;
use tempfile::TempDir;

/// Test utilities for video processing
mod test_utils {
    use super::*;

    /// Whether ffmpeg with libx264 and ffprobe are installed
    pub fn ffmpeg_available() -> bool {
        let encoders = StdCommand::new("ffmpeg").args(["-hide_banner", "-encoders"]).output();
        let has_x264 = matches!(encoders, Ok(out) if out.status.success()
            && String::from_utf8_lossy(&out.stdout).contains("libx264"));
        let has_probe = StdCommand::new("ffprobe")
            .arg("-version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);
        has_x264 && has_probe
    }

    /// Create a test recording with video and audio using FFmpeg
    pub fn create_test_video(output_path: &Path, duration: f64) {
        let status = StdCommand::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "lavfi",
                "-i",
                "testsrc=duration=10:size=320x240:rate=30",
                "-f",
                "lavfi",
                "-i",
                "sine=frequency=1000:duration=10",
                "-c:v",
                "libx264",
                "-c:a",
                "aac",
                "-t",
                &duration.to_string(),
                "-y",
            ])
            .arg(output_path)
            .status()
            .expect("failed to run ffmpeg");
        assert!(status.success(), "ffmpeg could not create the test recording");
    }

    /// Command running the binary in an isolated directory
    pub fn clipcut(dir: &TempDir) -> Command {
        let mut cmd = Command::cargo_bin("clipcut").unwrap();
        cmd.current_dir(dir.path())
            .env_remove("CLIPCUT_CONFIG")
            .env_remove("CLIPCUT_FFMPEG")
            .env_remove("RUST_LOG");
        cmd
    }
}

use test_utils::*;

// CLI surface

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    clipcut(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cut"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("verify"));
}

#[test]
fn test_cut_missing_input() {
    let dir = TempDir::new().unwrap();
    clipcut(&dir)
        .args(["cut", "-i", "absent.webm", "-s", "0", "-e", "5", "--progress", "none"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.webm"));
}

#[test]
fn test_cut_bad_time() {
    let dir = TempDir::new().unwrap();
    clipcut(&dir)
        .args(["cut", "-i", "rec.webm", "-s", "soon", "-e", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid start time"));
}

#[test]
fn test_crf_out_of_range() {
    let dir = TempDir::new().unwrap();
    clipcut(&dir)
        .args(["cut", "-i", "rec.webm", "-s", "0", "-e", "5", "--crf", "60"])
        .assert()
        .failure();
}

#[test]
fn test_missing_runtime_reports_prepare_failure() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("rec.webm"), b"recording").unwrap();

    clipcut(&dir)
        .env("CLIPCUT_FFMPEG", "/nonexistent/clipcut-ffmpeg")
        .args(["cut", "-i", "rec.webm", "-s", "0", "-e", "5", "--progress", "none"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("couldn't prepare the clipping tool"));

    assert!(!dir.path().join("rec_clip_00s000ms_05s000ms.mp4").exists());
}

#[test]
fn test_invalid_config_file_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("clipcut.toml"), "[transcode]\ncrf = 77\n").unwrap();

    clipcut(&dir)
        .args(["inspect", "-i", "clip.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CRF"));
}

// Application wiring with the in-memory runtime

fn memory_container() -> DefaultAppContainer {
    DefaultAppContainer::with_ports(
        &ClipcutConfig::default(),
        Arc::new(InMemoryLoader::new()),
        Arc::new(FFprobeAdapter::new("ffprobe")),
    )
    .unwrap()
}

#[tokio::test]
async fn test_container_cuts_with_default_name() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("session.webm");
    std::fs::write(&input, simulated_source(300.0)).unwrap();

    let container = memory_container();
    let report = container
        .clip_interactor()
        .execute(ClipJob::new(
            &input,
            TimeSpec::parse("1:30").unwrap(),
            TimeSpec::parse("1:45.5").unwrap(),
        ))
        .await
        .unwrap();

    assert_eq!(
        report.output,
        dir.path().join("session_clip_01m30s000ms_01m45s500ms.mp4")
    );
    let clip = std::fs::read(&report.output).unwrap();
    assert_eq!(simulated_clip_duration(&clip), Some(15.5));
    assert!(container.engine().is_loaded());
}

#[tokio::test]
async fn test_container_invalid_range_after_load() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("session.webm");
    std::fs::write(&input, simulated_source(60.0)).unwrap();

    let err = memory_container()
        .clip_interactor()
        .execute(ClipJob::new(&input, TimeSpec::from_seconds(10.0), TimeSpec::from_seconds(10.0)))
        .await
        .unwrap_err();

    assert!(matches!(err, ClipFailure::Cut(ClipError::InvalidRange { .. })));
    assert!(err.to_string().starts_with("couldn't cut this clip"));
}

#[tokio::test]
async fn test_container_timeout() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("session.webm");
    std::fs::write(&input, simulated_source(60.0)).unwrap();

    let loader = Arc::new(InMemoryLoader::new().with_exec_delay(std::time::Duration::from_secs(2)));
    let container = DefaultAppContainer::with_ports(
        &ClipcutConfig::default(),
        Arc::clone(&loader) as Arc<dyn clipcut::ports::RuntimeLoader>,
        Arc::new(FFprobeAdapter::new("ffprobe")),
    )
    .unwrap();

    let err = container
        .clip_interactor()
        .execute(
            ClipJob::new(&input, TimeSpec::from_seconds(1.0), TimeSpec::from_seconds(2.0))
                .with_timeout(std::time::Duration::from_millis(20)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClipFailure::Cut(ClipError::Timeout { seconds }) if seconds == 0.02));
    assert!(err.to_string().contains("timed out after 0.02s"), "{}", err);
}

// End-to-end with a real FFmpeg

#[test]
fn test_cut_inspect_verify_with_ffmpeg() {
    if !ffmpeg_available() {
        eprintln!("skipping: ffmpeg with libx264 not available");
        return;
    }

    let dir = TempDir::new().unwrap();
    let source = dir.path().join("recording.mp4");
    create_test_video(&source, 8.0);

    clipcut(&dir)
        .env("CLIPCUT_INPUT_EXTENSION", "mp4")
        .args([
            "cut", "-i", "recording.mp4", "-s", "2.5", "-e", "6", "-o", "clip.mp4", "--progress", "none",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("clip.mp4"));

    let clip = dir.path().join("clip.mp4");
    assert!(std::fs::metadata(&clip).unwrap().len() > 0);

    let output = clipcut(&dir)
        .args(["inspect", "-i", "clip.mp4", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["video_codec"], "h264");
    assert_eq!(summary["audio_codec"], "aac");

    clipcut(&dir)
        .args(["verify", "-i", "clip.mp4", "-s", "2.5", "-e", "6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"));

    clipcut(&dir)
        .args(["verify", "-i", "clip.mp4", "-s", "0", "-e", "6", "--tolerance", "0.2"])
        .assert()
        .failure();
}
