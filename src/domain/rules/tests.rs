// Unit tests for transcode rules

use super::*;

fn request(start: f64, end: f64) -> ClipRequest {
    ClipRequest::new(vec![0u8; 8], start, end).unwrap()
}

fn files() -> VirtualFileNames {
    VirtualFileNames {
        input: "input-abc.webm".to_string(),
        output: "output-abc.mp4".to_string(),
    }
}

fn summary(duration: f64) -> MediaSummary {
    MediaSummary {
        path: "clip.mp4".to_string(),
        format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        duration: TimeSpec::from_seconds(duration),
        file_size: 4096,
        video_codec: Some("h264".to_string()),
        width: Some(1280),
        height: Some(720),
        audio_codec: Some("aac".to_string()),
    }
}

fn value_after<'a>(args: &'a [String], flag: &str) -> &'a str {
    let index = args.iter().position(|a| a == flag).unwrap();
    &args[index + 1]
}

#[test]
fn test_format_seconds_keeps_fraction() {
    assert_eq!(format_seconds(30.5), "30.5");
    assert_eq!(format_seconds(14.5), "14.5");
    assert_eq!(format_seconds(10.0), "10");
    assert_eq!(format_seconds(0.001), "0.001");
    assert_eq!(format_seconds(-0.0), "0");
}

#[test]
fn test_command_never_seeks_to_negative_zero() {
    let args = TranscodeCommand::for_clip(&request(-0.0, 3.0), &files(), &TranscodeProfile::default())
        .build_args();
    assert_eq!(value_after(&args, "-ss"), "0");
    assert_eq!(value_after(&args, "-t"), "3");
}

#[test]
fn test_command_seeks_and_limits_duration() {
    let args = TranscodeCommand::for_clip(&request(30.5, 45.0), &files(), &TranscodeProfile::default())
        .build_args();

    assert_eq!(value_after(&args, "-i"), "input-abc.webm");
    assert_eq!(value_after(&args, "-ss"), "30.5");
    assert_eq!(value_after(&args, "-t"), "14.5");
    assert_eq!(args.last().unwrap(), "output-abc.mp4");
}

#[test]
fn test_command_encodes_h264_aac() {
    let args = TranscodeCommand::for_clip(&request(0.0, 5.0), &files(), &TranscodeProfile::default())
        .build_args();

    assert_eq!(value_after(&args, "-c:v"), "libx264");
    assert_eq!(value_after(&args, "-preset"), "ultrafast");
    assert_eq!(value_after(&args, "-crf"), "23");
    assert_eq!(value_after(&args, "-c:a"), "aac");
    assert_eq!(value_after(&args, "-b:a"), "128k");
    assert_eq!(value_after(&args, "-movflags"), "+faststart");
}

#[test]
fn test_command_threads_optional() {
    let base = TranscodeCommand::for_clip(&request(0.0, 5.0), &files(), &TranscodeProfile::default());
    assert!(!base.build_args().contains(&"-threads".to_string()));

    let args = base.with_threads(0).build_args();
    assert_eq!(value_after(&args, "-threads"), "1");
}

#[test]
fn test_validate_profile() {
    assert!(validate_profile(&TranscodeProfile::default()).is_ok());

    let mut profile = TranscodeProfile::default();
    profile.crf = 52;
    assert!(matches!(validate_profile(&profile), Err(DomainError::InvalidConfig(_))));

    let mut profile = TranscodeProfile::default();
    profile.preset = "  ".to_string();
    assert!(validate_profile(&profile).is_err());
}

#[test]
fn test_acceptance_within_tolerance() {
    let checks = ClipAcceptance::evaluate(&summary(14.55), 14.5, DEFAULT_DURATION_TOLERANCE);
    assert!(checks.iter().all(|c| c.passed), "{:?}", checks);
}

#[test]
fn test_acceptance_flags_duration_drift() {
    let checks = ClipAcceptance::evaluate(&summary(16.0), 14.5, DEFAULT_DURATION_TOLERANCE);
    let duration = checks.iter().find(|c| c.name == "duration").unwrap();
    assert!(!duration.passed);
}

#[test]
fn test_acceptance_silent_clip() {
    let mut silent = summary(5.0);
    silent.audio_codec = None;
    let checks = ClipAcceptance::evaluate(&silent, 5.0, DEFAULT_DURATION_TOLERANCE);
    assert!(checks.iter().all(|c| c.name != "audio_codec"));
    assert!(checks.iter().all(|c| c.passed));
}

#[test]
fn test_default_thread_count_bounds() {
    let threads = default_thread_count();
    assert!((1..=16).contains(&threads));
}
