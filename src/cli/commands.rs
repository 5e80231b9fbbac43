//! Command implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info};

use crate::app::{AppContainer, ClipJob, ClipReport, VerifyReport, VerifyRequest};
use crate::cli::args::{CutArgs, InspectArgs, OutputFormat, ProgressMode, VerifyArgs};
use crate::domain::errors::DomainError;
use crate::domain::model::{MediaSummary, TimeSpec};
use crate::engine::progress::{ConsoleProgressCallback, JsonProgressCallback};
use crate::engine::ProgressHandle;

fn parse_time(label: &str, value: &str) -> Result<TimeSpec> {
    TimeSpec::parse(value).with_context(|| format!("Invalid {} time '{}'", label, value))
}

fn progress_handle(mode: ProgressMode) -> Option<ProgressHandle> {
    match mode {
        ProgressMode::Console => Some(Arc::new(ConsoleProgressCallback::new("cut")) as ProgressHandle),
        ProgressMode::Json => Some(Arc::new(JsonProgressCallback::new("cut")) as ProgressHandle),
        ProgressMode::None => None,
    }
}

/// Execute the cut command
pub async fn cut(container: &dyn AppContainer, args: CutArgs) -> Result<()> {
    let start = parse_time("start", &args.start)?;
    let end = parse_time("end", &args.end)?;
    info!(input = %args.input.display(), start = %start, end = %end, "Starting cut");

    let mut job = ClipJob::new(args.input, start, end);
    if let Some(output) = args.output {
        job = job.with_output(output);
    }
    if let Some(seconds) = args.timeout {
        job = job.with_timeout(Duration::from_secs(seconds));
    }
    if let Some(progress) = progress_handle(args.progress) {
        job = job.with_progress(progress);
    }

    let result = container.clip_interactor().execute(job).await;
    container.engine().terminate().await;

    let report = result?;
    if args.progress == ProgressMode::Json {
        println!("{}", serde_json::to_string(&report).context("Failed to serialize clip report")?);
    } else {
        display_clip_report(&report);
    }
    Ok(())
}

/// Execute the inspect command
pub async fn inspect(container: &dyn AppContainer, args: InspectArgs) -> Result<()> {
    let summary = container
        .inspect_interactor()
        .execute(&args.input)
        .await
        .context("Failed to inspect input file")?;

    if !print_structured(&summary, args.format)? {
        display_media_summary(&summary);
    }
    Ok(())
}

/// Execute the verify command
pub async fn verify(container: &dyn AppContainer, args: VerifyArgs) -> Result<()> {
    let start = parse_time("start", &args.start)?;
    let end = parse_time("end", &args.end)?;
    let request = VerifyRequest::new(args.input, start, end).with_tolerance(args.tolerance);

    let report = container
        .verify_interactor()
        .execute(request)
        .await
        .context("Failed to verify clip")?;

    if !print_structured(&report, args.format)? {
        display_verify_report(&report);
    }

    if report.passed {
        Ok(())
    } else {
        let failed = report.checks.iter().filter(|c| !c.passed).count();
        error!(clip = %report.clip_path, failed, "Verification failed");
        Err(DomainError::VerificationFailed(format!(
            "{} of {} checks failed for {}",
            failed,
            report.checks.len(),
            report.clip_path
        ))
        .into())
    }
}

/// Print `value` as JSON or YAML; returns false for text output
fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?,
        OutputFormat::Yaml => serde_yaml::to_string(value).context("Failed to serialize to YAML")?,
        OutputFormat::Text => return Ok(false),
    };
    println!("{}", rendered.trim_end());
    Ok(true)
}

fn display_clip_report(report: &ClipReport) {
    println!("Clip written: {}", report.output.display());
    println!("  Range: {} - {}", report.start, report.end);
    println!("  Size: {} bytes ({})", report.output_bytes, report.mime_type);
    println!("  Took: {} ms", report.elapsed_ms);
}

/// Display media information in human-readable format
fn display_media_summary(summary: &MediaSummary) {
    println!("Media Information");
    println!("=================");
    println!("File: {}", summary.path);
    println!("Format: {}", summary.format);
    println!("Duration: {} ({:.3}s)", summary.duration, summary.duration.seconds);
    println!("File Size: {} bytes", summary.file_size);

    match (&summary.video_codec, summary.width, summary.height) {
        (Some(codec), Some(w), Some(h)) => println!("Video: {} {}x{}", codec, w, h),
        (Some(codec), _, _) => println!("Video: {}", codec),
        _ => println!("Video: none"),
    }
    println!("Audio: {}", summary.audio_codec.as_deref().unwrap_or("none"));
}

/// Display verification result in human-readable format
fn display_verify_report(report: &VerifyReport) {
    println!("Verification Results");
    println!("====================");
    println!("Clip: {}", report.clip_path);
    println!("Expected duration: {:.3}s", report.expected_duration);
    println!("Result: {}", if report.passed { "PASS" } else { "FAIL" });
    println!();
    println!("Checks:");
    for check in &report.checks {
        let status = if check.passed { "ok  " } else { "FAIL" };
        println!("  [{}] {}: {}", status, check.name, check.details);
    }
}
