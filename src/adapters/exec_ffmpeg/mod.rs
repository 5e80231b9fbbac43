//! FFmpeg execution adapter
//!
//! Runs the FFmpeg executable as the media runtime. Each loaded runtime owns a
//! private temporary directory that serves as its virtual filesystem; commands
//! run with that directory as working directory so virtual names resolve there.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::model::{is_valid_virtual_name, RuntimeAssets};
use crate::engine::progress::ProgressReporter;
use crate::error::{RuntimeError, RuntimeResult};
use crate::ports::{ExecJob, LogSink, MediaRuntime, RuntimeLoader};

/// Lines of stderr kept for error reports
const STDERR_TAIL_LINES: usize = 20;

/// Arguments every invocation carries ahead of the job's own
const PROCESS_ARGS: [&str; 7] = [
    "-hide_banner",
    "-nostdin",
    "-y",
    "-progress",
    "pipe:1",
    "-nostats",
    "-loglevel",
];
const PROCESS_LOG_LEVEL: &str = "error";

/// One parsed `-progress` record
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressSample {
    /// Output timestamp reached, in seconds
    OutTime(f64),
    /// Encoding finished
    End,
}

/// Parse a `key=value` line from FFmpeg's `-progress` output
pub fn parse_progress_line(line: &str) -> Option<ProgressSample> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // out_time_ms is also reported in microseconds
        "out_time_us" | "out_time_ms" => value
            .parse::<i64>()
            .ok()
            .filter(|us| *us >= 0)
            .map(|us| ProgressSample::OutTime(us as f64 / 1_000_000.0)),
        "progress" if value == "end" => Some(ProgressSample::End),
        _ => None,
    }
}

/// Extract the version from the first line of `ffmpeg -version`
pub fn parse_version_banner(banner: &str) -> Option<String> {
    let first_line = banner.lines().next()?;
    let mut words = first_line.split_whitespace();
    while let Some(word) = words.next() {
        if word == "version" {
            return words.next().map(|v| v.to_string());
        }
    }
    None
}

/// Loads FFmpeg runtimes from the configured binary
#[derive(Debug, Default, Clone)]
pub struct FfmpegLoader;

impl FfmpegLoader {
    pub fn new() -> Self {
        Self
    }

    async fn read_version(binary: &Path) -> RuntimeResult<String> {
        let output = Command::new(binary)
            .arg("-version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RuntimeError::NotFound(binary.display().to_string()),
                _ => RuntimeError::Io(e),
            })?;

        if !output.status.success() {
            return Err(RuntimeError::Unsupported(format!(
                "{} -version exited with {}",
                binary.display(),
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl RuntimeLoader for FfmpegLoader {
    async fn load(
        &self,
        assets: &RuntimeAssets,
        log_sink: LogSink,
        progress: &ProgressReporter,
    ) -> RuntimeResult<Arc<dyn MediaRuntime>> {
        progress.report(0.0);
        let banner = Self::read_version(&assets.runtime_binary).await?;
        if let Some(first_line) = banner.lines().next() {
            log_sink(first_line);
        }

        let version = parse_version_banner(&banner).ok_or_else(|| {
            RuntimeError::Unsupported(format!(
                "{} did not report a version",
                assets.runtime_binary.display()
            ))
        })?;

        if let Some(expected) = &assets.expected_version {
            if !version.starts_with(expected.as_str()) {
                return Err(RuntimeError::Unsupported(format!(
                    "runtime version {} does not match pinned version {}",
                    version, expected
                )));
            }
        }
        progress.report(0.6);

        let vfs = tempfile::Builder::new().prefix("clipcut-vfs-").tempdir()?;
        info!(
            version = %version,
            vfs = %vfs.path().display(),
            "FFmpeg runtime ready"
        );
        progress.report(0.9);

        Ok(Arc::new(FfmpegRuntime::new(
            assets.runtime_binary.clone(),
            vfs,
            log_sink,
        )) as Arc<dyn MediaRuntime>)
    }
}

/// FFmpeg process runtime backed by a private temporary directory
pub struct FfmpegRuntime {
    binary: PathBuf,
    vfs: Mutex<Option<TempDir>>,
    log_sink: LogSink,
}

impl FfmpegRuntime {
    pub fn new(binary: PathBuf, vfs: TempDir, log_sink: LogSink) -> Self {
        Self {
            binary,
            vfs: Mutex::new(Some(vfs)),
            log_sink,
        }
    }

    fn vfs(&self) -> MutexGuard<'_, Option<TempDir>> {
        self.vfs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn root(&self) -> RuntimeResult<PathBuf> {
        self.vfs()
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .ok_or(RuntimeError::Terminated)
    }

    fn resolve(&self, name: &str) -> RuntimeResult<PathBuf> {
        if !is_valid_virtual_name(name) {
            return Err(RuntimeError::InvalidFileName(name.to_string()));
        }
        Ok(self.root()?.join(name))
    }
}

fn not_found_as(name: &str, err: std::io::Error) -> RuntimeError {
    if err.kind() == ErrorKind::NotFound {
        RuntimeError::FileNotFound(name.to_string())
    } else {
        RuntimeError::Io(err)
    }
}

#[async_trait]
impl MediaRuntime for FfmpegRuntime {
    async fn write_file(&self, name: &str, data: Bytes) -> RuntimeResult<()> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, &data).await?;
        debug!(file = name, bytes = data.len(), "Staged virtual file");
        Ok(())
    }

    async fn read_file(&self, name: &str) -> RuntimeResult<Bytes> {
        let path = self.resolve(name)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_as(name, e))?;
        Ok(Bytes::from(data))
    }

    async fn delete_file(&self, name: &str) -> RuntimeResult<()> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_as(name, e))
    }

    async fn list_files(&self) -> RuntimeResult<Vec<String>> {
        let root = self.root()?;
        let mut names: Vec<String> = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn exec(&self, job: &ExecJob, progress: &ProgressReporter) -> RuntimeResult<()> {
        let root = self.root()?;
        debug!(args = %job.args.join(" "), "Running FFmpeg");

        let mut child = Command::new(&self.binary)
            .current_dir(&root)
            .args(PROCESS_ARGS)
            .arg(PROCESS_LOG_LEVEL)
            .args(&job.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RuntimeError::NotFound(self.binary.display().to_string()),
                _ => RuntimeError::Io(e),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::Unsupported("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RuntimeError::Unsupported("stderr not captured".to_string()))?;

        let expected = job.expected_duration;
        let progress_reader = drain_lines(stdout, |line| match parse_progress_line(&line) {
            Some(ProgressSample::OutTime(seconds)) => {
                if let Some(total) = expected {
                    progress.report_ratio(seconds, total);
                }
            }
            Some(ProgressSample::End) => progress.complete(),
            None => {}
        });

        let log_sink = Arc::clone(&self.log_sink);
        let stderr_reader = async move {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            drain_lines(stderr, |line| {
                log_sink(&line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            })
            .await;
            tail
        };

        let ((), tail, status) = tokio::join!(progress_reader, stderr_reader, child.wait());
        let status = status?;

        if status.success() {
            Ok(())
        } else {
            let stderr = tail.into_iter().collect::<Vec<_>>().join("\n");
            Err(RuntimeError::ExecFailed {
                code: status.code(),
                stderr: if stderr.is_empty() {
                    "FFmpeg exited without diagnostics".to_string()
                } else {
                    stderr
                },
            })
        }
    }

    async fn terminate(&self) {
        let vfs = self.vfs().take();
        if let Some(dir) = vfs {
            let path = dir.path().display().to_string();
            if let Err(e) = dir.close() {
                warn!(vfs = %path, error = %e, "Failed to remove runtime directory");
            } else {
                debug!(vfs = %path, "Runtime directory removed");
            }
        }
    }
}

/// Feed every line of `reader` to `on_line` until EOF.
///
/// Invalid UTF-8 is replaced rather than ending the read, so the child never
/// blocks on a full pipe.
async fn drain_lines<R, F>(reader: R, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(String),
{
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(mut segment)) => {
                if segment.last() == Some(&b'\r') {
                    segment.pop();
                }
                on_line(String::from_utf8_lossy(&segment).into_owned());
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "Stopped reading FFmpeg output");
                break;
            }
        }
    }
}
