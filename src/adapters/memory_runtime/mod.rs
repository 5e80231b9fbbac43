// In-memory runtime adapter - Virtual filesystem in a map, transcoding simulated by a closure
//
// Hosts that embed their own transcoder plug it in as the `Transcoder`; the
// default one fabricates a tagged MP4-like payload whose duration can be
// read back, which is what the engine tests rely on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::model::{is_valid_virtual_name, RuntimeAssets};
use crate::engine::progress::ProgressReporter;
use crate::error::{RuntimeError, RuntimeResult};
use crate::ports::{ExecJob, LogSink, MediaRuntime, RuntimeLoader};

const SOURCE_MARKER: &str = "SIMSRC duration=";
const CLIP_MARKER: &str = "SIMMP4 duration=";

/// A failed simulated transcode, optionally leaving a partial output behind
#[derive(Debug, Clone)]
pub struct SimulatedFailure {
    pub message: String,
    pub partial_output: Option<Bytes>,
}

impl SimulatedFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            partial_output: None,
        }
    }

    pub fn with_partial_output(mut self, data: impl Into<Bytes>) -> Self {
        self.partial_output = Some(data.into());
        self
    }
}

/// Produces output bytes for a job from the staged input bytes
pub type Transcoder =
    Arc<dyn Fn(&ExecJob, &Bytes) -> Result<Bytes, SimulatedFailure> + Send + Sync>;

/// Source payload understood by the default transcoder
pub fn simulated_source(duration: f64) -> Bytes {
    Bytes::from(format!("{}{}", SOURCE_MARKER, duration))
}

/// Duration tagged into a default-transcoder output
pub fn simulated_clip_duration(data: &[u8]) -> Option<f64> {
    std::str::from_utf8(data)
        .ok()?
        .strip_prefix(CLIP_MARKER)?
        .parse()
        .ok()
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let index = args.iter().position(|a| a == flag)?;
    args.get(index + 1).cloned()
}

/// Seeks into the source and emits a clip tagged with its duration.
///
/// Sources carrying a duration tag reject seeks past their end and shorten
/// clips that run over it; other sources are treated as unbounded.
pub fn default_transcoder() -> Transcoder {
    Arc::new(|job: &ExecJob, input: &Bytes| -> Result<Bytes, SimulatedFailure> {
        let start: f64 = flag_value(&job.args, "-ss")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| SimulatedFailure::new("missing seek position"))?;
        let length: f64 = flag_value(&job.args, "-t")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| SimulatedFailure::new("missing duration"))?;

        let source_duration = std::str::from_utf8(input)
            .ok()
            .and_then(|s| s.strip_prefix(SOURCE_MARKER))
            .and_then(|v| v.parse::<f64>().ok());

        let produced = match source_duration {
            Some(total) if start >= total => {
                return Err(SimulatedFailure::new(format!(
                    "seek position {} is past the end of the input ({})",
                    start, total
                )))
            }
            Some(total) => (start + length).min(total) - start,
            None => length,
        };

        Ok(Bytes::from(format!("{}{}", CLIP_MARKER, produced)))
    })
}

/// Transcoder that always fails with `message`
pub fn failing_transcoder(message: impl Into<String>) -> Transcoder {
    let message = message.into();
    Arc::new(
        move |_job: &ExecJob, _input: &Bytes| -> Result<Bytes, SimulatedFailure> {
            Err(SimulatedFailure::new(message.clone()))
        },
    )
}

/// Runtime keeping its virtual filesystem in memory
pub struct InMemoryRuntime {
    files: Mutex<HashMap<String, Bytes>>,
    transcoder: Transcoder,
    log_sink: LogSink,
    exec_delay: Duration,
    faults: RuntimeFaults,
    exec_count: AtomicUsize,
    terminated: AtomicBool,
}

/// Failures injected into the filesystem side of a runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeFaults {
    /// Every `write_file` fails
    pub fail_writes: bool,
    /// Successful transcodes leave no output file behind
    pub drop_output: bool,
}

impl InMemoryRuntime {
    pub fn new(transcoder: Transcoder, log_sink: LogSink) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            transcoder,
            log_sink,
            exec_delay: Duration::ZERO,
            faults: RuntimeFaults::default(),
            exec_count: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
        }
    }

    /// Make every transcode take at least `delay`
    pub fn with_exec_delay(mut self, delay: Duration) -> Self {
        self.exec_delay = delay;
        self
    }

    pub fn with_faults(mut self, faults: RuntimeFaults) -> Self {
        self.faults = faults;
        self
    }

    /// Number of transcode commands run so far
    pub fn exec_count(&self) -> usize {
        self.exec_count.load(Ordering::SeqCst)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Names currently present, without going through the async port
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files().keys().cloned().collect();
        names.sort();
        names
    }

    fn files(&self) -> MutexGuard<'_, HashMap<String, Bytes>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_alive(&self) -> RuntimeResult<()> {
        if self.is_terminated() {
            Err(RuntimeError::Terminated)
        } else {
            Ok(())
        }
    }

    fn checked_name(name: &str) -> RuntimeResult<&str> {
        if is_valid_virtual_name(name) {
            Ok(name)
        } else {
            Err(RuntimeError::InvalidFileName(name.to_string()))
        }
    }
}

#[async_trait]
impl MediaRuntime for InMemoryRuntime {
    async fn write_file(&self, name: &str, data: Bytes) -> RuntimeResult<()> {
        self.ensure_alive()?;
        let name = Self::checked_name(name)?;
        if self.faults.fail_writes {
            return Err(RuntimeError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("no space left for {}", name),
            )));
        }
        self.files().insert(name.to_string(), data);
        Ok(())
    }

    async fn read_file(&self, name: &str) -> RuntimeResult<Bytes> {
        self.ensure_alive()?;
        let name = Self::checked_name(name)?;
        self.files()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::FileNotFound(name.to_string()))
    }

    async fn delete_file(&self, name: &str) -> RuntimeResult<()> {
        self.ensure_alive()?;
        let name = Self::checked_name(name)?;
        self.files()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::FileNotFound(name.to_string()))
    }

    async fn list_files(&self) -> RuntimeResult<Vec<String>> {
        self.ensure_alive()?;
        Ok(self.file_names())
    }

    async fn exec(&self, job: &ExecJob, progress: &ProgressReporter) -> RuntimeResult<()> {
        self.ensure_alive()?;
        self.exec_count.fetch_add(1, Ordering::SeqCst);
        (self.log_sink)(&format!("exec {}", job.args.join(" ")));

        let input_name = flag_value(&job.args, "-i").ok_or_else(|| RuntimeError::ExecFailed {
            code: Some(1),
            stderr: "no input file given".to_string(),
        })?;
        let output_name = job
            .args
            .last()
            .cloned()
            .ok_or_else(|| RuntimeError::ExecFailed {
                code: Some(1),
                stderr: "no output file given".to_string(),
            })?;
        Self::checked_name(&output_name)?;

        let input = self.read_file(&input_name).await?;
        progress.report(0.25);
        if self.exec_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.exec_delay).await;
        }

        match (self.transcoder)(job, &input) {
            Ok(output) => {
                progress.report(0.75);
                if !self.faults.drop_output {
                    self.files().insert(output_name, output);
                }
                progress.complete();
                Ok(())
            }
            Err(failure) => {
                (self.log_sink)(&failure.message);
                if let Some(partial) = failure.partial_output {
                    self.files().insert(output_name, partial);
                }
                Err(RuntimeError::ExecFailed {
                    code: Some(1),
                    stderr: failure.message,
                })
            }
        }
    }

    async fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.files().clear();
    }
}

/// Loader producing in-memory runtimes, with knobs for slow and failing loads
pub struct InMemoryLoader {
    transcoder: Transcoder,
    load_delay: Duration,
    exec_delay: Duration,
    faults: RuntimeFaults,
    failures_remaining: AtomicUsize,
    load_count: AtomicUsize,
    active_loads: AtomicUsize,
    peak_active_loads: AtomicUsize,
    runtimes: Mutex<Vec<Arc<InMemoryRuntime>>>,
}

impl Default for InMemoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self {
            transcoder: default_transcoder(),
            load_delay: Duration::ZERO,
            exec_delay: Duration::ZERO,
            faults: RuntimeFaults::default(),
            failures_remaining: AtomicUsize::new(0),
            load_count: AtomicUsize::new(0),
            active_loads: AtomicUsize::new(0),
            peak_active_loads: AtomicUsize::new(0),
            runtimes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_transcoder(mut self, transcoder: Transcoder) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Make every load take at least `delay`
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Make every transcode on loaded runtimes take at least `delay`
    pub fn with_exec_delay(mut self, delay: Duration) -> Self {
        self.exec_delay = delay;
        self
    }

    /// Inject filesystem faults into every runtime handed out
    pub fn with_faults(mut self, faults: RuntimeFaults) -> Self {
        self.faults = faults;
        self
    }

    /// Fail the next `count` loads
    pub fn failing_loads(self, count: usize) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    /// Number of initializations attempted
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Every runtime handed out so far, oldest first
    pub fn runtimes(&self) -> Vec<Arc<InMemoryRuntime>> {
        self.runtimes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most initializations that were ever running at the same time
    pub fn peak_concurrent_loads(&self) -> usize {
        self.peak_active_loads.load(Ordering::SeqCst)
    }

    pub fn latest_runtime(&self) -> Option<Arc<InMemoryRuntime>> {
        self.runtimes().last().cloned()
    }
}

#[async_trait]
impl RuntimeLoader for InMemoryLoader {
    async fn load(
        &self,
        _assets: &RuntimeAssets,
        log_sink: LogSink,
        progress: &ProgressReporter,
    ) -> RuntimeResult<Arc<dyn MediaRuntime>> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        let _active = ActiveLoad::enter(&self.active_loads, &self.peak_active_loads);
        progress.report(0.1);

        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }

        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(RuntimeError::Unsupported(
                "simulated runtime initialization failure".to_string(),
            ));
        }

        let runtime = Arc::new(
            InMemoryRuntime::new(Arc::clone(&self.transcoder), log_sink)
                .with_exec_delay(self.exec_delay)
                .with_faults(self.faults),
        );
        self.runtimes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&runtime));
        progress.report(0.9);

        Ok(runtime as Arc<dyn MediaRuntime>)
    }
}

/// Counts a running initialization until dropped
struct ActiveLoad<'a> {
    active: &'a AtomicUsize,
}

impl<'a> ActiveLoad<'a> {
    fn enter(active: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for ActiveLoad<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_sink() -> LogSink {
        Arc::new(|_line: &str| {})
    }

    fn job(start: &str, length: &str) -> ExecJob {
        ExecJob {
            args: vec![
                "-i".to_string(),
                "in.webm".to_string(),
                "-ss".to_string(),
                start.to_string(),
                "-t".to_string(),
                length.to_string(),
                "out.mp4".to_string(),
            ],
            expected_duration: length.parse().ok(),
        }
    }

    #[tokio::test]
    async fn test_exec_produces_tagged_output() {
        let runtime = InMemoryRuntime::new(default_transcoder(), quiet_sink());
        runtime
            .write_file("in.webm", simulated_source(120.0))
            .await
            .unwrap();
        runtime
            .exec(&job("30.5", "14.5"), &ProgressReporter::silent())
            .await
            .unwrap();

        let output = runtime.read_file("out.mp4").await.unwrap();
        assert_eq!(simulated_clip_duration(&output), Some(14.5));
        assert_eq!(runtime.exec_count(), 1);
    }

    #[tokio::test]
    async fn test_exec_rejects_seek_past_end() {
        let runtime = InMemoryRuntime::new(default_transcoder(), quiet_sink());
        runtime
            .write_file("in.webm", simulated_source(10.0))
            .await
            .unwrap();
        let err = runtime
            .exec(&job("12", "3"), &ProgressReporter::silent())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("past the end"));
        assert!(runtime.read_file("out.mp4").await.is_err());
    }

    #[tokio::test]
    async fn test_partial_output_left_on_failure() {
        let transcoder: Transcoder = Arc::new(|_: &ExecJob, _: &Bytes| -> Result<Bytes, SimulatedFailure> {
            Err(SimulatedFailure::new("encoder crashed").with_partial_output(vec![1u8, 2]))
        });
        let runtime = InMemoryRuntime::new(transcoder, quiet_sink());
        runtime.write_file("in.webm", Bytes::from_static(b"x")).await.unwrap();
        assert!(runtime
            .exec(&job("0", "1"), &ProgressReporter::silent())
            .await
            .is_err());
        assert_eq!(runtime.file_names(), vec!["in.webm", "out.mp4"]);
    }

    #[tokio::test]
    async fn test_invalid_names_rejected() {
        let runtime = InMemoryRuntime::new(default_transcoder(), quiet_sink());
        let err = runtime
            .write_file("../escape", Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidFileName(_)));
    }

    #[tokio::test]
    async fn test_terminated_runtime_refuses_work() {
        let runtime = InMemoryRuntime::new(default_transcoder(), quiet_sink());
        runtime.write_file("in.webm", Bytes::new()).await.unwrap();
        runtime.terminate().await;
        assert!(runtime.file_names().is_empty());
        assert!(matches!(
            runtime.list_files().await,
            Err(RuntimeError::Terminated)
        ));
    }

    #[tokio::test]
    async fn test_faults() {
        let runtime = InMemoryRuntime::new(default_transcoder(), quiet_sink()).with_faults(RuntimeFaults {
            fail_writes: true,
            drop_output: false,
        });
        assert!(matches!(
            runtime.write_file("in.webm", simulated_source(5.0)).await,
            Err(RuntimeError::Io(_))
        ));
        assert!(runtime.file_names().is_empty());

        let runtime = InMemoryRuntime::new(default_transcoder(), quiet_sink()).with_faults(RuntimeFaults {
            fail_writes: false,
            drop_output: true,
        });
        runtime.write_file("in.webm", simulated_source(5.0)).await.unwrap();
        runtime
            .exec(&job("0", "1"), &ProgressReporter::silent())
            .await
            .unwrap();
        assert_eq!(runtime.file_names(), vec!["in.webm"]);
    }

    #[tokio::test]
    async fn test_loader_failure_budget() {
        let loader = InMemoryLoader::new().failing_loads(1);
        let assets = RuntimeAssets::default();
        let progress = ProgressReporter::silent();

        assert!(loader.load(&assets, quiet_sink(), &progress).await.is_err());
        assert!(loader.load(&assets, quiet_sink(), &progress).await.is_ok());
        assert_eq!(loader.load_count(), 2);
        assert_eq!(loader.peak_concurrent_loads(), 1);
        assert_eq!(loader.runtimes().len(), 1);
    }
}
