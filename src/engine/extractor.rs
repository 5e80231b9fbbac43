//! Clip extraction engine: runtime load lifecycle and the cut protocol

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, error, info, warn};

use crate::domain::model::{ClipRequest, ClipResult, EngineState, RuntimeAssets, VirtualFileNames};
use crate::domain::rules::{default_thread_count, TranscodeCommand};
use crate::engine::progress::{ProgressHandle, ProgressReporter};
use crate::engine::EngineConfig;
use crate::error::{ClipError, EngineResult, RuntimeError};
use crate::ports::{ExecJob, LogSink, MediaRuntime, RuntimeLoader};

type LoadOutcome = Result<Arc<dyn MediaRuntime>, ClipError>;
type PendingLoad = Shared<BoxFuture<'static, LoadOutcome>>;
type PendingTeardown = Shared<BoxFuture<'static, ()>>;

enum Slot {
    Unloaded,
    Loading { generation: u64, pending: PendingLoad },
    Loaded(Arc<dyn MediaRuntime>),
    /// Teardown of a loaded or loading runtime still in progress
    Terminating { generation: u64, teardown: PendingTeardown },
    Terminated,
}

impl Slot {
    fn state(&self) -> EngineState {
        match self {
            Slot::Unloaded => EngineState::Unloaded,
            Slot::Loading { .. } => EngineState::Loading,
            Slot::Loaded(_) => EngineState::Loaded,
            Slot::Terminating { .. } | Slot::Terminated => EngineState::Terminated,
        }
    }
}

enum LoadStep {
    Ready,
    Join(u64, PendingLoad),
    AwaitTeardown(u64, PendingTeardown),
}

/// Owns one media runtime and performs isolated cut operations on it.
///
/// The runtime is loaded lazily and at most once at a time: concurrent
/// `load()` callers share a single in-flight initialization. Each cut stages
/// its files under fresh names, so cuts on one engine may run concurrently.
pub struct ClipExtractionEngine {
    loader: Arc<dyn RuntimeLoader>,
    config: EngineConfig,
    slot: Mutex<Slot>,
    generation: AtomicU64,
}

impl ClipExtractionEngine {
    /// Create an unloaded engine
    pub fn new(loader: Arc<dyn RuntimeLoader>, config: EngineConfig) -> Self {
        Self {
            loader,
            config,
            slot: Mutex::new(Slot::Unloaded),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.slot().state()
    }

    /// Whether the runtime is ready for cuts
    pub fn is_loaded(&self) -> bool {
        self.state() == EngineState::Loaded
    }

    /// Load the media runtime.
    ///
    /// Returns immediately when already loaded and joins an in-flight load
    /// instead of starting another one. On failure the engine returns to
    /// `Unloaded` and the call may be retried.
    pub async fn load(&self, on_progress: Option<ProgressHandle>) -> EngineResult<()> {
        let progress = ProgressReporter::new(on_progress);

        // A teardown in progress must finish before a fresh initialization
        // starts, so at most one runtime is ever being loaded.
        let (generation, pending) = loop {
            let step = {
                let mut slot = self.slot();
                let existing = match &*slot {
                    Slot::Loaded(_) => Some(LoadStep::Ready),
                    Slot::Loading {
                        generation,
                        pending,
                    } => Some(LoadStep::Join(*generation, pending.clone())),
                    Slot::Terminating {
                        generation,
                        teardown,
                    } => Some(LoadStep::AwaitTeardown(*generation, teardown.clone())),
                    Slot::Unloaded | Slot::Terminated => None,
                };

                match existing {
                    Some(step) => step,
                    None => {
                        let generation = self.next_generation();
                        let pending = Self::initialize(
                            Arc::clone(&self.loader),
                            self.config.assets.clone(),
                            progress.clone(),
                        )
                        .boxed()
                        .shared();
                        *slot = Slot::Loading {
                            generation,
                            pending: pending.clone(),
                        };
                        LoadStep::Join(generation, pending)
                    }
                }
            };

            match step {
                LoadStep::Ready => {
                    debug!("Clipping engine already loaded");
                    progress.complete();
                    return Ok(());
                }
                LoadStep::Join(generation, pending) => break (generation, pending),
                LoadStep::AwaitTeardown(generation, teardown) => {
                    debug!("Waiting for the previous runtime to shut down");
                    teardown.await;
                    self.finish_teardown(generation);
                }
            }
        };

        let outcome = pending.await;

        let mut slot = self.slot();
        let still_current = matches!(
            &*slot,
            Slot::Loading { generation: current, .. } if *current == generation
        );

        match outcome {
            Ok(runtime) => {
                if still_current {
                    *slot = Slot::Loaded(runtime);
                    info!(generation, "Clipping engine loaded");
                } else if !matches!(&*slot, Slot::Loaded(_)) {
                    warn!(generation, "Clipping engine was terminated while loading");
                    return Err(ClipError::EngineLoad {
                        message: "engine was terminated while loading".to_string(),
                    });
                }
                drop(slot);
                progress.complete();
                Ok(())
            }
            Err(err) => {
                if still_current {
                    *slot = Slot::Unloaded;
                }
                Err(err)
            }
        }
    }

    async fn initialize(
        loader: Arc<dyn RuntimeLoader>,
        assets: RuntimeAssets,
        progress: ProgressReporter,
    ) -> LoadOutcome {
        let started = Instant::now();
        info!(runtime = %assets.runtime_binary.display(), "Loading media runtime");

        match loader.load(&assets, runtime_log_sink(), &progress).await {
            Ok(runtime) => {
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Media runtime initialized"
                );
                Ok(runtime)
            }
            Err(err) => {
                error!(error = %err, "Media runtime failed to initialize");
                Err(ClipError::EngineLoad {
                    message: err.to_string(),
                })
            }
        }
    }

    /// Cut `[start, end)` seconds out of `source` and re-encode it as MP4.
    ///
    /// Fails with `NotLoaded` before a successful `load()` and with
    /// `InvalidRange` for degenerate ranges; neither touches the runtime.
    pub async fn cut_video(
        &self,
        source: impl Into<Bytes>,
        start: f64,
        end: f64,
        on_progress: Option<ProgressHandle>,
    ) -> EngineResult<ClipResult> {
        let runtime = self.loaded_runtime()?;
        let request = ClipRequest::new(source, start, end)?;
        self.run_cut(runtime, request, on_progress).await
    }

    /// Same as [`cut_video`](Self::cut_video) for an already validated request
    pub async fn cut(
        &self,
        request: ClipRequest,
        on_progress: Option<ProgressHandle>,
    ) -> EngineResult<ClipResult> {
        let runtime = self.loaded_runtime()?;
        self.run_cut(runtime, request, on_progress).await
    }

    async fn run_cut(
        &self,
        runtime: Arc<dyn MediaRuntime>,
        request: ClipRequest,
        on_progress: Option<ProgressHandle>,
    ) -> EngineResult<ClipResult> {
        let files = VirtualFileNames::unique(&self.config.input_extension);
        let threads = self.config.assets.threads.unwrap_or_else(default_thread_count);
        let command = TranscodeCommand::for_clip(&request, &files, &self.config.profile)
            .with_threads(threads);
        let job = ExecJob {
            args: command.build_args(),
            expected_duration: Some(request.duration()),
        };

        info!(
            start = request.start(),
            end = request.end(),
            source_bytes = request.source().len(),
            input = %files.input,
            "Cutting clip"
        );

        let progress = ProgressReporter::new(on_progress);
        let started = Instant::now();

        // Staged work runs on its own task: dropping this future never
        // abandons virtual files mid-operation.
        let task = tokio::spawn(staged_cut(
            runtime,
            files,
            request.source().clone(),
            job,
            progress.clone(),
        ));

        let result = match task.await {
            Ok(result) => result,
            Err(join_err) => Err(ClipError::ClipCut {
                message: format!("clip task did not complete: {}", join_err),
            }),
        };

        match &result {
            Ok(clip) => {
                progress.complete();
                info!(
                    output_bytes = clip.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Clip cut completed"
                );
            }
            Err(err) => warn!(error = %err, "Clip cut failed"),
        }

        result
    }

    /// Tear the runtime down.
    ///
    /// Waits for an in-flight load before releasing what it produced. A no-op
    /// when nothing was loaded. The engine reports `Terminated` at once, but a
    /// later `load()` only starts once the teardown has finished.
    pub async fn terminate(&self) {
        let step = {
            let mut slot = self.slot();
            let released = match std::mem::replace(&mut *slot, Slot::Terminated) {
                Slot::Unloaded => {
                    *slot = Slot::Unloaded;
                    None
                }
                Slot::Terminated => Some(TeardownStep::Done),
                Slot::Terminating {
                    generation,
                    teardown,
                } => {
                    *slot = Slot::Terminating {
                        generation,
                        teardown: teardown.clone(),
                    };
                    Some(TeardownStep::Join(generation, teardown))
                }
                Slot::Loaded(runtime) => Some(TeardownStep::Start(Released::Runtime(runtime))),
                Slot::Loading { pending, .. } => Some(TeardownStep::Start(Released::Pending(pending))),
            };

            match released {
                Some(TeardownStep::Start(released)) => {
                    let generation = self.next_generation();
                    let teardown = release_runtime(released).boxed().shared();
                    *slot = Slot::Terminating {
                        generation,
                        teardown: teardown.clone(),
                    };
                    Some((generation, teardown))
                }
                Some(TeardownStep::Join(generation, teardown)) => Some((generation, teardown)),
                Some(TeardownStep::Done) => return,
                None => None,
            }
        };

        let (generation, teardown) = match step {
            Some(step) => step,
            None => {
                debug!("Terminate requested with nothing loaded");
                return;
            }
        };

        teardown.await;
        self.finish_teardown(generation);
    }

    /// Settle a finished teardown unless the slot has moved on since
    fn finish_teardown(&self, generation: u64) {
        let mut slot = self.slot();
        if matches!(&*slot, Slot::Terminating { generation: current, .. } if *current == generation) {
            *slot = Slot::Terminated;
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn loaded_runtime(&self) -> EngineResult<Arc<dyn MediaRuntime>> {
        match &*self.slot() {
            Slot::Loaded(runtime) => Ok(Arc::clone(runtime)),
            other => {
                warn!(state = %other.state(), "Cut requested before the engine was loaded");
                Err(ClipError::NotLoaded)
            }
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Released {
    Runtime(Arc<dyn MediaRuntime>),
    Pending(PendingLoad),
}

enum TeardownStep {
    Start(Released),
    Join(u64, PendingTeardown),
    Done,
}

async fn release_runtime(released: Released) {
    let runtime = match released {
        Released::Runtime(runtime) => runtime,
        Released::Pending(pending) => match pending.await {
            Ok(runtime) => runtime,
            Err(_) => {
                info!("Clipping engine terminated after a failed load");
                return;
            }
        },
    };

    runtime.terminate().await;
    info!("Clipping engine terminated");
}

/// Which virtual files a cut may have left behind
#[derive(Default)]
struct Staged {
    input: bool,
    output: bool,
}

async fn staged_cut(
    runtime: Arc<dyn MediaRuntime>,
    files: VirtualFileNames,
    source: Bytes,
    job: ExecJob,
    progress: ProgressReporter,
) -> EngineResult<ClipResult> {
    let mut staged = Staged::default();
    let result = transcode(runtime.as_ref(), &files, source, &job, &progress, &mut staged).await;

    if staged.input {
        release(runtime.as_ref(), &files.input).await;
    }
    if staged.output {
        release(runtime.as_ref(), &files.output).await;
    }

    result
}

async fn transcode(
    runtime: &dyn MediaRuntime,
    files: &VirtualFileNames,
    source: Bytes,
    job: &ExecJob,
    progress: &ProgressReporter,
    staged: &mut Staged,
) -> EngineResult<ClipResult> {
    staged.input = true;
    runtime
        .write_file(&files.input, source)
        .await
        .map_err(|e| cut_failure("write input", &files.input, e))?;

    staged.output = true;
    runtime
        .exec(job, progress)
        .await
        .map_err(|e| cut_failure("transcode", &files.input, e))?;

    let data = runtime
        .read_file(&files.output)
        .await
        .map_err(|e| cut_failure("read output", &files.output, e))?;

    if data.is_empty() {
        error!(file = %files.output, "Transcode produced an empty output");
        return Err(ClipError::ClipCut {
            message: "transcode produced an empty output".to_string(),
        });
    }

    Ok(ClipResult::new(data))
}

async fn release(runtime: &dyn MediaRuntime, name: &str) {
    match runtime.delete_file(name).await {
        Ok(()) => debug!(file = name, "Removed virtual file"),
        Err(RuntimeError::FileNotFound(_)) => {}
        Err(RuntimeError::Terminated) => debug!(file = name, "Runtime gone before cleanup"),
        Err(err) => warn!(file = name, error = %err, "Failed to remove virtual file"),
    }
}

fn cut_failure(operation: &str, file: &str, err: RuntimeError) -> ClipError {
    error!(operation, file, error = %err, "Clip cut step failed");
    ClipError::ClipCut {
        message: err.to_string(),
    }
}

/// Forwards runtime output lines into tracing
fn runtime_log_sink() -> LogSink {
    Arc::new(|line: &str| debug!(target: "clipcut::runtime", "{}", line))
}
