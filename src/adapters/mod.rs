// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod memory_runtime;
pub mod probe_ffprobe;
#[cfg(feature = "libav")]
pub mod probe_libav;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::{FfmpegLoader, FfmpegRuntime};
pub use memory_runtime::{InMemoryLoader, InMemoryRuntime, RuntimeFaults};
pub use probe_ffprobe::FFprobeAdapter;
#[cfg(feature = "libav")]
pub use probe_libav::ProbeLibavAdapter;
pub use toml_config::ClipcutConfig;
pub use tracing_log::LogLevel;
