use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub segmentation: SegmentationConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncoderConfig {
    /// Encoder executable: a path, or a name looked up on PATH
    #[serde(default = "default_program")]
    pub program: PathBuf,

    /// Hard limit for a single encoder process; it is killed afterwards
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,

    /// Jobs running at once within a stage (0 = available parallelism)
    #[serde(default)]
    pub max_concurrent_jobs: usize,
}

fn default_program() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_job_timeout() -> u64 {
    6 * 60 * 60
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            job_timeout_secs: default_job_timeout(),
            max_concurrent_jobs: 0,
        }
    }
}

impl EncoderConfig {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Resolve `max_concurrent_jobs`, mapping 0 to the host's parallelism.
    pub fn concurrency(&self) -> usize {
        if self.max_concurrent_jobs > 0 {
            self.max_concurrent_jobs
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationConfig {
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: u32,
}

fn default_segment_seconds() -> u32 {
    10
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            segment_seconds: default_segment_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Two-pass logs and downloaded sources
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Directory receiving the per-run `transcode_<timestamp>.log`
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            log_dir: default_log_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl FetchConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
