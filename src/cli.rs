use clap::Parser;
use passforge::config::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "passforge")]
#[command(
    author,
    version,
    about = "Two-pass multi-profile video transcoder with HLS packaging"
)]
pub struct Cli {
    /// Source video: a local path or an http(s) URL
    pub input: String,

    /// Destination root; outputs go to <DEST_ROOT>/<source name>/
    pub dest_root: PathBuf,

    /// Profile set file (JSON array, or TOML with [[profiles]])
    pub profiles: PathBuf,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Encoder executable (overrides config)
    #[arg(long)]
    pub encoder: Option<PathBuf>,

    /// Maximum concurrent jobs per stage (0 = one per CPU)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Per-job timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Directory for the run log file
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Scratch directory for two-pass logs and downloads
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Show what would be done without executing
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref encoder) = self.encoder {
            config.encoder.program = encoder.clone();
        }
        if let Some(jobs) = self.jobs {
            config.encoder.max_concurrent_jobs = jobs;
        }
        if let Some(timeout) = self.timeout {
            config.encoder.job_timeout_secs = timeout;
        }
        if let Some(ref dir) = self.log_dir {
            config.paths.log_dir = dir.clone();
        }
        if let Some(ref dir) = self.scratch_dir {
            config.paths.scratch_dir = dir.clone();
        }
    }
}
