use passforge_av::{Pass, ToolCommand};
use std::fmt;
use std::path::PathBuf;

/// Which stage a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Encode(Pass),
    Segment,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Encode(pass) => write!(f, "{pass}"),
            JobKind::Segment => write!(f, "segment"),
        }
    }
}

/// One executable unit: a resolved encoder command bound to a single
/// (profile, pass) pair or to one segmentation run.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    /// Profile postfix the job belongs to.
    pub label: String,
    pub kind: JobKind,
    pub command: ToolCommand,
    pub source: PathBuf,
    /// Expected output; the null sink for first-pass jobs.
    pub output: PathBuf,
}
