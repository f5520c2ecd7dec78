//! Per-job outcomes and the per-stage and per-run reports built from them.

use super::job::JobKind;
use passforge_av::Pass;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

/// How a single job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    /// The encoder ran and failed, or could not be launched at all.
    Failed {
        exit_code: Option<i32>,
        diagnostic: String,
    },
    /// Never launched because an upstream job for the same profile failed.
    Skipped { reason: String },
}

impl JobStatus {
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        JobStatus::Failed {
            exit_code: None,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        JobStatus::Skipped {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub label: String,
    pub kind: JobKind,
    pub output: PathBuf,
    pub status: JobStatus,
    pub started: Instant,
    pub finished: Instant,
}

impl JobOutcome {
    /// An outcome decided without launching a process.
    pub fn settled(label: &str, kind: JobKind, output: PathBuf, status: JobStatus) -> Self {
        let now = Instant::now();
        Self {
            label: label.to_string(),
            kind,
            output,
            status,
            started: now,
            finished: now,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    pub fn failed(&self) -> bool {
        matches!(self.status, JobStatus::Failed { .. })
    }

    pub fn skipped(&self) -> bool {
        matches!(self.status, JobStatus::Skipped { .. })
    }
}

/// Outcomes of one barrier-joined stage, in submission order.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub kind: JobKind,
    pub outcomes: Vec<JobOutcome>,
}

impl StageReport {
    pub fn new(kind: JobKind, outcomes: Vec<JobOutcome>) -> Self {
        Self { kind, outcomes }
    }

    pub fn empty(kind: JobKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn get(&self, label: &str) -> Option<&JobOutcome> {
        self.outcomes.iter().find(|o| o.label == label)
    }

    /// Whether the job for `label` ran and succeeded.
    pub fn succeeded_for(&self, label: &str) -> bool {
        self.get(label).map(JobOutcome::succeeded).unwrap_or(false)
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.failed()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.skipped()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} succeeded, {} failed, {} skipped",
            self.kind,
            self.succeeded_count(),
            self.failed_count(),
            self.skipped_count()
        )
    }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub source: PathBuf,
    pub first_pass: StageReport,
    pub second_pass: StageReport,
    pub segmentation: StageReport,
    /// Path of the written manifest, if any segmented variant succeeded.
    pub manifest: Option<PathBuf>,
}

impl RunReport {
    pub fn new(source: PathBuf) -> Self {
        Self {
            source,
            first_pass: StageReport::empty(JobKind::Encode(Pass::First)),
            second_pass: StageReport::empty(JobKind::Encode(Pass::Second)),
            segmentation: StageReport::empty(JobKind::Segment),
            manifest: None,
        }
    }

    pub fn stages(&self) -> [&StageReport; 3] {
        [&self.first_pass, &self.second_pass, &self.segmentation]
    }

    /// Failed and skipped jobs across all stages.
    pub fn problems(&self) -> impl Iterator<Item = &JobOutcome> {
        self.stages()
            .into_iter()
            .flat_map(|s| s.outcomes.iter())
            .filter(|o| !o.succeeded())
    }

    pub fn has_failures(&self) -> bool {
        self.stages().iter().any(|s| s.has_failures())
    }

    /// Human-readable summary, one line per stage plus one per problem.
    pub fn summary(&self) -> String {
        let mut out = format!("Source: {}\n", self.source.display());
        for stage in self.stages() {
            out.push_str(&format!("  {}\n", stage));
        }
        for outcome in self.problems() {
            let detail = match &outcome.status {
                JobStatus::Failed {
                    exit_code: Some(code),
                    diagnostic,
                } => format!("failed (exit {code}): {}", first_line(diagnostic)),
                JobStatus::Failed { diagnostic, .. } => {
                    format!("failed: {}", first_line(diagnostic))
                }
                JobStatus::Skipped { reason } => format!("skipped: {reason}"),
                JobStatus::Succeeded => continue,
            };
            out.push_str(&format!("  [{}] {}: {}\n", outcome.label, outcome.kind, detail));
        }
        match &self.manifest {
            Some(path) => out.push_str(&format!("Manifest: {}\n", path.display())),
            None => out.push_str("Manifest: none\n"),
        }
        out
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}
