//! Bounded, barrier-joined execution of one stage's jobs.

use super::job::{EncodeJob, JobKind};
use super::report::{JobOutcome, JobStatus, StageReport};
use super::runner::JobRunner;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info_span, warn, Instrument};

/// A job as handed to [`run_stage`].
#[derive(Debug)]
pub enum PlannedJob {
    Run(EncodeJob),
    /// Decided before launch, e.g. skipped because an upstream job failed.
    Settled(JobOutcome),
}

enum Slot {
    Running {
        handle: JoinHandle<JobOutcome>,
        label: String,
        output: std::path::PathBuf,
    },
    Done(JobOutcome),
}

/// Run every planned job with at most `limit` in flight, then wait for all
/// of them before returning.
///
/// A failing job never cancels its siblings. Outcomes come back in the order
/// the jobs were planned.
pub async fn run_stage(
    runner: Arc<dyn JobRunner>,
    kind: JobKind,
    planned: Vec<PlannedJob>,
    limit: usize,
) -> StageReport {
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut slots = Vec::with_capacity(planned.len());

    for item in planned {
        match item {
            PlannedJob::Run(job) => {
                let label = job.label.clone();
                let output = job.output.clone();
                let span = info_span!("job", label = %job.label, kind = %job.kind);
                let semaphore = semaphore.clone();
                let runner = runner.clone();

                let handle = tokio::spawn(
                    async move {
                        let _permit = semaphore.acquire_owned().await.ok();
                        let started = Instant::now();
                        let status = runner.run(&job).await;
                        JobOutcome {
                            label: job.label,
                            kind: job.kind,
                            output: job.output,
                            status,
                            started,
                            finished: Instant::now(),
                        }
                    }
                    .instrument(span),
                );

                slots.push(Slot::Running {
                    handle,
                    label,
                    output,
                });
            }
            PlannedJob::Settled(outcome) => {
                if let JobStatus::Skipped { reason } = &outcome.status {
                    warn!("Skipping {} for '{}': {}", kind, outcome.label, reason);
                }
                slots.push(Slot::Done(outcome));
            }
        }
    }

    let mut outcomes = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Done(outcome) => outcomes.push(outcome),
            Slot::Running {
                handle,
                label,
                output,
            } => match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("{} task for '{}' did not complete: {}", kind, label, e);
                    outcomes.push(JobOutcome::settled(
                        &label,
                        kind,
                        output,
                        JobStatus::failed(format!("job task aborted: {e}")),
                    ));
                }
            },
        }
    }

    StageReport::new(kind, outcomes)
}
