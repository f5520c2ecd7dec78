//! Encode job runners: the seam between the coordinator and the encoder.

use super::job::EncodeJob;
use super::report::JobStatus;
use tracing::{debug, error, info};

/// Executes one job to completion.
///
/// Implementations must not panic or return early on encoder failure: every
/// problem is folded into the returned [`JobStatus`].
#[async_trait::async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &EncodeJob) -> JobStatus;
}

/// Runs jobs as real encoder processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait::async_trait]
impl JobRunner for ProcessRunner {
    async fn run(&self, job: &EncodeJob) -> JobStatus {
        info!(
            "Started to transcode file: {:?} => {:?}",
            job.source, job.output
        );
        debug!("Encoder command: {}", job.command);

        match job.command.output().await {
            Ok(output) if output.success() => {
                info!(
                    "Finished transcoding of file: {:?} => {:?}",
                    job.source, job.output
                );
                JobStatus::Succeeded
            }
            Ok(output) => {
                let diagnostic = match output.stderr.trim() {
                    "" => format!("exited with status {}", output.status),
                    stderr => stderr.to_string(),
                };
                error!(
                    exit_code = ?output.code(),
                    "Transcoding error: {}", diagnostic
                );
                JobStatus::Failed {
                    exit_code: output.code(),
                    diagnostic,
                }
            }
            Err(e) => {
                error!("Transcoding error: {}", e);
                JobStatus::failed(e.to_string())
            }
        }
    }
}

/// Logs each command instead of running it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

#[async_trait::async_trait]
impl JobRunner for DryRunRunner {
    async fn run(&self, job: &EncodeJob) -> JobStatus {
        info!("[DRY RUN] Would execute: {}", job.command);
        JobStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::job::JobKind;
    use passforge_av::{Pass, ToolCommand};
    use std::path::PathBuf;

    fn job(command: ToolCommand) -> EncodeJob {
        EncodeJob {
            label: "hd".to_string(),
            kind: JobKind::Encode(Pass::Second),
            command,
            source: PathBuf::from("video.mov"),
            output: PathBuf::from("out/video_hd.mp4"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_failure() {
        let mut cmd = ToolCommand::new("sh");
        cmd.args(["-c", "echo 'Unknown encoder' >&2; exit 1"]);

        let status = ProcessRunner.run(&job(cmd)).await;
        assert_eq!(
            status,
            JobStatus::Failed {
                exit_code: Some(1),
                diagnostic: "Unknown encoder".to_string(),
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_success() {
        let mut cmd = ToolCommand::new("sh");
        cmd.args(["-c", "exit 0"]);
        assert_eq!(ProcessRunner.run(&job(cmd)).await, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_process_runner_reports_launch_error() {
        let status = ProcessRunner
            .run(&job(ToolCommand::new("nonexistent_encoder_12345")))
            .await;
        assert!(matches!(status, JobStatus::Failed { exit_code: None, .. }));
    }

    #[tokio::test]
    async fn test_dry_run_never_launches() {
        let status = DryRunRunner
            .run(&job(ToolCommand::new("nonexistent_encoder_12345")))
            .await;
        assert_eq!(status, JobStatus::Succeeded);
    }
}
