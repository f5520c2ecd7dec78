use super::job::{EncodeJob, JobKind};
use super::layout::OutputLayout;
use super::manifest::Manifest;
use super::report::{JobOutcome, JobStatus, RunReport, StageReport};
use super::runner::JobRunner;
use super::segment::{collect_indexes, SegmentPlan};
use super::stage::{run_stage, PlannedJob};
use crate::config::Config;
use crate::profile::{EncodeProfile, ProfileSet};
use anyhow::{Context, Result};
use passforge_av::{HlsSegmentation, Pass, TwoPassEncode, Workspace, NULL_SINK};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, Instrument};

/// Run-wide settings resolved from config and CLI.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub encoder: PathBuf,
    pub scratch_dir: PathBuf,
    /// Maximum jobs in flight within one stage.
    pub concurrency: usize,
    pub job_timeout: Duration,
    pub segment_seconds: u32,
    pub dry_run: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config, encoder: PathBuf) -> Self {
        Self {
            encoder,
            scratch_dir: config.paths.scratch_dir.clone(),
            concurrency: config.encoder.concurrency(),
            job_timeout: config.encoder.job_timeout(),
            segment_seconds: config.segmentation.segment_seconds,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

fn report_progress(progress: f32, step: &str) {
    info!("[{:.0}%] {}", progress, step);
}

/// Drive one source through pass 1, pass 2, segmentation and the manifest.
///
/// Each stage is a barrier: nothing from the next stage starts until every
/// job of the current one has finished.
pub struct PipelineExecutor {
    runner: Arc<dyn JobRunner>,
    settings: PipelineSettings,
}

impl PipelineExecutor {
    pub fn new(runner: Arc<dyn JobRunner>, settings: PipelineSettings) -> Self {
        Self { runner, settings }
    }

    /// Transcode `source` with every profile into `<dest_root>/<stem>/`.
    ///
    /// Job failures are recorded in the report, not returned as errors. An
    /// `Err` means the run could not be set up or the manifest could not be
    /// written.
    pub async fn run(
        &self,
        source: &Path,
        dest_root: &Path,
        profiles: &ProfileSet,
    ) -> Result<RunReport> {
        let layout = OutputLayout::new(dest_root, source)?;
        let span = info_span!("run", source = %source.display());
        self.run_stages(source, &layout, profiles)
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        source: &Path,
        layout: &OutputLayout,
        profiles: &ProfileSet,
    ) -> Result<RunReport> {
        let segmenter = HlsSegmentation::new(self.settings.segment_seconds)?;
        let workspace = self.prepare(layout)?;

        info!(
            "Transcoding {:?} with {} profiles ({} segmented) into {:?}",
            source,
            profiles.len(),
            profiles.segmented().count(),
            layout.dest_dir()
        );

        let mut report = RunReport::new(source.to_path_buf());

        report_progress(0.0, "Starting pass 1");
        let jobs = self.encode_jobs(Pass::First, source, layout, &workspace, profiles, None);
        report.first_pass = self.stage(JobKind::Encode(Pass::First), jobs).await;

        report_progress(33.0, "Starting pass 2");
        let jobs = self.encode_jobs(
            Pass::Second,
            source,
            layout,
            &workspace,
            profiles,
            Some(&report.first_pass),
        );
        report.second_pass = self.stage(JobKind::Encode(Pass::Second), jobs).await;

        report_progress(66.0, "Starting segmentation");
        let plan = SegmentPlan {
            program: &self.settings.encoder,
            segmenter,
            timeout: self.settings.job_timeout,
            create_dirs: !self.settings.dry_run,
        };
        let jobs = plan.jobs(profiles, layout, &report.second_pass);
        report.segmentation = self.stage(JobKind::Segment, jobs).await;

        report.manifest = self.write_manifest(profiles, layout, &report.segmentation)?;

        report_progress(100.0, "Finished");
        Ok(report)
    }

    /// Create the destination and scratch directories, unless dry-running.
    fn prepare(&self, layout: &OutputLayout) -> Result<Workspace> {
        if self.settings.dry_run {
            info!("[DRY RUN] Would create {:?}", layout.dest_dir());
            return Ok(Workspace::at(&self.settings.scratch_dir));
        }

        std::fs::create_dir_all(layout.dest_dir()).with_context(|| {
            format!("Failed to create destination dir: {:?}", layout.dest_dir())
        })?;
        Ok(Workspace::create(&self.settings.scratch_dir)?)
    }

    async fn stage(&self, kind: JobKind, jobs: Vec<PlannedJob>) -> StageReport {
        let report = run_stage(self.runner.clone(), kind, jobs, self.settings.concurrency).await;
        info!("Stage finished: {}", report);
        report
    }

    fn encode_jobs(
        &self,
        pass: Pass,
        source: &Path,
        layout: &OutputLayout,
        workspace: &Workspace,
        profiles: &ProfileSet,
        upstream: Option<&StageReport>,
    ) -> Vec<PlannedJob> {
        profiles
            .iter()
            .map(|profile| self.encode_job(pass, source, layout, workspace, profile, upstream))
            .collect()
    }

    fn encode_job(
        &self,
        pass: Pass,
        source: &Path,
        layout: &OutputLayout,
        workspace: &Workspace,
        profile: &EncodeProfile,
        upstream: Option<&StageReport>,
    ) -> PlannedJob {
        let kind = JobKind::Encode(pass);
        let output = match pass {
            Pass::First => PathBuf::from(NULL_SINK),
            Pass::Second => layout.deliverable(profile),
        };
        let settle = |status| {
            PlannedJob::Settled(JobOutcome::settled(&profile.postfix, kind, output.clone(), status))
        };

        if let Some(upstream) = upstream {
            if !upstream.succeeded_for(&profile.postfix) {
                return settle(JobStatus::skipped(format!(
                    "{} did not succeed",
                    upstream.kind
                )));
            }
        }

        let pass_log = workspace.pass_log(layout.stem(), &profile.postfix);
        let encode = match TwoPassEncode::new(profile.settings, profile.codec(), pass_log) {
            Ok(encode) => encode,
            Err(e) => return settle(JobStatus::failed(e.to_string())),
        };

        let mut command = encode.command(&self.settings.encoder, pass, source, &output);
        command.timeout(self.settings.job_timeout);

        PlannedJob::Run(EncodeJob {
            label: profile.postfix.clone(),
            kind,
            command,
            source: source.to_path_buf(),
            output,
        })
    }

    fn write_manifest(
        &self,
        profiles: &ProfileSet,
        layout: &OutputLayout,
        segmentation: &StageReport,
    ) -> Result<Option<PathBuf>> {
        let Some(manifest) = Manifest::new(collect_indexes(profiles, layout, segmentation)) else {
            info!("No segmented variants succeeded; no manifest written");
            return Ok(None);
        };

        let path = layout.manifest_path();
        if self.settings.dry_run {
            info!(
                "[DRY RUN] Would write manifest {:?} with {} variants",
                path,
                manifest.entries().len()
            );
            return Ok(None);
        }

        let path = manifest.write(&path)?;
        info!(
            "Wrote manifest {:?} with {} variants",
            path,
            manifest.entries().len()
        );
        Ok(Some(path))
    }
}
