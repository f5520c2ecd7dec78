//! HLS segmentation of second-pass MP4 outputs.

use super::job::{EncodeJob, JobKind};
use super::layout::OutputLayout;
use super::manifest::SegmentIndex;
use super::report::{JobOutcome, JobStatus, StageReport};
use super::stage::PlannedJob;
use crate::profile::{EncodeProfile, ProfileSet};
use passforge_av::{HlsSegmentation, SEGMENT_INDEX_NAME};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Inputs shared by every segmentation job of a run.
#[derive(Debug, Clone, Copy)]
pub struct SegmentPlan<'a> {
    pub program: &'a Path,
    pub segmenter: HlsSegmentation,
    pub timeout: Duration,
    /// Create variant directories before launching jobs.
    pub create_dirs: bool,
}

impl SegmentPlan<'_> {
    /// One job per segmented profile, in declaration order.
    ///
    /// Profiles whose second pass did not succeed are skipped.
    pub fn jobs(
        &self,
        profiles: &ProfileSet,
        layout: &OutputLayout,
        second_pass: &StageReport,
    ) -> Vec<PlannedJob> {
        profiles
            .segmented()
            .map(|profile| self.job_for(profile, layout, second_pass))
            .collect()
    }

    fn job_for(
        &self,
        profile: &EncodeProfile,
        layout: &OutputLayout,
        second_pass: &StageReport,
    ) -> PlannedJob {
        let variant_dir = layout.variant_dir(profile);
        let index = variant_dir.join(SEGMENT_INDEX_NAME);

        if !second_pass.succeeded_for(&profile.postfix) {
            return settled(profile, index, JobStatus::skipped("pass 2 did not succeed"));
        }

        if self.create_dirs {
            if let Err(e) = std::fs::create_dir_all(&variant_dir) {
                return settled(
                    profile,
                    index,
                    JobStatus::failed(format!(
                        "failed to create segment directory {:?}: {}",
                        variant_dir, e
                    )),
                );
            }
        }

        let source = layout.deliverable(profile);
        let mut command = self.segmenter.command(self.program, &source, &variant_dir);
        command.timeout(self.timeout);

        PlannedJob::Run(EncodeJob {
            label: profile.postfix.clone(),
            kind: JobKind::Segment,
            command,
            source,
            output: index,
        })
    }
}

fn settled(profile: &EncodeProfile, index: PathBuf, status: JobStatus) -> PlannedJob {
    PlannedJob::Settled(JobOutcome::settled(
        &profile.postfix,
        JobKind::Segment,
        index,
        status,
    ))
}

/// Segment indexes that were actually produced, in declaration order.
pub fn collect_indexes(
    profiles: &ProfileSet,
    layout: &OutputLayout,
    segmentation: &StageReport,
) -> Vec<SegmentIndex> {
    profiles
        .segmented()
        .filter(|p| segmentation.succeeded_for(&p.postfix))
        .map(|p| SegmentIndex {
            uri: layout.index_uri(p),
            combined_kbps: p.combined_kbps(),
        })
        .collect()
}
