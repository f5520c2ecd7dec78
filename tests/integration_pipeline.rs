//! Pipeline integration tests
//!
//! Drives the executor end to end with a recording runner in place of the
//! real encoder.

use passforge::pipeline::{
    DryRunRunner, EncodeJob, JobKind, JobRunner, JobStatus, PipelineExecutor, PipelineSettings,
};
use passforge::profile::ProfileSet;
use passforge_av::Pass;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

const HD_SD: &str = r#"[
    {"postfix": "hd", "type": "mp4+hls", "width": 1280, "height": 720,
     "video_br": 2000, "audio_br": 128, "gopsize": 48, "profile": "high"},
    {"postfix": "sd", "type": "mp4+hls", "width": 640, "height": 360,
     "video_br": 768, "audio_br": 96, "gopsize": 48, "profile": "main"}
]"#;

/// Records every job it sees and touches the files a real encoder would write.
#[derive(Default)]
struct RecordingRunner {
    jobs: Mutex<Vec<EncodeJob>>,
    fail: HashSet<(String, JobKind)>,
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingRunner {
    fn failing(label: &str, kind: JobKind) -> Self {
        let mut fail = HashSet::new();
        fail.insert((label.to_string(), kind));
        Self {
            fail,
            ..Default::default()
        }
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    fn recorded(&self) -> Vec<EncodeJob> {
        self.jobs.lock().unwrap().clone()
    }

    fn count(&self, kind: JobKind) -> usize {
        self.recorded().iter().filter(|j| j.kind == kind).count()
    }
}

#[async_trait::async_trait]
impl JobRunner for RecordingRunner {
    async fn run(&self, job: &EncodeJob) -> JobStatus {
        self.jobs.lock().unwrap().push(job.clone());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail.contains(&(job.label.clone(), job.kind)) {
            return JobStatus::Failed {
                exit_code: Some(1),
                diagnostic: format!("simulated {} failure", job.kind),
            };
        }

        if job.kind != JobKind::Encode(Pass::First) {
            std::fs::write(&job.output, b"data").unwrap();
        }
        JobStatus::Succeeded
    }
}

fn settings(scratch: &Path, concurrency: usize) -> PipelineSettings {
    PipelineSettings {
        encoder: PathBuf::from("ffmpeg"),
        scratch_dir: scratch.to_path_buf(),
        concurrency,
        job_timeout: Duration::from_secs(60),
        segment_seconds: 10,
        dry_run: false,
    }
}

fn arg_after<'a>(job: &'a EncodeJob, flag: &str) -> Option<&'a str> {
    let args = job.command.get_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Test a single plain MP4 profile: one deliverable, no segmentation, no manifest
#[tokio::test]
async fn test_single_mp4_profile() {
    let temp = tempdir().unwrap();
    let profiles = ProfileSet::from_json_str(
        r#"[{"postfix": "720p", "type": "mp4", "width": 1280, "height": 720,
             "video_br": 2000, "audio_br": 128, "gopsize": 48, "profile": "high"}]"#,
    )
    .unwrap();

    let runner = Arc::new(RecordingRunner::default());
    let executor = PipelineExecutor::new(runner.clone(), settings(&temp.path().join("tmp"), 4));
    let report = executor
        .run(Path::new("video.mov"), &temp.path().join("out"), &profiles)
        .await
        .unwrap();

    let deliverable = temp.path().join("out/video/video_720p.mp4");
    assert!(deliverable.exists());
    assert!(!report.has_failures());
    assert!(report.manifest.is_none());
    assert!(report.segmentation.outcomes.is_empty());
    assert!(!temp.path().join("out/video/master.m3u8").exists());

    let jobs = runner.recorded();
    assert_eq!(jobs.len(), 2);
    let second = jobs.iter().find(|j| j.kind == JobKind::Encode(Pass::Second)).unwrap();
    assert_eq!(second.output, deliverable);
    assert_eq!(
        second.command.get_args().last().map(PathBuf::from),
        Some(deliverable)
    );
}

/// Test two segmented profiles end to end, including the manifest contents
#[tokio::test]
async fn test_segmented_profiles_produce_manifest() {
    let temp = tempdir().unwrap();
    let profiles = ProfileSet::from_json_str(HD_SD).unwrap();

    let runner = Arc::new(RecordingRunner::default());
    let executor = PipelineExecutor::new(runner.clone(), settings(&temp.path().join("tmp"), 4));
    let report = executor
        .run(Path::new("/media/video.mov"), &temp.path().join("out"), &profiles)
        .await
        .unwrap();

    let dest = temp.path().join("out/video");
    assert_eq!(report.manifest.as_deref(), Some(dest.join("master.m3u8").as_path()));
    assert_eq!(
        std::fs::read_to_string(dest.join("master.m3u8")).unwrap(),
        "#EXTM3U\n\
         #EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=2128000\n\
         hd/index.m3u8\n\
         #EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=864000\n\
         sd/index.m3u8\n"
    );
    assert!(dest.join("video_hd.mp4").exists());
    assert!(dest.join("video_sd.mp4").exists());
    assert!(dest.join("hd/index.m3u8").exists());
    assert!(dest.join("sd/index.m3u8").exists());

    assert_eq!(runner.count(JobKind::Encode(Pass::First)), 2);
    assert_eq!(runner.count(JobKind::Encode(Pass::Second)), 2);
    assert_eq!(runner.count(JobKind::Segment), 2);

    let segment = runner
        .recorded()
        .into_iter()
        .find(|j| j.kind == JobKind::Segment && j.label == "sd")
        .unwrap();
    assert_eq!(segment.source, dest.join("video_sd.mp4"));
    assert_eq!(arg_after(&segment, "-segment_time"), Some("10"));
}

/// Test only segmented profiles appear in the manifest
#[tokio::test]
async fn test_manifest_lists_only_segmented_profiles() {
    let temp = tempdir().unwrap();
    let profiles = ProfileSet::from_json_str(
        r#"[
            {"postfix": "hd", "type": "mp4+hls", "width": 1280, "height": 720,
             "video_br": 2000, "audio_br": 128, "gopsize": 48, "profile": "high"},
            {"postfix": "sd", "type": "mp4", "width": 640, "height": 360,
             "video_br": 768, "audio_br": 96, "gopsize": 48, "profile": "main"}
        ]"#,
    )
    .unwrap();

    let runner = Arc::new(RecordingRunner::default());
    let report = PipelineExecutor::new(runner.clone(), settings(&temp.path().join("tmp"), 4))
        .run(Path::new("video.mov"), &temp.path().join("out"), &profiles)
        .await
        .unwrap();

    let dest = temp.path().join("out/video");
    assert_eq!(
        std::fs::read_to_string(dest.join("master.m3u8")).unwrap(),
        "#EXTM3U\n#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=2128000\nhd/index.m3u8\n"
    );
    assert!(dest.join("video_sd.mp4").exists());
    assert!(!dest.join("sd").exists());
    assert_eq!(runner.count(JobKind::Segment), 1);
    assert_eq!(report.segmentation.outcomes.len(), 1);
}

/// Test both passes of a profile share one statistics log, unique per profile
#[tokio::test]
async fn test_pass_logs_are_per_profile() {
    let temp = tempdir().unwrap();
    let scratch = temp.path().join("tmp");
    let profiles = ProfileSet::from_json_str(HD_SD).unwrap();

    let runner = Arc::new(RecordingRunner::default());
    PipelineExecutor::new(runner.clone(), settings(&scratch, 4))
        .run(Path::new("video.mov"), &temp.path().join("out"), &profiles)
        .await
        .unwrap();

    let log_for = |label: &str, pass: Pass| {
        runner
            .recorded()
            .into_iter()
            .find(|j| j.label == label && j.kind == JobKind::Encode(pass))
            .and_then(|j| arg_after(&j, "-passlogfile").map(PathBuf::from))
            .unwrap()
    };

    assert_eq!(log_for("hd", Pass::First), log_for("hd", Pass::Second));
    assert_eq!(log_for("hd", Pass::First), scratch.join("twopass_video_hd"));
    assert_ne!(log_for("hd", Pass::First), log_for("sd", Pass::First));
    assert!(scratch.is_dir());
}

/// Test no job of a stage starts before every job of the previous stage ends
#[tokio::test]
async fn test_stages_are_barriers() {
    let temp = tempdir().unwrap();
    let profiles = ProfileSet::from_json_str(HD_SD).unwrap();

    let runner = Arc::new(RecordingRunner::with_delay(Duration::from_millis(20)));
    let report = PipelineExecutor::new(runner, settings(&temp.path().join("tmp"), 4))
        .run(Path::new("video.mov"), &temp.path().join("out"), &profiles)
        .await
        .unwrap();

    let stages = report.stages();
    for pair in stages.windows(2) {
        let last_finish = pair[0].outcomes.iter().map(|o| o.finished).max().unwrap();
        let first_start = pair[1].outcomes.iter().map(|o| o.started).min().unwrap();
        assert!(
            first_start >= last_finish,
            "{} started before {} finished",
            pair[1].kind,
            pair[0].kind
        );
    }
}

/// Test a failed first pass only affects its own profile
#[tokio::test]
async fn test_failure_is_isolated_per_profile() {
    let temp = tempdir().unwrap();
    let profiles = ProfileSet::from_json_str(HD_SD).unwrap();

    let runner = Arc::new(RecordingRunner::failing("sd", JobKind::Encode(Pass::First)));
    let report = PipelineExecutor::new(runner.clone(), settings(&temp.path().join("tmp"), 4))
        .run(Path::new("video.mov"), &temp.path().join("out"), &profiles)
        .await
        .unwrap();

    assert!(report.has_failures());
    assert!(report.first_pass.get("sd").unwrap().failed());
    assert!(report.second_pass.get("sd").unwrap().skipped());
    assert!(report.segmentation.get("sd").unwrap().skipped());
    assert!(report.second_pass.succeeded_for("hd"));
    assert!(report.segmentation.succeeded_for("hd"));

    // The skipped jobs never reached the runner.
    assert_eq!(runner.count(JobKind::Encode(Pass::Second)), 1);
    assert_eq!(runner.count(JobKind::Segment), 1);

    let manifest = std::fs::read_to_string(temp.path().join("out/video/master.m3u8")).unwrap();
    assert!(manifest.contains("hd/index.m3u8"));
    assert!(!manifest.contains("sd/index.m3u8"));

    let summary = report.summary();
    assert!(summary.contains("[sd] pass 1: failed (exit 1): simulated pass 1 failure"));
    assert!(summary.contains("[sd] pass 2: skipped"));
}

/// Test a failed segmentation leaves the variant out of the manifest
#[tokio::test]
async fn test_failed_segmentation_omitted_from_manifest() {
    let temp = tempdir().unwrap();
    let profiles = ProfileSet::from_json_str(HD_SD).unwrap();

    let runner = Arc::new(RecordingRunner::failing("hd", JobKind::Segment));
    let report = PipelineExecutor::new(runner, settings(&temp.path().join("tmp"), 4))
        .run(Path::new("video.mov"), &temp.path().join("out"), &profiles)
        .await
        .unwrap();

    assert!(report.has_failures());
    assert!(temp.path().join("out/video/video_hd.mp4").exists());
    let manifest = std::fs::read_to_string(report.manifest.unwrap()).unwrap();
    assert_eq!(
        manifest,
        "#EXTM3U\n#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=864000\nsd/index.m3u8\n"
    );
}

/// Test the concurrency limit holds across a stage
#[tokio::test]
async fn test_concurrency_limit() {
    let temp = tempdir().unwrap();
    let profiles = ProfileSet::from_json_str(
        r#"[
            {"postfix": "a", "type": "mp4", "width": 320, "height": 180,
             "video_br": 300, "audio_br": 64, "gopsize": 48, "profile": "baseline"},
            {"postfix": "b", "type": "webm", "width": 320, "height": 180,
             "video_br": 300, "audio_br": 64, "gopsize": 48},
            {"postfix": "c", "type": "mp4", "width": 640, "height": 360,
             "video_br": 800, "audio_br": 96, "gopsize": 48, "profile": "main"}
        ]"#,
    )
    .unwrap();

    let runner = Arc::new(RecordingRunner::with_delay(Duration::from_millis(10)));
    let report = PipelineExecutor::new(runner.clone(), settings(&temp.path().join("tmp"), 1))
        .run(Path::new("video.mov"), &temp.path().join("out"), &profiles)
        .await
        .unwrap();

    assert!(!report.has_failures());
    assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
    assert!(temp.path().join("out/video/video_b.webm").exists());
}

/// Test dry-run touches nothing on disk
#[tokio::test]
async fn test_dry_run_creates_nothing() {
    let temp = tempdir().unwrap();
    let profiles = ProfileSet::from_json_str(HD_SD).unwrap();

    let settings = PipelineSettings {
        dry_run: true,
        ..settings(&temp.path().join("tmp"), 2)
    };
    let report = PipelineExecutor::new(Arc::new(DryRunRunner), settings)
        .run(Path::new("video.mov"), &temp.path().join("out"), &profiles)
        .await
        .unwrap();

    assert!(!report.has_failures());
    assert_eq!(report.segmentation.succeeded_count(), 2);
    assert!(report.manifest.is_none());
    assert!(!temp.path().join("out").exists());
    assert!(!temp.path().join("tmp").exists());
}
