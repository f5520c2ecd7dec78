pub mod executor;
pub mod job;
pub mod layout;
pub mod manifest;
pub mod report;
pub mod runner;
pub mod segment;
pub mod stage;

pub use executor::{PipelineExecutor, PipelineSettings};
pub use job::{EncodeJob, JobKind};
pub use layout::{OutputLayout, MANIFEST_NAME};
pub use manifest::{Manifest, SegmentIndex};
pub use report::{JobOutcome, JobStatus, RunReport, StageReport};
pub use runner::{DryRunRunner, JobRunner, ProcessRunner};
pub use stage::{run_stage, PlannedJob};
