//! # passforge-av
//!
//! The external-tool half of passforge. The orchestrator treats ffmpeg as an
//! opaque process identified by its exit code and stderr; everything that
//! knows about ffmpeg's argument syntax lives here.
//!
//! This crate provides:
//!
//! - **Encoder discovery** ([`Encoder`]) via `which`, plus its version banner.
//! - **Command execution** ([`ToolCommand`]): async builder with a bounded
//!   wait that kills the child when the time budget runs out.
//! - **Typed command builders** ([`TwoPassEncode`], [`HlsSegmentation`]) that
//!   validate profile fields before producing a [`ToolCommand`].
//! - **Scratch workspace** ([`Workspace`]) for two-pass logs and downloads.
//!
//! ## Example
//!
//! ```no_run
//! use passforge_av::{EncodeSettings, H264Profile, Pass, TwoPassEncode, VideoCodec, Workspace};
//! use std::path::Path;
//!
//! # async fn example() -> passforge_av::Result<()> {
//! let workspace = Workspace::create("tmp")?;
//! let settings = EncodeSettings {
//!     width: 1280,
//!     height: 720,
//!     video_kbps: 2000,
//!     audio_kbps: 128,
//!     gop_size: 48,
//! };
//! let encode = TwoPassEncode::new(
//!     settings,
//!     VideoCodec::H264(H264Profile::High),
//!     workspace.pass_log("video", "720p"),
//! )?;
//!
//! for pass in [Pass::First, Pass::Second] {
//!     let output = encode
//!         .command(
//!             Path::new("ffmpeg"),
//!             pass,
//!             Path::new("video.mov"),
//!             Path::new("out/video/video_720p.mp4"),
//!         )
//!         .output()
//!         .await?;
//!     if !output.success() {
//!         eprintln!("{pass} failed: {}", output.stderr.trim());
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod encode;
mod error;
pub mod tools;
pub mod workspace;

// Re-exports
pub use command::{ToolCommand, ToolOutput, DEFAULT_TIMEOUT};
pub use encode::{
    EncodeSettings, H264Profile, HlsSegmentation, Pass, TwoPassEncode, VideoCodec, NULL_SINK,
    SEGMENT_INDEX_NAME, SEGMENT_PATTERN,
};
pub use error::{Error, Result};
pub use tools::Encoder;
pub use workspace::Workspace;
