//! Typed ffmpeg command builders for two-pass encodes and HLS segmentation.
//!
//! Every builder validates its parameters before it hands out a
//! [`ToolCommand`], so a malformed profile never reaches the encoder.

use crate::{Error, Result, ToolCommand};
use std::fmt;
use std::path::{Path, PathBuf};

/// Output target for the first pass, which only gathers rate-control stats.
pub const NULL_SINK: &str = if cfg!(windows) { "NUL" } else { "/dev/null" };

/// File name of the per-variant segment index.
pub const SEGMENT_INDEX_NAME: &str = "index.m3u8";

/// Numbered transport-stream segment pattern, relative to the variant dir.
pub const SEGMENT_PATTERN: &str = "segment_%05d.ts";

pub const MAX_DIMENSION: u32 = 8192;
pub const MAX_VIDEO_KBPS: u32 = 500_000;
pub const MAX_AUDIO_KBPS: u32 = 1024;
pub const MAX_GOP_SIZE: u32 = 1200;

const X264_OPTS: &str = "aud:bframes=3:direct=auto:level=31:me=esa:merange=16:\
min-keyint=1:no-fast-pskip:no-mbtree:no-mixed-refs:nr=1000:\
partitions=+parti8x8+parti4x4+partp8x8+partp4x4:qcomp=0.7:qpmax=51:qpmin=10:\
ratetol=0.1:rc-lookahead=40:scenecut=40:subme=7:trellis=2:weightp=2";

const SCALE_FLAGS: &str = "lanczos+accurate_rnd";
const AUDIO_SAMPLE_RATE: &str = "48000";

/// One of the two rate-control passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pass {
    /// Statistics-gathering pass; output goes to [`NULL_SINK`].
    First,
    /// Final pass that writes the deliverable.
    Second,
}

impl Pass {
    /// The value passed to ffmpeg's `-pass`.
    pub fn number(self) -> u8 {
        match self {
            Pass::First => 1,
            Pass::Second => 2,
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pass {}", self.number())
    }
}

/// H.264 profiles accepted for MP4 output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H264Profile {
    Baseline,
    Main,
    High,
}

impl H264Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            H264Profile::Baseline => "baseline",
            H264Profile::Main => "main",
            H264Profile::High => "high",
        }
    }
}

impl std::str::FromStr for H264Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "baseline" => Ok(H264Profile::Baseline),
            "main" => Ok(H264Profile::Main),
            "high" => Ok(H264Profile::High),
            other => Err(Error::parameter(format!(
                "unsupported H.264 profile '{other}' (expected baseline, main or high)"
            ))),
        }
    }
}

/// Codec family, which also fixes the container and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// H.264 + AAC in MP4.
    H264(H264Profile),
    /// VP8 + Vorbis in WebM.
    Vp8,
}

impl VideoCodec {
    /// Output file extension (and ffmpeg muxer name).
    pub fn extension(&self) -> &'static str {
        match self {
            VideoCodec::H264(_) => "mp4",
            VideoCodec::Vp8 => "webm",
        }
    }
}

/// Picture and rate parameters shared by every codec.
///
/// Bitrates are in kbit/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub video_kbps: u32,
    pub audio_kbps: u32,
    pub gop_size: u32,
}

impl EncodeSettings {
    /// Check every field against the range the encoders accept.
    pub fn validate(&self) -> Result<()> {
        check_dimension("width", self.width)?;
        check_dimension("height", self.height)?;
        check_range("video bitrate", self.video_kbps, 1, MAX_VIDEO_KBPS)?;
        check_range("audio bitrate", self.audio_kbps, 1, MAX_AUDIO_KBPS)?;
        check_range("gop size", self.gop_size, 1, MAX_GOP_SIZE)?;
        Ok(())
    }

    /// Combined video and audio bitrate in kbit/s.
    pub fn total_kbps(&self) -> u64 {
        u64::from(self.video_kbps) + u64::from(self.audio_kbps)
    }
}

fn check_dimension(name: &str, value: u32) -> Result<()> {
    check_range(name, value, 2, MAX_DIMENSION)?;
    // yuv420p chroma subsampling needs even dimensions.
    if value % 2 != 0 {
        return Err(Error::parameter(format!("{name} must be even, got {value}")));
    }
    Ok(())
}

fn check_range(name: &str, value: u32, min: u32, max: u32) -> Result<()> {
    if value < min || value > max {
        return Err(Error::parameter(format!(
            "{name} must be within {min}..={max}, got {value}"
        )));
    }
    Ok(())
}

/// A validated two-pass encode for one profile.
///
/// Both passes share `pass_log`, which must be unique per (source, profile).
#[derive(Debug, Clone)]
pub struct TwoPassEncode {
    settings: EncodeSettings,
    codec: VideoCodec,
    pass_log: PathBuf,
}

impl TwoPassEncode {
    pub fn new(settings: EncodeSettings, codec: VideoCodec, pass_log: PathBuf) -> Result<Self> {
        settings.validate()?;
        if pass_log.as_os_str().is_empty() {
            return Err(Error::parameter("two-pass log path is empty"));
        }
        Ok(Self {
            settings,
            codec,
            pass_log,
        })
    }

    /// Build the encoder invocation for `pass`.
    ///
    /// `output` is ignored for [`Pass::First`], which always writes to
    /// [`NULL_SINK`].
    pub fn command(&self, program: &Path, pass: Pass, input: &Path, output: &Path) -> ToolCommand {
        let s = &self.settings;
        let target = match pass {
            Pass::First => NULL_SINK.to_string(),
            Pass::Second => output.to_string_lossy().to_string(),
        };

        let mut cmd = ToolCommand::new(program);
        cmd.args(["-loglevel", "error", "-i"]);
        cmd.arg(input.to_string_lossy());
        cmd.args(["-filter_complex".to_string(), format!("scale={}:{}", s.width, s.height)]);
        cmd.args(["-sws_flags", SCALE_FLAGS]);

        match self.codec {
            VideoCodec::H264(profile) => {
                cmd.args(["-c:v", "libx264", "-profile:v", profile.as_str()]);
                cmd.args(["-b:v".to_string(), format!("{}k", s.video_kbps)]);
                cmd.args([
                    "-x264opts".to_string(),
                    format!("{X264_OPTS}:keyint={}", s.gop_size),
                ]);
                cmd.args([
                    "-force_key_frames".to_string(),
                    format!("expr:gte(n,n_forced*{})", s.gop_size),
                ]);
                cmd.args(["-c:a", "libfdk_aac"]);
                cmd.args(["-b:a".to_string(), format!("{}k", s.audio_kbps)]);
                cmd.args(["-ar", AUDIO_SAMPLE_RATE, "-ac", "2"]);
                cmd.args(["-movflags", "+faststart"]);
            }
            VideoCodec::Vp8 => {
                cmd.args(["-c:v", "vp8"]);
                cmd.args(["-g".to_string(), s.gop_size.to_string()]);
                cmd.args(["-cpu-used", "0", "-deadline", "realtime", "-qmin", "0", "-qmax", "63"]);
                cmd.args(["-bufsize".to_string(), format!("{}k", u64::from(s.video_kbps) * 2)]);
                cmd.args(["-maxrate".to_string(), format!("{}k", s.video_kbps)]);
                cmd.args([
                    "-arnr-maxframes",
                    "7",
                    "-arnr-strength",
                    "5",
                    "-arnr-type",
                    "centered",
                    "-auto-alt-ref",
                    "1",
                ]);
                cmd.args(["-c:a", "libvorbis"]);
                cmd.args(["-b:a".to_string(), format!("{}k", s.audio_kbps)]);
                cmd.args(["-ar", AUDIO_SAMPLE_RATE]);
            }
        }

        cmd.args(["-pass".to_string(), pass.number().to_string()]);
        cmd.arg("-passlogfile");
        cmd.arg(self.pass_log.to_string_lossy());
        cmd.args(["-f", self.codec.extension(), "-y"]);
        cmd.arg(target);
        cmd
    }
}

/// Stream-copy segmentation of an MP4 into MPEG-TS chunks plus an m3u8 index.
#[derive(Debug, Clone, Copy)]
pub struct HlsSegmentation {
    segment_seconds: u32,
}

impl HlsSegmentation {
    pub fn new(segment_seconds: u32) -> Result<Self> {
        if segment_seconds == 0 {
            return Err(Error::parameter("segment duration must be at least 1 second"));
        }
        Ok(Self { segment_seconds })
    }

    /// Build the segmenter invocation writing into `variant_dir`.
    ///
    /// Produces `variant_dir/index.m3u8` and `variant_dir/segment_NNNNN.ts`.
    pub fn command(&self, program: &Path, input: &Path, variant_dir: &Path) -> ToolCommand {
        let index = variant_dir.join(SEGMENT_INDEX_NAME);
        let pattern = variant_dir.join(SEGMENT_PATTERN);

        let mut cmd = ToolCommand::new(program);
        cmd.args(["-loglevel", "error", "-i"]);
        cmd.arg(input.to_string_lossy());
        cmd.args(["-c", "copy", "-map", "0"]);
        cmd.args(["-bsf:v", "h264_mp4toannexb", "-bsf:a", "aac_adtstoasc"]);
        cmd.args(["-flags", "global_header", "-f", "segment"]);
        cmd.args(["-segment_time".to_string(), self.segment_seconds.to_string()]);
        cmd.arg("-segment_list");
        cmd.arg(index.to_string_lossy());
        cmd.args(["-segment_list_type", "m3u8", "-segment_format", "mpegts"]);
        cmd.arg(pattern.to_string_lossy());
        cmd
    }
}
