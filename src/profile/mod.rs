//! Encode profiles: one declarative descriptor per deliverable.
//!
//! A profile set is read once at the start of a run, validated as a whole, and
//! shared read-only by every job afterwards. Declaration order is preserved
//! because the manifest lists variants in that order.

use passforge_av::{EncodeSettings, H264Profile, VideoCodec};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Errors raised while loading or validating a profile set.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile set {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile set: {0}")]
    Parse(String),

    #[error("profile set is empty")]
    Empty,

    #[error("duplicate profile postfix '{0}'")]
    DuplicatePostfix(String),

    #[error("invalid profile '{postfix}': {message}")]
    Invalid { postfix: String, message: String },
}

impl ProfileError {
    fn invalid(postfix: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            postfix: postfix.to_string(),
            message: message.into(),
        }
    }
}

/// Output container of a profile's two-pass encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Mp4,
    Webm,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
        }
    }
}

/// Parsed form of the `type` tag, e.g. `mp4`, `webm` or `mp4+hls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTag {
    pub container: Container,
    pub segmented: bool,
}

impl std::str::FromStr for TypeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp4" => Ok(TypeTag {
                container: Container::Mp4,
                segmented: false,
            }),
            "mp4+hls" => Ok(TypeTag {
                container: Container::Mp4,
                segmented: true,
            }),
            "webm" => Ok(TypeTag {
                container: Container::Webm,
                segmented: false,
            }),
            "webm+hls" => Err("HLS segmentation requires an mp4 target".to_string()),
            other => Err(format!(
                "unknown type '{other}' (expected mp4, mp4+hls or webm)"
            )),
        }
    }
}

/// Profile descriptor as it appears in the file.
#[derive(Debug, Clone, Deserialize)]
struct RawProfile {
    postfix: String,
    #[serde(rename = "type")]
    type_tag: String,
    width: u32,
    height: u32,
    video_br: u32,
    audio_br: u32,
    gopsize: u32,
    #[serde(default)]
    profile: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlProfileSet {
    #[serde(default)]
    profiles: Vec<RawProfile>,
}

/// One validated deliverable specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeProfile {
    /// Unique suffix; used in file names and as the segment directory name.
    pub postfix: String,
    pub container: Container,
    /// Whether the pass-2 output is also segmented for HLS delivery.
    pub segmented: bool,
    pub settings: EncodeSettings,
    /// Only set for MP4 profiles.
    pub h264_profile: Option<H264Profile>,
}

impl EncodeProfile {
    /// Codec selection for the typed command builder.
    pub fn codec(&self) -> VideoCodec {
        match (self.container, self.h264_profile) {
            (Container::Mp4, Some(profile)) => VideoCodec::H264(profile),
            // Unreachable inside a ProfileSet; see `check`.
            (Container::Mp4, None) => VideoCodec::H264(H264Profile::High),
            (Container::Webm, _) => VideoCodec::Vp8,
        }
    }

    pub fn extension(&self) -> &'static str {
        self.container.extension()
    }

    /// Combined video and audio bitrate in kbit/s.
    pub fn combined_kbps(&self) -> u64 {
        self.settings.total_kbps()
    }

    /// Enforce the invariants every member of a [`ProfileSet`] holds.
    pub fn check(&self) -> Result<(), ProfileError> {
        validate_postfix(&self.postfix)?;

        match (self.container, self.h264_profile) {
            (Container::Mp4, None) => {
                return Err(ProfileError::invalid(
                    &self.postfix,
                    "mp4 profiles require a codec 'profile'",
                ))
            }
            (Container::Webm, Some(_)) => {
                return Err(ProfileError::invalid(
                    &self.postfix,
                    "webm profiles take no H.264 profile",
                ))
            }
            (Container::Webm, None) if self.segmented => {
                return Err(ProfileError::invalid(
                    &self.postfix,
                    "HLS segmentation requires an mp4 target",
                ))
            }
            _ => {}
        }

        self.settings
            .validate()
            .map_err(|e| ProfileError::invalid(&self.postfix, e.to_string()))
    }

    fn from_raw(raw: RawProfile) -> Result<Self, ProfileError> {
        let postfix = raw.postfix.trim().to_string();
        validate_postfix(&postfix)?;

        let tag: TypeTag = raw
            .type_tag
            .parse()
            .map_err(|e: String| ProfileError::invalid(&postfix, e))?;

        let h264_profile = match tag.container {
            Container::Mp4 => {
                let name = raw.profile.as_deref().ok_or_else(|| {
                    ProfileError::invalid(&postfix, "mp4 profiles require a codec 'profile'")
                })?;
                Some(
                    name.parse::<H264Profile>()
                        .map_err(|e| ProfileError::invalid(&postfix, e.to_string()))?,
                )
            }
            Container::Webm => None,
        };

        Ok(Self {
            postfix,
            container: tag.container,
            segmented: tag.segmented,
            settings: EncodeSettings {
                width: raw.width,
                height: raw.height,
                video_kbps: raw.video_br,
                audio_kbps: raw.audio_br,
                gop_size: raw.gopsize,
            },
            h264_profile,
        })
    }
}

fn validate_postfix(postfix: &str) -> Result<(), ProfileError> {
    if postfix.is_empty() {
        return Err(ProfileError::invalid(postfix, "postfix cannot be empty"));
    }
    if !postfix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ProfileError::invalid(
            postfix,
            "postfix may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

/// Ordered, validated collection of profiles.
#[derive(Debug, Clone)]
pub struct ProfileSet {
    profiles: Vec<EncodeProfile>,
}

impl ProfileSet {
    /// Load a profile set, choosing the format by extension (`.toml` or JSON).
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parse a JSON array of profile descriptors.
    pub fn from_json_str(content: &str) -> Result<Self, ProfileError> {
        let raw: Vec<RawProfile> =
            serde_json::from_str(content).map_err(|e| ProfileError::Parse(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Parse a TOML document holding a `[[profiles]]` array.
    pub fn from_toml_str(content: &str) -> Result<Self, ProfileError> {
        let raw: TomlProfileSet =
            toml::from_str(content).map_err(|e| ProfileError::Parse(e.to_string()))?;
        Self::from_raw(raw.profiles)
    }

    /// Build a set from profiles, checking each one and postfix uniqueness.
    pub fn new(profiles: Vec<EncodeProfile>) -> Result<Self, ProfileError> {
        if profiles.is_empty() {
            return Err(ProfileError::Empty);
        }

        {
            let mut seen = HashSet::new();
            for profile in &profiles {
                profile.check()?;
                if !seen.insert(profile.postfix.as_str()) {
                    return Err(ProfileError::DuplicatePostfix(profile.postfix.clone()));
                }
            }
        }

        Ok(Self { profiles })
    }

    fn from_raw(raw: Vec<RawProfile>) -> Result<Self, ProfileError> {
        let profiles = raw
            .into_iter()
            .map(EncodeProfile::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(profiles)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EncodeProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles flagged for segmented delivery, in declaration order.
    pub fn segmented(&self) -> impl Iterator<Item = &EncodeProfile> {
        self.profiles.iter().filter(|p| p.segmented)
    }

    pub fn get(&self, postfix: &str) -> Option<&EncodeProfile> {
        self.profiles.iter().find(|p| p.postfix == postfix)
    }
}
