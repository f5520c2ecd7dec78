use anyhow::{Context, Result};
use passforge_av::SEGMENT_INDEX_NAME;
use std::path::{Path, PathBuf};

use crate::profile::EncodeProfile;

/// File name of the multi-variant playlist.
pub const MANIFEST_NAME: &str = "master.m3u8";

/// Where a run's outputs land.
///
/// Everything lives under `<dest_root>/<source stem>/`:
///
/// ```text
/// <stem>_<postfix>.<ext>     deliverable per profile
/// <postfix>/index.m3u8       segment index per segmented profile
/// <postfix>/segment_NNNNN.ts
/// master.m3u8
/// ```
#[derive(Debug, Clone)]
pub struct OutputLayout {
    stem: String,
    dest_dir: PathBuf,
}

impl OutputLayout {
    /// The stem is everything before the last `.` of the file name, so a
    /// dot-file such as `.mov` has an empty stem and is rejected.
    pub fn new(dest_root: &Path, source: &Path) -> Result<Self> {
        let stem = source
            .file_name()
            .map(|name| {
                let name = name.to_string_lossy();
                match name.rsplit_once('.') {
                    Some((base, _)) => base.to_string(),
                    None => name.to_string(),
                }
            })
            .filter(|s| !s.is_empty())
            .with_context(|| format!("Source has no base name: {:?}", source))?;

        Ok(Self {
            dest_dir: dest_root.join(&stem),
            stem,
        })
    }

    /// Source base name without its extension.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Second-pass output for `profile`.
    pub fn deliverable(&self, profile: &EncodeProfile) -> PathBuf {
        self.dest_dir.join(format!(
            "{}_{}.{}",
            self.stem,
            profile.postfix,
            profile.extension()
        ))
    }

    pub fn variant_dir(&self, profile: &EncodeProfile) -> PathBuf {
        self.dest_dir.join(&profile.postfix)
    }

    /// Segment index location as written into the manifest.
    ///
    /// Always `/`-separated and relative to the manifest's directory.
    pub fn index_uri(&self, profile: &EncodeProfile) -> String {
        format!("{}/{}", profile.postfix, SEGMENT_INDEX_NAME)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dest_dir.join(MANIFEST_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileSet;

    fn profiles() -> ProfileSet {
        ProfileSet::from_json_str(
            r#"[
                {"postfix": "hd", "type": "mp4+hls", "width": 1280, "height": 720,
                 "video_br": 2000, "audio_br": 128, "gopsize": 48, "profile": "high"},
                {"postfix": "web", "type": "webm", "width": 640, "height": 360,
                 "video_br": 800, "audio_br": 96, "gopsize": 48}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_paths_follow_source_stem() {
        let set = profiles();
        let layout = OutputLayout::new(Path::new("/out"), Path::new("/in/video.mov")).unwrap();
        let hd = set.get("hd").unwrap();
        let web = set.get("web").unwrap();

        assert_eq!(layout.stem(), "video");
        assert_eq!(layout.dest_dir(), Path::new("/out/video"));
        assert_eq!(layout.deliverable(hd), Path::new("/out/video/video_hd.mp4"));
        assert_eq!(layout.deliverable(web), Path::new("/out/video/video_web.webm"));
        assert_eq!(layout.variant_dir(hd), Path::new("/out/video/hd"));
        assert_eq!(layout.index_uri(hd), "hd/index.m3u8");
        assert_eq!(layout.manifest_path(), Path::new("/out/video/master.m3u8"));
    }

    #[test]
    fn test_only_last_extension_is_stripped() {
        let layout =
            OutputLayout::new(Path::new("out"), Path::new("talk.2016.final.mov")).unwrap();
        assert_eq!(layout.stem(), "talk.2016.final");
    }

    #[test]
    fn test_rejects_source_without_name() {
        assert!(OutputLayout::new(Path::new("out"), Path::new("/")).is_err());
    }

    #[test]
    fn test_rejects_source_with_empty_base_name() {
        let err = OutputLayout::new(Path::new("out"), Path::new("/in/.mov")).unwrap_err();
        assert!(err.to_string().contains("no base name"), "unexpected error: {err}");
    }

    #[test]
    fn test_source_without_extension_keeps_name() {
        let layout = OutputLayout::new(Path::new("out"), Path::new("/in/rawfeed")).unwrap();
        assert_eq!(layout.stem(), "rawfeed");
        assert_eq!(layout.dest_dir(), Path::new("out/rawfeed"));
    }
}
