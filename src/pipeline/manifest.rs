//! Multi-variant HLS playlist for the segmented profiles of one run.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const PLAYLIST_HEADER: &str = "#EXTM3U";

/// One successfully segmented variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentIndex {
    /// Index path relative to the manifest, e.g. `hd/index.m3u8`.
    pub uri: String,
    /// Video plus audio bitrate in kbit/s.
    pub combined_kbps: u64,
}

impl SegmentIndex {
    /// Advertised bandwidth in bit/s.
    pub fn bandwidth(&self) -> u64 {
        self.combined_kbps * 1000
    }
}

/// Master playlist listing variants in profile declaration order.
#[derive(Debug, Clone)]
pub struct Manifest {
    entries: Vec<SegmentIndex>,
}

impl Manifest {
    /// Returns `None` when there is nothing to advertise.
    pub fn new(entries: Vec<SegmentIndex>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self { entries })
        }
    }

    pub fn entries(&self) -> &[SegmentIndex] {
        &self.entries
    }

    pub fn render(&self) -> String {
        let mut out = String::from(PLAYLIST_HEADER);
        out.push('\n');
        for entry in &self.entries {
            out.push_str(&format!(
                "#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH={}\n{}\n",
                entry.bandwidth(),
                entry.uri
            ));
        }
        out
    }

    pub fn write(&self, path: &Path) -> Result<PathBuf> {
        std::fs::write(path, self.render())
            .with_context(|| format!("Failed to write manifest: {:?}", path))?;
        Ok(path.to_path_buf())
    }
}
