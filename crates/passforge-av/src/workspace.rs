//! Scratch directory for two-pass statistics logs and downloaded sources.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Scratch workspace shared by every job of a run.
///
/// Unlike a temp dir it outlives the process: two-pass logs are useful when
/// diagnosing a failed encode, and a downloaded source can be re-used.
///
/// # Example
///
/// ```no_run
/// use passforge_av::Workspace;
///
/// let workspace = Workspace::create("tmp")?;
/// let log = workspace.pass_log("video", "720p");
/// assert!(log.ends_with("twopass_video_720p"));
/// # Ok::<(), passforge_av::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open the workspace at `root`, creating it if needed.
    ///
    /// A directory that already exists is not an error.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| {
            Error::Workspace(format!("Failed to create scratch dir {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    /// Describe the workspace at `root` without touching the filesystem.
    pub fn at<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Two-pass statistics log prefix for one (source, profile) pair.
    ///
    /// ffmpeg appends its own `-0.log` suffix, so this is a prefix rather than
    /// a file that exists.
    pub fn pass_log(&self, source_stem: &str, postfix: &str) -> PathBuf {
        self.root.join(format!("twopass_{source_stem}_{postfix}"))
    }

    /// Final location for a downloaded source file.
    pub fn download_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// In-progress location for a download, renamed by [`Workspace::finalize_download`].
    pub fn partial_path(&self, file_name: &str) -> PathBuf {
        self.root.join(format!("{file_name}.part"))
    }

    /// Move a completed download into place, replacing any previous copy.
    ///
    /// If the replacement fails the previous copy is restored.
    pub fn finalize_download(&self, partial: &Path, dest: &Path) -> Result<PathBuf> {
        if !partial.exists() {
            return Err(Error::Workspace(format!(
                "Downloaded file does not exist: {:?}",
                partial
            )));
        }

        if dest.exists() {
            let backup = dest.with_extension("bak");
            std::fs::rename(dest, &backup).map_err(|e| {
                Error::Workspace(format!("Failed to back up previous download: {}", e))
            })?;

            if let Err(e) = std::fs::rename(partial, dest) {
                if let Err(restore) = std::fs::rename(&backup, dest) {
                    warn!(
                        "Failed to restore previous download {:?} from {:?}: {}",
                        dest, backup, restore
                    );
                }
                return Err(Error::Workspace(format!(
                    "Failed to move download into place: {}",
                    e
                )));
            }

            if let Err(e) = std::fs::remove_file(&backup) {
                warn!("Failed to remove download backup {:?}: {}", backup, e);
            }
        } else {
            std::fs::rename(partial, dest).map_err(|e| {
                Error::Workspace(format!("Failed to move download into place: {}", e))
            })?;
        }

        Ok(dest.to_path_buf())
    }
}
